use crate::dashboard::{ChartOutcome, ChartPanel};
use crate::types::{AggregateView, CorrelationMatrix, HeatmapMatrix, KeyMetrics};
use crate::util::{format_int, format_number, format_opt};
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Tabled, Clone)]
struct SeriesRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled, Clone)]
struct ChangeRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Change %")]
    pct_change: String,
}

#[derive(Tabled, Clone)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled, Clone)]
struct PointRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "X")]
    x: String,
    #[tabled(rename = "Y")]
    y: String,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Tabled, Clone)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Serialize any view (or list of panels) as pretty JSON for an external renderer.
pub fn write_json<W: Write, T: Serialize>(mut w: W, value: &T) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut w, value)?;
    writeln!(w)?;
    Ok(())
}

/// Print one panel as a markdown table, showing at most `max_rows` rows.
pub fn preview_panel(panel: &ChartPanel, max_rows: usize) {
    println!("{}", panel.title);
    match &panel.outcome {
        ChartOutcome::Ready(view) => println!("{}\n", render_view(view, max_rows)),
        ChartOutcome::NoData => println!("(no data for this selection)\n"),
        ChartOutcome::Failed(msg) => println!("(chart unavailable: {})\n", msg),
    }
}

pub fn render_view(view: &AggregateView, max_rows: usize) -> String {
    match view {
        AggregateView::Series { points, .. } => markdown(points.iter().take(max_rows).map(|p| {
            SeriesRow {
                year: p.year,
                value: format_number(p.value, 2),
            }
        })),
        AggregateView::Changes { rows, .. } => markdown(rows.iter().take(max_rows).map(|r| {
            ChangeRow {
                year: r.year,
                value: format_number(r.value, 2),
                pct_change: format_opt(r.pct_change, 2),
            }
        })),
        AggregateView::Grouped { rows, .. } => markdown(rows.iter().take(max_rows).map(|r| {
            CategoryRow {
                category: r.category.clone(),
                value: format_number(r.value, 2),
            }
        })),
        AggregateView::Points { points } => markdown(points.iter().take(max_rows).map(|p| {
            PointRow {
                label: p.label.clone(),
                x: format_number(p.x, 2),
                y: format_number(p.y, 2),
                size: format_number(p.size, 2),
            }
        })),
        AggregateView::Summary(m) => markdown(summary_rows(m)),
        AggregateView::Correlation(m) => correlation_table(m),
        AggregateView::Heatmap(h) => heatmap_table(h, max_rows),
    }
}

fn summary_rows(m: &KeyMetrics) -> Vec<MetricRow> {
    vec![
        MetricRow {
            name: "Total Production (tons)",
            value: format_number(m.total_production, 0),
        },
        MetricRow {
            name: "Total Area (hectares)",
            value: format_number(m.total_area, 0),
        },
        MetricRow {
            name: "Average Yield (t/ha)",
            value: format_opt(m.avg_yield, 2),
        },
        MetricRow {
            name: "Number of Crops",
            value: format_int(m.num_crops),
        },
        MetricRow {
            name: "States Covered",
            value: format_int(m.num_states),
        },
        MetricRow {
            name: "Districts Covered",
            value: format_int(m.num_districts),
        },
        MetricRow {
            name: "Years Covered",
            value: format_int(m.num_years),
        },
        MetricRow {
            name: "Records",
            value: format_int(m.num_rows),
        },
    ]
}

fn correlation_table(m: &CorrelationMatrix) -> String {
    let mut b = Builder::default();
    let mut header = vec![String::new()];
    header.extend(m.metrics.iter().map(|x| x.label().to_string()));
    b.push_record(header);
    for (metric, row) in m.metrics.iter().zip(&m.values) {
        let mut record = vec![metric.label().to_string()];
        record.extend(row.iter().map(|c| format_opt(*c, 3)));
        b.push_record(record);
    }
    b.build().with(Style::markdown()).to_string()
}

fn heatmap_table(h: &HeatmapMatrix, max_cols: usize) -> String {
    // Crops run across; wide selections get cut to keep the terminal readable.
    let shown = h.crops.len().min(max_cols);
    let mut b = Builder::default();
    let mut header = vec!["Season".to_string()];
    header.extend(h.crops.iter().take(shown).cloned());
    b.push_record(header);
    for (season, row) in h.seasons.iter().zip(&h.cells) {
        let mut record = vec![season.label().to_string()];
        record.extend(row.iter().take(shown).map(|v| format_number(*v, 0)));
        b.push_record(record);
    }
    let mut out = b.build().with(Style::markdown()).to_string();
    if shown < h.crops.len() {
        out.push_str(&format!("\n(+{} more crops)", h.crops.len() - shown));
    }
    out
}

fn markdown<T, I>(rows: I) -> String
where
    T: Tabled,
    I: IntoIterator<Item = T>,
{
    let rows: Vec<T> = rows.into_iter().collect();
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows).with(Style::markdown()).to_string()
}
