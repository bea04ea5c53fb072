// One render cycle: every chart for the current selection, each computed on
// its own so a failure only blanks that chart.
use crate::config::DashboardOptions;
use crate::engine;
use crate::error::AggregateError;
use crate::filter::FilterSelection;
use crate::types::{AggregateView, CanonicalTable, CategoryValue, Dimension, Metric};
use log::{debug, warn};
use serde::Serialize;

/// Tells the renderer which kind of chart to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    KeyMetrics,
    CropShare,
    CropProduction,
    YieldByState,
    ProductionTrend,
    YieldTrend,
    YearOverYear,
    SeasonCropHeatmap,
    SeasonShare,
    TopDistricts,
    Correlation,
    Bubble,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "view", rename_all = "snake_case")]
pub enum ChartOutcome {
    Ready(AggregateView),
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub kind: ChartKind,
    pub title: String,
    pub outcome: ChartOutcome,
}

impl ChartPanel {
    pub fn view(&self) -> Option<&AggregateView> {
        match &self.outcome {
            ChartOutcome::Ready(v) => Some(v),
            _ => None,
        }
    }
}

fn panel<F>(kind: ChartKind, title: String, compute: F) -> ChartPanel
where
    F: FnOnce() -> Result<AggregateView, AggregateError>,
{
    let outcome = match compute() {
        Ok(view) => ChartOutcome::Ready(view),
        Err(AggregateError::EmptyResult) => {
            debug!("{:?}: no data for selection", kind);
            ChartOutcome::NoData
        }
        Err(e) => {
            warn!("{:?} failed: {}", kind, e);
            ChartOutcome::Failed(e.to_string())
        }
    };
    ChartPanel {
        kind,
        title,
        outcome,
    }
}

fn top(mut rows: Vec<CategoryValue>, n: usize) -> Vec<CategoryValue> {
    rows.truncate(n);
    rows
}

/// Build every panel for `filter`.
///
/// With no state selected this is the national layout; otherwise the
/// regional layout with district and season breakdowns.
pub fn compose(
    table: &CanonicalTable,
    filter: &FilterSelection,
    opts: &DashboardOptions,
) -> Vec<ChartPanel> {
    let scope = filter.describe();
    let mut panels = vec![panel(
        ChartKind::KeyMetrics,
        format!("Key Metrics - {}", scope),
        || engine::key_metrics(table, filter).map(AggregateView::Summary),
    )];

    if filter.states().is_empty() {
        panels.push(panel(
            ChartKind::CropShare,
            "Share of Total Production by Crop".to_string(),
            || {
                engine::share_by(table, filter, Dimension::Crop, Metric::Production)
                    .map(|rows| AggregateView::Grouped { metric: Metric::Production, rows })
            },
        ));
    } else {
        panels.push(panel(
            ChartKind::CropProduction,
            format!("Crop-wise Production in {}", scope),
            || {
                engine::total_by(table, filter, Dimension::Crop, Metric::Production)
                    .map(|rows| AggregateView::Grouped { metric: Metric::Production, rows })
            },
        ));
    }

    panels.push(panel(
        ChartKind::YieldByState,
        format!("Top {} States by Average Yield", opts.top_n),
        || {
            engine::yield_by_state(table, filter).map(|rows| AggregateView::Grouped {
                metric: Metric::Yield,
                rows: top(rows, opts.top_n),
            })
        },
    ));

    panels.push(panel(
        ChartKind::ProductionTrend,
        format!("Total Production Over Years - {}", scope),
        || {
            engine::trend_by_year(table, filter, Metric::Production)
                .map(|points| AggregateView::Series { metric: Metric::Production, points })
        },
    ));
    panels.push(panel(
        ChartKind::YieldTrend,
        format!("Average Yield Over Years - {}", scope),
        || {
            engine::mean_yield_by_year(table, filter)
                .map(|points| AggregateView::Series { metric: Metric::Yield, points })
        },
    ));

    if filter.states().is_empty() {
        panels.push(panel(
            ChartKind::YearOverYear,
            "Year-over-Year % Change in Production".to_string(),
            || {
                engine::year_over_year(table, filter, Metric::Production)
                    .map(|rows| AggregateView::Changes { metric: Metric::Production, rows })
            },
        ));
    } else {
        panels.push(panel(
            ChartKind::SeasonCropHeatmap,
            format!("Crop vs Season Production in {}", scope),
            || {
                engine::season_crop_heatmap(table, filter, Metric::Production)
                    .map(AggregateView::Heatmap)
            },
        ));
        panels.push(panel(
            ChartKind::SeasonShare,
            format!("Seasonal Share of Production in {}", scope),
            || {
                engine::share_by(table, filter, Dimension::Season, Metric::Production)
                    .map(|rows| AggregateView::Grouped { metric: Metric::Production, rows })
            },
        ));
        panels.push(panel(
            ChartKind::TopDistricts,
            format!("Top {} Districts by Production in {}", opts.top_n, scope),
            || {
                engine::total_by(table, filter, Dimension::District, Metric::Production).map(
                    |rows| AggregateView::Grouped {
                        metric: Metric::Production,
                        rows: top(rows, opts.top_n),
                    },
                )
            },
        ));
    }

    panels.push(panel(
        ChartKind::Correlation,
        format!("Correlation Matrix: Area, Production, Yield - {}", scope),
        || {
            engine::correlation_matrix(
                table,
                filter,
                &[Metric::Area, Metric::Production, Metric::Yield],
            )
            .map(AggregateView::Correlation)
        },
    ));

    // Nationally one bubble per year, regionally one per crop.
    let color_dim = if filter.states().is_empty() {
        Dimension::Year
    } else {
        Dimension::Crop
    };
    panels.push(panel(
        ChartKind::Bubble,
        format!("Yield vs Area (Bubble Size = Production) - {}", scope),
        || {
            engine::bubble_data_sized(
                table,
                filter,
                Metric::Area,
                Metric::Yield,
                Metric::Production,
                color_dim,
                opts.min_bubble_size,
            )
            .map(|points| AggregateView::Points { points })
        },
    ));

    panels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CropRecord, Season};

    fn rec(state: &str, district: &str, crop: &str, year: i32, season: Season) -> CropRecord {
        CropRecord {
            state: state.to_string(),
            district: district.to_string(),
            crop: crop.to_string(),
            year,
            season,
            area: Some(10.0 + year as f64 - 2000.0),
            production: Some(30.0 + 2.0 * (year as f64 - 2000.0)),
            crop_yield: None,
        }
    }

    fn table() -> CanonicalTable {
        let mut rows = vec![
            rec("Punjab", "Ludhiana", "Rice", 2000, Season::Kharif),
            rec("Punjab", "Ludhiana", "Rice", 2001, Season::Kharif),
            rec("Punjab", "Amritsar", "Wheat", 2001, Season::Rabi),
            rec("Kerala", "Kollam", "Coconut", 2002, Season::WholeYear),
        ];
        for r in &mut rows {
            r.crop_yield = Some(r.production.unwrap() / r.area.unwrap());
        }
        CanonicalTable::new(rows)
    }

    fn kinds(panels: &[ChartPanel]) -> Vec<ChartKind> {
        panels.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn national_layout() {
        let panels = compose(&table(), &FilterSelection::all(), &DashboardOptions::default());
        assert_eq!(
            kinds(&panels),
            vec![
                ChartKind::KeyMetrics,
                ChartKind::CropShare,
                ChartKind::YieldByState,
                ChartKind::ProductionTrend,
                ChartKind::YieldTrend,
                ChartKind::YearOverYear,
                ChartKind::Correlation,
                ChartKind::Bubble,
            ]
        );
        assert!(panels.iter().all(|p| matches!(p.outcome, ChartOutcome::Ready(_))));
        match panels[7].view() {
            Some(AggregateView::Points { points }) => {
                let years: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
                assert_eq!(years, vec!["2000", "2001", "2002"]);
            }
            other => panic!("unexpected bubble view: {other:?}"),
        }
    }

    #[test]
    fn regional_layout_truncates_top_n() {
        let filter = FilterSelection::builder().state("Punjab").build().unwrap();
        let opts = DashboardOptions {
            top_n: 1,
            ..DashboardOptions::default()
        };
        let panels = compose(&table(), &filter, &opts);
        assert_eq!(
            kinds(&panels),
            vec![
                ChartKind::KeyMetrics,
                ChartKind::CropProduction,
                ChartKind::YieldByState,
                ChartKind::ProductionTrend,
                ChartKind::YieldTrend,
                ChartKind::SeasonCropHeatmap,
                ChartKind::SeasonShare,
                ChartKind::TopDistricts,
                ChartKind::Correlation,
                ChartKind::Bubble,
            ]
        );
        let districts = panels
            .iter()
            .find(|p| p.kind == ChartKind::TopDistricts)
            .and_then(ChartPanel::view)
            .unwrap();
        match districts {
            AggregateView::Grouped { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].category, "Ludhiana");
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn unknown_state_renders_no_data_everywhere() {
        let filter = FilterSelection::builder().state("Atlantis").build().unwrap();
        let panels = compose(&table(), &filter, &DashboardOptions::default());
        assert!(!panels.is_empty());
        assert!(panels.iter().all(|p| p.outcome == ChartOutcome::NoData));
    }

    #[test]
    fn one_empty_chart_does_not_blank_the_rest() {
        // Kerala's only row has zero production, so the share chart has
        // nothing to divide while the other charts still render.
        let mut rows = table().records().to_vec();
        for r in rows.iter_mut().filter(|r| r.state == "Kerala") {
            r.production = Some(0.0);
            r.crop_yield = Some(0.0);
        }
        let filter = FilterSelection::builder().state("Kerala").build().unwrap();
        let panels = compose(&CanonicalTable::new(rows), &filter, &DashboardOptions::default());
        let share = panels.iter().find(|p| p.kind == ChartKind::SeasonShare).unwrap();
        assert_eq!(share.outcome, ChartOutcome::NoData);
        let trend = panels.iter().find(|p| p.kind == ChartKind::ProductionTrend).unwrap();
        assert!(trend.view().is_some());
        let corr = panels.iter().find(|p| p.kind == ChartKind::Correlation).unwrap();
        assert!(corr.view().is_some());
    }

    #[test]
    fn panels_serialize_for_renderer() {
        let panels = compose(&table(), &FilterSelection::all(), &DashboardOptions::default());
        let json = serde_json::to_value(&panels).unwrap();
        assert_eq!(json[0]["kind"], "key_metrics");
        assert_eq!(json[0]["outcome"]["status"], "ready");
        assert_eq!(json[0]["outcome"]["view"]["kind"], "summary");
    }
}
