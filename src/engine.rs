//! Chart-shaped aggregations over the canonical table.
//!
//! Every function here is pure: it borrows the table and a validated
//! selection and returns a fresh view. Missing metric values are skipped,
//! never counted as zero; the heatmap is the one place zeros are filled in,
//! and only for season/crop combinations that have no rows at all.

use crate::error::AggregateError;
use crate::filter::FilterSelection;
use crate::types::{
    BubblePoint, CanonicalTable, CategoryValue, CorrelationMatrix, CropRecord, Dimension,
    HeatmapMatrix, KeyMetrics, Metric, Season, YearChange, YearValue,
};
use crate::util::{mean, pearson};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Size given to bubbles whose size metric is missing or not positive.
pub const DEFAULT_MIN_BUBBLE_SIZE: f64 = 1.0;

fn matching<'a>(
    table: &'a CanonicalTable,
    filter: &FilterSelection,
) -> Result<Vec<&'a CropRecord>, AggregateError> {
    let rows: Vec<&CropRecord> = table.records().iter().filter(|r| filter.matches(r)).collect();
    if rows.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    Ok(rows)
}

fn sum_present<'a, I>(rows: I, metric: Metric) -> Option<f64>
where
    I: IntoIterator<Item = &'a CropRecord>,
{
    let mut total = None;
    for v in rows.into_iter().filter_map(|r| metric.value(r)) {
        *total.get_or_insert(0.0) += v;
    }
    total
}

/// One number for a group of rows: area and production add up, yield is
/// pooled as total production over total area.
fn group_value(rows: &[&CropRecord], metric: Metric) -> Option<f64> {
    match metric {
        Metric::Area | Metric::Production => sum_present(rows.iter().copied(), metric),
        Metric::Yield => {
            let (mut prod, mut area) = (0.0, 0.0);
            for r in rows {
                if let (Some(p), Some(a)) = (r.production, r.area) {
                    prod += p;
                    area += a;
                }
            }
            if area > 0.0 {
                Some(prod / area)
            } else {
                None
            }
        }
    }
}

fn count_distinct<'a, T, F>(rows: &[&'a CropRecord], f: F) -> usize
where
    T: Eq + Hash,
    F: Fn(&'a CropRecord) -> T,
{
    rows.iter().map(|r| f(*r)).collect::<HashSet<T>>().len()
}

/// Sort key for grouped points: seasons in calendar order, years numerically,
/// everything else by name.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum GroupOrder {
    Season(Season),
    Year(i32),
    Name(String),
}

fn group_order(dimension: Dimension, r: &CropRecord) -> GroupOrder {
    match dimension {
        Dimension::Season => GroupOrder::Season(r.season),
        Dimension::Year => GroupOrder::Year(r.year),
        other => GroupOrder::Name(other.key(r)),
    }
}

fn by_value_desc(a: &CategoryValue, b: &CategoryValue) -> Ordering {
    b.value
        .partial_cmp(&a.value)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.category.cmp(&b.category))
}

/// Sum of `metric` per year, ascending by year.
pub fn trend_by_year(
    table: &CanonicalTable,
    filter: &FilterSelection,
    metric: Metric,
) -> Result<Vec<YearValue>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for r in rows {
        if let Some(v) = metric.value(r) {
            *by_year.entry(r.year).or_insert(0.0) += v;
        }
    }
    if by_year.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    Ok(by_year
        .into_iter()
        .map(|(year, value)| YearValue { year, value })
        .collect())
}

/// Mean of the per-row yields for each year.
pub fn mean_yield_by_year(
    table: &CanonicalTable,
    filter: &FilterSelection,
) -> Result<Vec<YearValue>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(y) = r.crop_yield {
            by_year.entry(r.year).or_default().push(y);
        }
    }
    let series: Vec<YearValue> = by_year
        .into_iter()
        .filter_map(|(year, ys)| mean(&ys).map(|value| YearValue { year, value }))
        .collect();
    if series.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    Ok(series)
}

/// Mean yield per state, highest first; ties fall back to state name.
pub fn yield_by_state(
    table: &CanonicalTable,
    filter: &FilterSelection,
) -> Result<Vec<CategoryValue>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut by_state: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in rows {
        if let Some(y) = r.crop_yield {
            by_state.entry(r.state.as_str()).or_default().push(y);
        }
    }
    let mut out: Vec<CategoryValue> = by_state
        .into_iter()
        .filter_map(|(state, ys)| {
            mean(&ys).map(|value| CategoryValue {
                category: state.to_string(),
                value,
            })
        })
        .collect();
    if out.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    out.sort_by(by_value_desc);
    Ok(out)
}

/// Pairwise Pearson correlation between `metrics`.
///
/// Each pair uses only the rows where both values are present. A cell is
/// `None` when fewer than two such rows exist or either side is constant.
pub fn correlation_matrix(
    table: &CanonicalTable,
    filter: &FilterSelection,
    metrics: &[Metric],
) -> Result<CorrelationMatrix, AggregateError> {
    if metrics.is_empty() {
        return Err(AggregateError::NoMetrics);
    }
    let rows = matching(table, filter)?;
    let n = metrics.len();
    let mut values: Vec<Vec<Option<f64>>> = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let pairs: Vec<(f64, f64)> = rows
                .iter()
                .filter_map(|r| Some((metrics[i].value(r)?, metrics[j].value(r)?)))
                .collect();
            let r = pearson(&pairs);
            let cell = if i == j { r.map(|_| 1.0) } else { r };
            values[i][j] = cell;
            values[j][i] = cell;
        }
    }
    Ok(CorrelationMatrix {
        metrics: metrics.to_vec(),
        values,
    })
}

pub fn bubble_data(
    table: &CanonicalTable,
    filter: &FilterSelection,
    x: Metric,
    y: Metric,
    size: Metric,
    color_dim: Dimension,
) -> Result<Vec<BubblePoint>, AggregateError> {
    bubble_data_sized(table, filter, x, y, size, color_dim, DEFAULT_MIN_BUBBLE_SIZE)
}

/// One bubble per distinct `color_dim` value, ordered by that value
/// (seasons in calendar order, years numerically).
///
/// Groups without an x or y value are left out; a missing or non-positive
/// size becomes `min_size` so the bubble stays visible.
pub fn bubble_data_sized(
    table: &CanonicalTable,
    filter: &FilterSelection,
    x: Metric,
    y: Metric,
    size: Metric,
    color_dim: Dimension,
    min_size: f64,
) -> Result<Vec<BubblePoint>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut groups: BTreeMap<GroupOrder, Vec<&CropRecord>> = BTreeMap::new();
    for r in rows {
        groups.entry(group_order(color_dim, r)).or_default().push(r);
    }
    let points: Vec<BubblePoint> = groups
        .into_values()
        .filter_map(|members| {
            let key = color_dim.key(members.first()?);
            let px = group_value(&members, x)?;
            let py = group_value(&members, y)?;
            let ps = match group_value(&members, size) {
                Some(s) if s > 0.0 => s,
                _ => min_size,
            };
            Some(BubblePoint {
                label: key.clone(),
                x: px,
                y: py,
                size: ps,
                color: key,
            })
        })
        .collect();
    if points.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    Ok(points)
}

/// Sum of `metric` for every (season, crop) seen in the selection.
///
/// Rows are the seasons present in canonical order, columns the crops
/// present in name order. A combination with no rows is 0.0.
pub fn season_crop_heatmap(
    table: &CanonicalTable,
    filter: &FilterSelection,
    metric: Metric,
) -> Result<HeatmapMatrix, AggregateError> {
    let rows = matching(table, filter)?;
    let mut seasons: BTreeSet<Season> = BTreeSet::new();
    let mut crops: BTreeSet<&str> = BTreeSet::new();
    let mut sums: HashMap<(Season, &str), f64> = HashMap::new();
    for r in &rows {
        seasons.insert(r.season);
        crops.insert(r.crop.as_str());
        if let Some(v) = metric.value(r) {
            *sums.entry((r.season, r.crop.as_str())).or_insert(0.0) += v;
        }
    }
    let cells: Vec<Vec<f64>> = seasons
        .iter()
        .map(|s| {
            crops
                .iter()
                .map(|c| sums.get(&(*s, *c)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();
    Ok(HeatmapMatrix {
        metric,
        seasons: seasons.into_iter().collect(),
        crops: crops.into_iter().map(str::to_string).collect(),
        cells,
    })
}

/// Headline totals and distinct counts for the selection.
pub fn key_metrics(
    table: &CanonicalTable,
    filter: &FilterSelection,
) -> Result<KeyMetrics, AggregateError> {
    let rows = matching(table, filter)?;
    let yields: Vec<f64> = rows.iter().filter_map(|r| r.crop_yield).collect();
    Ok(KeyMetrics {
        total_production: sum_present(rows.iter().copied(), Metric::Production).unwrap_or(0.0),
        total_area: sum_present(rows.iter().copied(), Metric::Area).unwrap_or(0.0),
        avg_yield: mean(&yields),
        num_crops: count_distinct(&rows, |r| r.crop.as_str()),
        num_states: count_distinct(&rows, |r| r.state.as_str()),
        num_districts: count_distinct(&rows, |r| r.district.as_str()),
        num_years: count_distinct(&rows, |r| r.year),
        num_rows: rows.len(),
    })
}

/// Per-category value of `metric`, largest first.
///
/// Area and production are summed; yield is pooled as total production
/// over total area. Categories with no value are left out.
pub fn total_by(
    table: &CanonicalTable,
    filter: &FilterSelection,
    dimension: Dimension,
    metric: Metric,
) -> Result<Vec<CategoryValue>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut groups: HashMap<String, Vec<&CropRecord>> = HashMap::new();
    for r in rows {
        groups.entry(dimension.key(r)).or_default().push(r);
    }
    let mut out: Vec<CategoryValue> = groups
        .into_iter()
        .filter_map(|(category, members)| {
            group_value(&members, metric).map(|value| CategoryValue { category, value })
        })
        .collect();
    if out.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    out.sort_by(by_value_desc);
    Ok(out)
}

/// Percentage of the summed `metric` contributed by each category.
pub fn share_by(
    table: &CanonicalTable,
    filter: &FilterSelection,
    dimension: Dimension,
    metric: Metric,
) -> Result<Vec<CategoryValue>, AggregateError> {
    let rows = matching(table, filter)?;
    let mut totals: HashMap<String, f64> = HashMap::new();
    for r in rows {
        if let Some(v) = metric.value(r) {
            *totals.entry(dimension.key(r)).or_insert(0.0) += v;
        }
    }
    let grand: f64 = totals.values().sum();
    if grand <= 0.0 {
        return Err(AggregateError::EmptyResult);
    }
    let mut out: Vec<CategoryValue> = totals
        .into_iter()
        .map(|(category, v)| CategoryValue {
            category,
            value: v / grand * 100.0,
        })
        .collect();
    out.sort_by(by_value_desc);
    Ok(out)
}

/// Yearly totals with the percent change from the previous year in the series.
pub fn year_over_year(
    table: &CanonicalTable,
    filter: &FilterSelection,
    metric: Metric,
) -> Result<Vec<YearChange>, AggregateError> {
    let series = trend_by_year(table, filter, metric)?;
    let mut prev: Option<f64> = None;
    Ok(series
        .into_iter()
        .map(|YearValue { year, value }| {
            let pct_change = match prev {
                Some(p) if p > 0.0 => Some((value - p) / p * 100.0),
                _ => None,
            };
            prev = Some(value);
            YearChange {
                year,
                value,
                pct_change,
            }
        })
        .collect())
}
