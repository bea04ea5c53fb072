use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// One CSV row exactly as it came off disk, after header normalization.
///
/// Every field stays textual so a malformed cell never aborts the whole
/// record; validation happens once in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub state: Option<String>,
    pub district: Option<String>,
    pub crop: Option<String>,
    pub year: Option<String>,
    pub season: Option<String>,
    pub area: Option<String>,
    pub production: Option<String>,
    #[serde(rename = "yield", default)]
    pub crop_yield: Option<String>,
}

/// Indian agricultural season labels, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Kharif,
    Rabi,
    Summer,
    Autumn,
    Winter,
    #[serde(rename = "Whole Year")]
    WholeYear,
}

impl Season {
    pub fn label(&self) -> &'static str {
        match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
            Season::WholeYear => "Whole Year",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = String;

    // Source exports pad labels ("Kharif     ") and spell "Whole Year" several ways.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "kharif" => Ok(Season::Kharif),
            "rabi" => Ok(Season::Rabi),
            "summer" => Ok(Season::Summer),
            "autumn" => Ok(Season::Autumn),
            "winter" => Ok(Season::Winter),
            "wholeyear" => Ok(Season::WholeYear),
            _ => Err(format!("unknown season '{}'", s.trim())),
        }
    }
}

/// Numeric columns a chart can be asked to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Area,
    Production,
    Yield,
}

impl Metric {
    pub fn value(&self, r: &CropRecord) -> Option<f64> {
        match self {
            Metric::Area => r.area,
            Metric::Production => r.production,
            Metric::Yield => r.crop_yield,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Area => "area",
            Metric::Production => "production",
            Metric::Yield => "yield",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(Metric::Area),
            "production" => Ok(Metric::Production),
            "yield" => Ok(Metric::Yield),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

/// Categorical column used as a grouping or colour key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    State,
    District,
    Crop,
    Year,
    Season,
}

impl Dimension {
    pub fn key(&self, r: &CropRecord) -> String {
        match self {
            Dimension::State => r.state.clone(),
            Dimension::District => r.district.clone(),
            Dimension::Crop => r.crop.clone(),
            Dimension::Year => r.year.to_string(),
            Dimension::Season => r.season.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRecord {
    pub state: String,
    pub district: String,
    pub crop: String,
    pub year: i32,
    pub season: Season,
    pub area: Option<f64>,
    pub production: Option<f64>,
    #[serde(rename = "yield")]
    pub crop_yield: Option<f64>,
}

/// The cleaned, deduplicated dataset every aggregation reads from.
///
/// Built once and then only ever borrowed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalTable {
    records: Vec<CropRecord>,
}

impl CanonicalTable {
    /// Keeps the first record seen for each (state, district, crop, year, season).
    pub fn new(records: Vec<CropRecord>) -> Self {
        Self::dedup(records).0
    }

    pub(crate) fn dedup(records: Vec<CropRecord>) -> (Self, usize) {
        let mut seen: HashSet<(String, String, String, i32, Season)> = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        let mut duplicates = 0usize;
        for r in records {
            let key = (r.state.clone(), r.district.clone(), r.crop.clone(), r.year, r.season);
            if seen.insert(key) {
                kept.push(r);
            } else {
                duplicates += 1;
            }
        }
        (Self { records: kept }, duplicates)
    }

    pub fn records(&self) -> &[CropRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn states(&self) -> Vec<String> {
        self.distinct(|r| r.state.clone())
    }

    pub fn districts(&self) -> Vec<String> {
        self.distinct(|r| r.district.clone())
    }

    pub fn crops(&self) -> Vec<String> {
        self.distinct(|r| r.crop.clone())
    }

    pub fn seasons(&self) -> Vec<Season> {
        let set: BTreeSet<Season> = self.records.iter().map(|r| r.season).collect();
        set.into_iter().collect()
    }

    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }

    fn distinct<F>(&self, f: F) -> Vec<String>
    where
        F: Fn(&CropRecord) -> String,
    {
        let set: BTreeSet<String> = self.records.iter().map(f).collect();
        set.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearChange {
    pub year: i32,
    pub value: f64,
    pub pct_change: Option<f64>,
}

/// Pairwise Pearson coefficients; `None` where the coefficient is undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<Metric>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied().flatten()
    }
}

/// Season rows by crop columns. Always rectangular.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    pub metric: Metric,
    pub seasons: Vec<Season>,
    pub crops: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl HeatmapMatrix {
    pub fn cell(&self, season: Season, crop: &str) -> Option<f64> {
        let i = self.seasons.iter().position(|s| *s == season)?;
        let j = self.crops.iter().position(|c| c == crop)?;
        Some(self.cells[i][j])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubblePoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
}

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_production: f64,
    pub total_area: f64,
    pub avg_yield: Option<f64>,
    pub num_crops: usize,
    pub num_states: usize,
    pub num_districts: usize,
    pub num_years: usize,
    pub num_rows: usize,
}

/// Anything the engine hands to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateView {
    Series { metric: Metric, points: Vec<YearValue> },
    Grouped { metric: Metric, rows: Vec<CategoryValue> },
    Changes { metric: Metric, rows: Vec<YearChange> },
    Correlation(CorrelationMatrix),
    Heatmap(HeatmapMatrix),
    Points { points: Vec<BubblePoint> },
    Summary(KeyMetrics),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(state: &str, crop: &str, year: i32, season: Season) -> CropRecord {
        CropRecord {
            state: state.to_string(),
            district: "D1".to_string(),
            crop: crop.to_string(),
            year,
            season,
            area: Some(1.0),
            production: Some(2.0),
            crop_yield: Some(2.0),
        }
    }

    #[test]
    fn season_parses_padded_and_spaced_labels() {
        assert_eq!("Kharif     ".parse::<Season>(), Ok(Season::Kharif));
        assert_eq!("whole year".parse::<Season>(), Ok(Season::WholeYear));
        assert_eq!("Whole_Year".parse::<Season>(), Ok(Season::WholeYear));
        assert!("Monsoon".parse::<Season>().is_err());
    }

    #[test]
    fn table_keeps_first_duplicate() {
        let mut second = rec("Punjab", "Rice", 2020, Season::Kharif);
        second.production = Some(99.0);
        let table = CanonicalTable::new(vec![
            rec("Punjab", "Rice", 2020, Season::Kharif),
            second,
            rec("Punjab", "Rice", 2020, Season::Rabi),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].production, Some(2.0));
    }

    #[test]
    fn selectors_are_sorted_and_distinct() {
        let table = CanonicalTable::new(vec![
            rec("Punjab", "Wheat", 2001, Season::Rabi),
            rec("Kerala", "Rice", 1999, Season::Kharif),
            rec("Punjab", "Rice", 2001, Season::Kharif),
        ]);
        assert_eq!(table.states(), vec!["Kerala", "Punjab"]);
        assert_eq!(table.crops(), vec!["Rice", "Wheat"]);
        assert_eq!(table.seasons(), vec![Season::Kharif, Season::Rabi]);
        assert_eq!(table.year_bounds(), Some((1999, 2001)));
    }

    #[test]
    fn view_serializes_with_kind_tag() {
        let view = AggregateView::Series {
            metric: Metric::Production,
            points: vec![YearValue { year: 2020, value: 4.0 }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["kind"], "series");
        assert_eq!(json["metric"], "production");
        assert_eq!(json["points"][0]["year"], 2020);
    }
}
