use crate::error::FilterError;
use crate::types::{CropRecord, Season};
use std::collections::BTreeSet;

/// Inclusive year bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// The user's current selection. An empty set means "no restriction".
///
/// Only obtainable through [`FilterSelectionBuilder::build`], so every
/// selection the engine sees has already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    states: BTreeSet<String>,
    crops: BTreeSet<String>,
    years: Option<YearRange>,
    seasons: BTreeSet<Season>,
}

impl FilterSelection {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> FilterSelectionBuilder {
        FilterSelectionBuilder::default()
    }

    /// Start a builder pre-filled with this selection.
    pub fn to_builder(&self) -> FilterSelectionBuilder {
        FilterSelectionBuilder {
            states: self.states.clone(),
            crops: self.crops.clone(),
            years: self.years.map(|r| (r.min, r.max)),
            seasons: self.seasons.iter().map(|s| s.label().to_string()).collect(),
        }
    }

    pub fn matches(&self, r: &CropRecord) -> bool {
        (self.states.is_empty() || self.states.contains(&r.state))
            && (self.crops.is_empty() || self.crops.contains(&r.crop))
            && self.years.map_or(true, |y| y.contains(r.year))
            && (self.seasons.is_empty() || self.seasons.contains(&r.season))
    }

    pub fn states(&self) -> &BTreeSet<String> {
        &self.states
    }

    pub fn crops(&self) -> &BTreeSet<String> {
        &self.crops
    }

    pub fn years(&self) -> Option<YearRange> {
        self.years
    }

    pub fn seasons(&self) -> &BTreeSet<Season> {
        &self.seasons
    }

    /// Short human-readable description for chart titles.
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.states.is_empty() {
            parts.push(join(self.states.iter()));
        }
        if !self.crops.is_empty() {
            parts.push(join(self.crops.iter()));
        }
        if !self.seasons.is_empty() {
            parts.push(join(self.seasons.iter().map(|s| s.label())));
        }
        if let Some(y) = self.years {
            parts.push(format!("{}–{}", y.min, y.max));
        }
        if parts.is_empty() {
            "All India".to_string()
        } else {
            parts.join(" / ")
        }
    }
}

fn join<I, S>(items: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    items.map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, Default)]
pub struct FilterSelectionBuilder {
    states: BTreeSet<String>,
    crops: BTreeSet<String>,
    years: Option<(i32, i32)>,
    seasons: BTreeSet<String>,
}

impl FilterSelectionBuilder {
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.insert(state.into().trim().to_string());
        self
    }

    pub fn states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(|s| s.into().trim().to_string()).collect();
        self
    }

    pub fn crop(mut self, crop: impl Into<String>) -> Self {
        self.crops.insert(crop.into().trim().to_string());
        self
    }

    pub fn crops<I, S>(mut self, crops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crops = crops.into_iter().map(|s| s.into().trim().to_string()).collect();
        self
    }

    pub fn year_range(mut self, min: i32, max: i32) -> Self {
        self.years = Some((min, max));
        self
    }

    pub fn any_year(mut self) -> Self {
        self.years = None;
        self
    }

    pub fn season(mut self, season: Season) -> Self {
        self.seasons.insert(season.label().to_string());
        self
    }

    /// Season labels as typed by the user; validated in [`build`](Self::build).
    pub fn season_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seasons = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<FilterSelection, FilterError> {
        let years = match self.years {
            Some((min, max)) if min > max => {
                return Err(FilterError::InvertedYearRange { min, max })
            }
            Some((min, max)) => Some(YearRange { min, max }),
            None => None,
        };
        let seasons = self
            .seasons
            .iter()
            .map(|label| {
                label
                    .parse::<Season>()
                    .map_err(|_| FilterError::UnknownSeason(label.trim().to_string()))
            })
            .collect::<Result<BTreeSet<Season>, FilterError>>()?;
        Ok(FilterSelection {
            states: self.states.into_iter().filter(|s| !s.is_empty()).collect(),
            crops: self.crops.into_iter().filter(|s| !s.is_empty()).collect(),
            years,
            seasons,
        })
    }
}
