use thiserror::Error;

/// Startup failure: no usable table could be built from the source file.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Failed to open data file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to read header row of '{path}': {source}")]
    Header {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Data file '{path}' is missing required columns: {}", .missing.join(", "))]
    MissingColumns { path: String, missing: Vec<String> },
    #[error("Data file '{path}' has no valid rows after cleaning")]
    NoValidRows { path: String },
}

/// A single chart could not be computed for the current selection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("No data matches the current selection")]
    EmptyResult,
    #[error("At least one metric is required")]
    NoMetrics,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Year range {min}..={max} is inverted")]
    InvertedYearRange { min: i32, max: i32 },
    #[error("Invalid season: {0}")]
    UnknownSeason(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Plausible year range {min}..={max} is inverted")]
    InvertedYearBounds { min: i32, max: i32 },
}
