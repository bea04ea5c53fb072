//! Data preparation behind the crop production dashboard.
//!
//! [`loader`] turns a crop statistics CSV into a [`CanonicalTable`];
//! [`engine`] derives chart-ready views from it for a [`FilterSelection`];
//! [`dashboard`] assembles one isolated panel per chart.

pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod types;
pub mod util;

pub use config::{AppConfig, DashboardOptions, LoadOptions, YieldPolicy};
pub use error::{AggregateError, ConfigError, DataLoadError, FilterError};
pub use filter::FilterSelection;
pub use loader::{load, load_with, LoadReport};
pub use types::{AggregateView, CanonicalTable, CropRecord, Dimension, Metric, Season};
