// Runtime configuration, read from the environment once at startup.
//
// Every knob has a default so the dashboard runs with no variables set.
use crate::error::ConfigError;
use chrono::Datelike;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_DATA_PATH: &str = "CROP_DASHBOARD_DATA";
pub const ENV_YIELD_POLICY: &str = "CROP_DASHBOARD_YIELD_POLICY";
pub const ENV_YIELD_TOLERANCE: &str = "CROP_DASHBOARD_YIELD_TOLERANCE";
pub const ENV_MIN_YEAR: &str = "CROP_DASHBOARD_MIN_YEAR";
pub const ENV_MAX_YEAR: &str = "CROP_DASHBOARD_MAX_YEAR";
pub const ENV_TOP_N: &str = "CROP_DASHBOARD_TOP_N";

pub const DEFAULT_DATA_PATH: &str = "data/main_crops.csv";
pub const DEFAULT_MIN_YEAR: i32 = 1990;

/// What to do with a yield value supplied by the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldPolicy {
    /// Always derive yield as production / area.
    #[default]
    Recompute,
    /// Keep a valid input yield; derive only when it is absent or invalid.
    /// Yield is still left undefined when area is zero or missing.
    TrustInput,
}

impl FromStr for YieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recompute" => Ok(YieldPolicy::Recompute),
            "trust" | "trust_input" => Ok(YieldPolicy::TrustInput),
            other => Err(format!("expected 'recompute' or 'trust', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub yield_policy: YieldPolicy,
    /// Relative difference above which an input yield counts as inconsistent.
    pub yield_tolerance: f64,
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            yield_policy: YieldPolicy::default(),
            yield_tolerance: 0.01,
            min_year: DEFAULT_MIN_YEAR,
            max_year: chrono::Local::now().year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub top_n: usize,
    /// Bubble size used for points whose size metric is missing or not positive.
    pub min_bubble_size: f64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            min_bubble_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub load: LoadOptions,
    pub dashboard: DashboardOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            load: LoadOptions::default(),
            dashboard: DashboardOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from any variable source; unset or blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut cfg = AppConfig::default();

        if let Some(path) = get(ENV_DATA_PATH) {
            cfg.data_path = PathBuf::from(path.trim());
        }
        if let Some(v) = get(ENV_YIELD_POLICY) {
            cfg.load.yield_policy = parse_var(ENV_YIELD_POLICY, &v)?;
        }
        if let Some(v) = get(ENV_YIELD_TOLERANCE) {
            let tol: f64 = parse_var(ENV_YIELD_TOLERANCE, &v)?;
            if !tol.is_finite() || tol < 0.0 {
                return Err(ConfigError::InvalidValue {
                    var: ENV_YIELD_TOLERANCE,
                    value: v,
                    reason: "must be a non-negative number".to_string(),
                });
            }
            cfg.load.yield_tolerance = tol;
        }
        if let Some(v) = get(ENV_MIN_YEAR) {
            cfg.load.min_year = parse_var(ENV_MIN_YEAR, &v)?;
        }
        if let Some(v) = get(ENV_MAX_YEAR) {
            cfg.load.max_year = parse_var(ENV_MAX_YEAR, &v)?;
        }
        if cfg.load.min_year > cfg.load.max_year {
            return Err(ConfigError::InvertedYearBounds {
                min: cfg.load.min_year,
                max: cfg.load.max_year,
            });
        }
        if let Some(v) = get(ENV_TOP_N) {
            let n: usize = parse_var(ENV_TOP_N, &v)?;
            if n == 0 {
                return Err(ConfigError::InvalidValue {
                    var: ENV_TOP_N,
                    value: v,
                    reason: "must be at least 1".to_string(),
                });
            }
            cfg.dashboard.top_n = n;
        }
        Ok(cfg)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
