use crate::config::{LoadOptions, YieldPolicy};
use crate::error::DataLoadError;
use crate::types::{CanonicalTable, CropRecord, RawRow, Season};
use crate::util::{clean_text, differs_relative, parse_non_negative, parse_year};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Columns a source file must provide. Yield is optional because it can be derived.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "state",
    "district",
    "crop",
    "year",
    "season",
    "area",
    "production",
];

// Header spellings seen in crop production exports, keyed by normalized name.
static COLUMN_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("state", "state"),
        ("state_name", "state"),
        ("district", "district"),
        ("district_name", "district"),
        ("crop", "crop"),
        ("crop_name", "crop"),
        ("year", "year"),
        ("crop_year", "year"),
        ("season", "season"),
        ("area", "area"),
        ("area_ha", "area"),
        ("area_hectare", "area"),
        ("area_hectares", "area"),
        ("production", "production"),
        ("production_tonnes", "production"),
        ("production_tons", "production"),
        ("yield", "yield"),
        ("yield_t_ha", "yield"),
        ("crop_yield", "yield"),
    ])
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    /// Rows dropped for a missing or invalid state/district/crop/year/season.
    pub dropped_incomplete: usize,
    /// Area or production cells that were negative or non-numeric.
    pub coerced_missing: usize,
    /// Rows whose yield had to be computed because the input had none.
    pub yields_derived: usize,
    /// Input yields that disagree with production / area beyond tolerance.
    pub yield_mismatches: usize,
    pub duplicates: usize,
}

/// Map a raw header cell to its canonical column name.
///
/// Case-insensitive; any run of non-alphanumeric characters becomes a single
/// `_`, so `Yield (t/ha)` and `yield-t-ha` land on the same alias. Unknown
/// names pass through normalized so serde ignores them.
pub fn canonical_column(header: &str) -> String {
    let normalized: String = header
        .trim()
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    match COLUMN_ALIASES.get(normalized.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => normalized,
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<(CanonicalTable, LoadReport), DataLoadError> {
    load_with(path, &LoadOptions::default())
}

pub fn load_with<P: AsRef<Path>>(
    path: P,
    opts: &LoadOptions,
) -> Result<(CanonicalTable, LoadReport), DataLoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| DataLoadError::Open {
            path: display.clone(),
            source,
        })?;

    let raw_headers = rdr
        .headers()
        .map_err(|source| DataLoadError::Header {
            path: display.clone(),
            source,
        })?
        .clone();
    let headers = normalize_headers(&raw_headers);

    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DataLoadError::MissingColumns {
            path: display,
            missing,
        });
    }
    rdr.set_headers(headers);

    let mut report = LoadReport::default();
    let mut prelim: Vec<CropRecord> = Vec::new();

    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        report.total_rows += 1;
        // +2: one for the header row, one for 1-based line numbers.
        let line = idx + 2;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("{}:{}: skipping unparseable row: {}", display, line, e);
                report.parse_errors += 1;
                continue;
            }
        };
        match clean_row(row, opts, &mut report) {
            Some(rec) => prelim.push(rec),
            None => {
                debug!("{}:{}: dropping incomplete row", display, line);
                report.dropped_incomplete += 1;
            }
        }
    }

    let (table, duplicates) = CanonicalTable::dedup(prelim);
    report.duplicates = duplicates;
    report.kept_rows = table.len();

    if report.yield_mismatches > 0 {
        warn!(
            "{} rows carry a yield inconsistent with production/area (policy: {:?})",
            report.yield_mismatches, opts.yield_policy
        );
    }
    info!(
        "Loaded {}: {} rows read, {} kept, {} parse errors, {} incomplete, {} duplicates",
        display,
        report.total_rows,
        report.kept_rows,
        report.parse_errors,
        report.dropped_incomplete,
        report.duplicates
    );

    if table.is_empty() {
        return Err(DataLoadError::NoValidRows { path: display });
    }
    Ok((table, report))
}

fn normalize_headers(raw: &StringRecord) -> StringRecord {
    let mut used: HashSet<String> = HashSet::new();
    raw.iter()
        .map(|h| {
            let canonical = canonical_column(h);
            // A second column mapping to the same name would make serde reject every row.
            if used.insert(canonical.clone()) {
                canonical
            } else {
                format!("{}__dup", canonical)
            }
        })
        .collect()
}

/// Turn a raw row into a typed record, or `None` when a key field is unusable.
fn clean_row(row: RawRow, opts: &LoadOptions, report: &mut LoadReport) -> Option<CropRecord> {
    let state = clean_text(row.state)?;
    let district = clean_text(row.district)?;
    let crop = clean_text(row.crop)?;
    let year = parse_year(row.year.as_deref())
        .filter(|y| (opts.min_year..=opts.max_year).contains(y))?;
    let season: Season = clean_text(row.season)?.parse().ok()?;

    let area = parse_non_negative(row.area.as_deref());
    let production = parse_non_negative(row.production.as_deref());
    for (raw, parsed) in [(&row.area, area), (&row.production, production)] {
        let supplied = raw.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        if supplied && parsed.is_none() {
            report.coerced_missing += 1;
        }
    }

    let derived = match (production, area) {
        (Some(p), Some(a)) if a > 0.0 => Some(p / a),
        _ => None,
    };
    let input = parse_non_negative(row.crop_yield.as_deref());
    if let (Some(given), Some(computed)) = (input, derived) {
        if differs_relative(given, computed, opts.yield_tolerance) {
            report.yield_mismatches += 1;
        }
    }
    let crop_yield = match opts.yield_policy {
        YieldPolicy::Recompute => derived,
        YieldPolicy::TrustInput if area.is_some_and(|a| a > 0.0) => input.or(derived),
        YieldPolicy::TrustInput => None,
    };
    if input.is_none() && crop_yield.is_some() {
        report.yields_derived += 1;
    }

    Some(CropRecord {
        state,
        district,
        crop,
        year,
        season,
        area,
        production,
        crop_yield,
    })
}
