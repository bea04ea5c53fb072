// Utility helpers for parsing and basic statistics.
//
// All the "dirty" cell handling lives here so the loader can hand the
// rest of the crate clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a numeric cell while being forgiving about CSV export noise.
///
/// - Trims whitespace and strips thousands separators like `","`.
/// - Accepts exponent forms (`5e-05`, `1.2E+07`) as written by spreadsheet exports.
/// - Returns `None` for placeholders (`"NA"`, `"n/a"`) and non-finite values.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a numeric cell that must be non-negative; negatives become missing.
pub fn parse_non_negative(s: Option<&str>) -> Option<f64> {
    parse_f64_safe(s).filter(|v| *v >= 0.0)
}

/// Years sometimes arrive as `2020.0` when the file went through a spreadsheet.
pub fn parse_year(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Trimmed text cell, `None` when blank.
pub fn clean_text(s: Option<String>) -> Option<String> {
    let t = s?.trim().to_string();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Arithmetic mean; `None` for an empty slice rather than NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Pearson correlation of paired samples.
///
/// `None` with fewer than two pairs or when either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    let (mut sq_x, mut sq_y) = (0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
        sq_x += x * x;
        sq_y += y * y;
    }
    // A constant column only leaves rounding residue, which stays below
    // machine epsilon relative to the column's own sum of squares.
    let flat = |spread: f64, sq: f64| spread <= f64::EPSILON * sq;
    if flat(sxx, sq_x) || flat(syy, sq_y) {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    // Rounding can push |r| a hair past 1.
    Some(r.clamp(-1.0, 1.0))
}

/// `true` when `a` and `b` differ by more than `tolerance` relative to `b`.
pub fn differs_relative(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = b.abs().max(f64::EPSILON);
    (a - b).abs() / scale > tolerance
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => "n/a".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows loaded`.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_messy_numbers() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("NA")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("5e-05")), Some(5e-05));
        assert_eq!(parse_f64_safe(Some("1.2E+07")), Some(1.2e7));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_non_negative(Some("-3")), None);
        assert_eq!(parse_non_negative(Some("0")), Some(0.0));
    }

    #[test]
    fn parses_years_with_trailing_zero_fraction() {
        assert_eq!(parse_year(Some("2020")), Some(2020));
        assert_eq!(parse_year(Some("2020.0")), Some(2020));
        assert_eq!(parse_year(Some("2020.5")), None);
        assert_eq!(parse_year(Some("1997-98")), None);
    }

    #[test]
    fn pearson_handles_degenerate_inputs() {
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(1.0, 2.0), (1.0, 3.0)]), None);
        let r = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[(0.1, 1.0), (0.1, 2.0), (0.1, 3.0)]), None);
    }

    #[test]
    fn pearson_sees_small_spread_on_large_values() {
        let pairs = [(1_000_000.0, 5.0), (1_000_001.0, 7.0), (1_000_002.0, 9.0)];
        let r = pearson(&pairs).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        let diag: Vec<(f64, f64)> = pairs.iter().map(|p| (p.0, p.0)).collect();
        assert!(pearson(&diag).is_some());
        assert_eq!(pearson(&[(1e6, 1.0), (1e6, 2.0), (1e6, 3.0)]), None);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(400.0, 0), "400");
        assert_eq!(format_opt(None, 2), "n/a");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
