use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use super::csv_source::{EXPORT_COLUMN, REQUIRED_COLUMNS, TIMESTAMP_COLUMN};
use crate::error::ProfileError;

/// Peak load above which units are suspect (kW).
const PEAK_LOAD_WARN_KW: f64 = 10_000.0;
/// Allowed gap between inferred and expected step length (minutes).
const TIMESTEP_TOLERANCE_MIN: f64 = 1.0;

/// Outcome of a profile data quality check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub source: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub timestamp_start: Option<String>,
    pub timestamp_end: Option<String>,
    pub inferred_timestep_minutes: Option<f64>,
}

impl ValidationReport {
    /// `true` when no errors were found (warnings are allowed).
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Profile Validation: {} ---", self.source)?;
        writeln!(f, "Rows:     {}", self.rows)?;
        writeln!(f, "Columns:  {}", self.columns.join(", "))?;
        if let (Some(start), Some(end)) = (&self.timestamp_start, &self.timestamp_end) {
            writeln!(f, "Span:     {start} .. {end}")?;
        }
        if let Some(minutes) = self.inferred_timestep_minutes {
            writeln!(f, "Timestep: {minutes:.2} min")?;
        }
        for e in &self.errors {
            writeln!(f, "error:    {e}")?;
        }
        for w in &self.warnings {
            writeln!(f, "warning:  {w}")?;
        }
        write!(f, "Status:   {}", if self.ok() { "OK" } else { "FAILED" })
    }
}

/// Parses the timestamp formats accepted in profile files.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Checks a profile CSV from any reader.
///
/// # Arguments
///
/// * `reader` - CSV source
/// * `source` - Label used in the report
/// * `expected_dt_hours` - Step length to compare the inferred timestep with
///
/// # Errors
///
/// Only unreadable CSV framing is an `Err`; data problems land in the report.
pub fn validate_reader(
    reader: impl Read,
    source: &str,
    expected_dt_hours: Option<f64>,
) -> Result<ValidationReport, ProfileError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;

    let mut report = ValidationReport {
        source: source.to_string(),
        rows: records.len(),
        columns: headers.iter().map(str::to_string).collect(),
        ..ValidationReport::default()
    };

    if records.is_empty() {
        report.errors.push("CSV has no rows.".into());
        return Ok(report);
    }

    let column_index = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| column_index(*c).is_none())
        .collect();
    if !missing.is_empty() {
        report
            .errors
            .push(format!("Missing required columns: {missing:?}"));
        return Ok(report);
    }

    let mut numeric: Vec<&str> = REQUIRED_COLUMNS.to_vec();
    if column_index(EXPORT_COLUMN).is_some() {
        numeric.push(EXPORT_COLUMN);
    } else {
        report.warnings.push(
            "Column 'price_export_per_kwh' is missing. Export price will be derived from import price."
                .into(),
        );
    }

    let mut peak_load = f64::NEG_INFINITY;
    for col in &numeric {
        let Some(idx) = column_index(*col) else {
            continue;
        };
        let mut non_finite = 0usize;
        let mut negative = 0usize;
        for rec in &records {
            match rec.get(idx).and_then(|v| v.parse::<f64>().ok()) {
                Some(v) if v.is_finite() => {
                    if v < 0.0 {
                        negative += 1;
                    }
                    if *col == "load_kw" {
                        peak_load = peak_load.max(v);
                    }
                }
                _ => non_finite += 1,
            }
        }
        if non_finite > 0 {
            report
                .errors
                .push(format!("Column '{col}' has {non_finite} non-finite values."));
        }
        if negative > 0 {
            report
                .errors
                .push(format!("Column '{col}' has {negative} negative values."));
        }
    }

    match column_index(TIMESTAMP_COLUMN) {
        Some(idx) => check_timestamps(&records, idx, expected_dt_hours, &mut report),
        None => report
            .warnings
            .push("Column 'timestamp' is missing. Time continuity checks were skipped.".into()),
    }

    if peak_load > PEAK_LOAD_WARN_KW {
        report.warnings.push(format!(
            "Peak load appears high ({peak_load:.2} kW). Verify scaling/units."
        ));
    }

    Ok(report)
}

fn check_timestamps(
    records: &[csv::StringRecord],
    idx: usize,
    expected_dt_hours: Option<f64>,
    report: &mut ValidationReport,
) {
    let parsed: Vec<Option<NaiveDateTime>> = records
        .iter()
        .map(|r| r.get(idx).and_then(parse_timestamp))
        .collect();

    let invalid = parsed.iter().filter(|t| t.is_none()).count();
    if invalid > 0 {
        report.errors.push(format!(
            "Column 'timestamp' has {invalid} invalid datetime values."
        ));
        return;
    }
    let ts: Vec<NaiveDateTime> = parsed.into_iter().flatten().collect();

    if ts.windows(2).any(|w| w[1] < w[0]) {
        report
            .errors
            .push("Column 'timestamp' is not sorted in ascending order.".into());
    }

    let mut sorted = ts.clone();
    sorted.sort();
    let duplicates = sorted.windows(2).filter(|w| w[0] == w[1]).count();
    if duplicates > 0 {
        report.errors.push(format!(
            "Column 'timestamp' has {duplicates} duplicate entries."
        ));
    }

    report.timestamp_start = ts.first().map(|t| t.to_string());
    report.timestamp_end = ts.last().map(|t| t.to_string());

    let mut diffs: Vec<f64> = ts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 60.0)
        .collect();
    if diffs.is_empty() {
        return;
    }
    diffs.sort_by(f64::total_cmp);
    let mid = diffs.len() / 2;
    let median = if diffs.len() % 2 == 0 {
        (diffs[mid - 1] + diffs[mid]) / 2.0
    } else {
        diffs[mid]
    };
    report.inferred_timestep_minutes = Some(median);

    if let Some(dt) = expected_dt_hours {
        let expected_minutes = dt * 60.0;
        if (median - expected_minutes).abs() > TIMESTEP_TOLERANCE_MIN {
            report.warnings.push(format!(
                "Inferred timestep {median:.2} min does not match expected {expected_minutes:.2} min."
            ));
        }
    }
}

/// Checks a profile CSV file.
///
/// # Errors
///
/// Returns `ProfileError::Io` if the file cannot be opened.
pub fn validate_profiles_csv(
    path: &Path,
    expected_dt_hours: Option<f64>,
) -> Result<ValidationReport, ProfileError> {
    let file = std::fs::File::open(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report = validate_reader(file, &path.display().to_string(), expected_dt_hours)?;
    for w in &report.warnings {
        tracing::warn!(path = %path.display(), "{w}");
    }
    Ok(report)
}
