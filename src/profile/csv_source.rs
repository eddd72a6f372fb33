use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{EpisodeProfile, ProfileRequest, ProfileSeries, ProfileSource};
use crate::error::ProfileError;

/// Columns every profile CSV must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["renewable_kw", "load_kw", "price_import_per_kwh"];
/// Optional export tariff column.
pub const EXPORT_COLUMN: &str = "price_export_per_kwh";
/// Optional timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One CSV row. Unknown columns (e.g. `timestamp`) are ignored.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    renewable_kw: f64,
    load_kw: f64,
    price_import_per_kwh: f64,
    #[serde(default)]
    price_export_per_kwh: Option<f64>,
}

/// Reads profile series from any CSV reader.
///
/// When the `price_export_per_kwh` column is absent the export series is left
/// empty and derived from the import tariff when the episode is built. When
/// the column is present every row must fill it.
///
/// # Errors
///
/// Returns `ProfileError::MissingColumns` if a required column is absent,
/// `ProfileError::Csv` on malformed rows, and `ProfileError::InvalidValue`
/// for a non-finite or negative value or an empty export cell.
pub fn read_series(reader: impl Read) -> Result<ProfileSeries, ProfileError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ProfileError::MissingColumns(missing));
    }
    let has_export = headers.iter().any(|h| h == EXPORT_COLUMN);

    let mut series = ProfileSeries::default();
    let mut export = Vec::new();
    for (index, row) in rdr.deserialize::<ProfileRow>().enumerate() {
        let row = row?;
        series
            .renewable_kw
            .push(checked("renewable_kw", index, row.renewable_kw)?);
        series.load_kw.push(checked("load_kw", index, row.load_kw)?);
        series
            .price_import_per_kwh
            .push(checked("price_import_per_kwh", index, row.price_import_per_kwh)?);
        if has_export {
            let Some(price) = row.price_export_per_kwh else {
                return Err(invalid(EXPORT_COLUMN, index, "empty cell"));
            };
            export.push(checked(EXPORT_COLUMN, index, price)?);
        }
    }

    if has_export {
        series.price_export_per_kwh = Some(export);
    }
    Ok(series)
}

/// Passes through a finite, non-negative value.
fn checked(column: &str, row: usize, value: f64) -> Result<f64, ProfileError> {
    if !value.is_finite() {
        return Err(invalid(column, row, format!("non-finite value {value}")));
    }
    if value < 0.0 {
        return Err(invalid(column, row, format!("negative value {value}")));
    }
    Ok(value)
}

fn invalid(column: &str, row: usize, message: impl Into<String>) -> ProfileError {
    ProfileError::InvalidValue {
        column: column.to_string(),
        row,
        message: message.into(),
    }
}

/// Reads profile series from a CSV file.
///
/// # Errors
///
/// Returns `ProfileError::Io` if the file cannot be opened, otherwise as
/// [`read_series`].
pub fn read_series_from_path(path: &Path) -> Result<ProfileSeries, ProfileError> {
    let file = File::open(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_series(std::io::BufReader::new(file))
}

/// Profile source backed by a CSV file, re-read on every reset.
#[derive(Debug, Clone)]
pub struct CsvProfile {
    path: PathBuf,
}

impl CsvProfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileSource for CsvProfile {
    fn load(&mut self, request: &ProfileRequest) -> Result<EpisodeProfile, ProfileError> {
        let series = read_series_from_path(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = series.load_kw.len(),
            horizon = request.horizon,
            "loaded profile csv"
        );
        EpisodeProfile::tiled(series, request.horizon, request.sell_price_factor)
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
