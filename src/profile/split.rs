use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use super::csv_source::TIMESTAMP_COLUMN;
use super::validation::parse_timestamp;
use crate::error::ProfileError;

/// Fractions of rows assigned to each split. Each > 0, summing to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.15,
            test: 0.15,
        }
    }
}

impl SplitRatios {
    /// # Errors
    ///
    /// Returns `ProfileError::Split` if any ratio is not positive or the sum
    /// differs from 1 by more than 1e-6.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(value > 0.0) {
                return Err(ProfileError::Split(format!(
                    "{name} ratio must be > 0, got {value}"
                )));
            }
        }
        let total = self.train + self.val + self.test;
        if (total - 1.0).abs() > 1e-6 {
            return Err(ProfileError::Split(format!(
                "ratios must sum to 1.0, got {total:.6} (train={}, val={}, test={})",
                self.train, self.val, self.test
            )));
        }
        Ok(())
    }

    /// Row counts for `n` rows: every split non-empty, remainder to train.
    fn counts(&self, n: usize) -> [usize; 3] {
        let raw = [self.train, self.val, self.test].map(|r| (n as f64 * r) as usize);
        let mut counts = raw.map(|c| c.max(1));

        while counts.iter().sum::<usize>() > n {
            let largest = (0..3).max_by_key(|&i| (counts[i], 3 - i)).unwrap_or(0);
            if counts[largest] <= 1 {
                break;
            }
            counts[largest] -= 1;
        }
        let total: usize = counts.iter().sum();
        if total < n {
            counts[0] += n - total;
        }
        counts
    }
}

/// Chronological partition of profile rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

/// Splits rows in order into train/validation/test partitions.
///
/// # Errors
///
/// Returns `ProfileError::Split` for invalid ratios or fewer than 3 rows.
pub fn split_records<T: Clone>(
    rows: &[T],
    ratios: SplitRatios,
) -> Result<SplitResult<T>, ProfileError> {
    ratios.validate()?;
    if rows.len() < 3 {
        return Err(ProfileError::Split(
            "at least 3 rows are required to create train/val/test splits".into(),
        ));
    }

    let [n_train, n_val, n_test] = ratios.counts(rows.len());
    if n_train + n_val + n_test != rows.len() {
        return Err(ProfileError::Split(format!(
            "unable to compute non-empty splits: train={n_train}, val={n_val}, test={n_test}, total={}",
            rows.len()
        )));
    }

    Ok(SplitResult {
        train: rows[..n_train].to_vec(),
        val: rows[n_train..n_train + n_val].to_vec(),
        test: rows[n_train + n_val..].to_vec(),
    })
}

/// Output file paths written by [`split_profile_csv`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPaths {
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
}

/// Splits a profile CSV chronologically and writes
/// `profiles_{train,val,test}.csv` into `out_dir`.
///
/// When a `timestamp` column exists, every value must parse and the column
/// must already be sorted.
///
/// # Errors
///
/// Returns `ProfileError` on I/O or CSV failures, invalid timestamps, or an
/// invalid split.
pub fn split_profile_csv(
    input: &Path,
    out_dir: &Path,
    ratios: SplitRatios,
) -> Result<SplitPaths, ProfileError> {
    let mut rdr = csv::Reader::from_path(input)?;
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<StringRecord>, _>>()?;

    if let Some(idx) = headers.iter().position(|h| h.trim() == TIMESTAMP_COLUMN) {
        let mut prev = None;
        for (row, rec) in records.iter().enumerate() {
            let Some(ts) = rec.get(idx).and_then(parse_timestamp) else {
                return Err(ProfileError::Split(format!(
                    "timestamp column contains an invalid value at row {row}; cannot split chronologically"
                )));
            };
            if prev.is_some_and(|p| ts < p) {
                return Err(ProfileError::Split(
                    "timestamp column must be sorted before splitting".into(),
                ));
            }
            prev = Some(ts);
        }
    }

    let split = split_records(&records, ratios)?;

    fs::create_dir_all(out_dir).map_err(|source| io_error(out_dir, source))?;
    let paths = SplitPaths {
        train: out_dir.join("profiles_train.csv"),
        val: out_dir.join("profiles_val.csv"),
        test: out_dir.join("profiles_test.csv"),
    };

    for (path, rows) in [
        (&paths.train, &split.train),
        (&paths.val, &split.val),
        (&paths.test, &split.test),
    ] {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&headers)?;
        for rec in rows {
            wtr.write_record(rec)?;
        }
        wtr.flush().map_err(|source| io_error(path, source))?;
    }

    tracing::info!(
        input = %input.display(),
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        "split profile csv"
    );
    Ok(paths)
}

fn io_error(path: &Path, source: std::io::Error) -> ProfileError {
    ProfileError::Io {
        path: path.to_path_buf(),
        source,
    }
}
