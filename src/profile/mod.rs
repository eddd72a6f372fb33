//! Episode profiles and the sources that supply them.
//!
//! A profile is the exogenous part of an episode: renewable generation, load,
//! and tariffs per step. Sources own any randomness they need, seeded
//! explicitly per request, so identical seeds give identical episodes.

/// CSV-backed profile source.
pub mod csv_source;
/// Chronological train/validation/test splitting.
pub mod split;
/// Seeded synthetic profile generator.
pub mod synthetic;
/// Profile data quality checks.
pub mod validation;

pub use csv_source::CsvProfile;
pub use synthetic::SyntheticProfile;

use serde::Serialize;

use crate::error::ProfileError;

/// Raw per-step series as read from a data source, before tiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileSeries {
    pub renewable_kw: Vec<f64>,
    pub load_kw: Vec<f64>,
    pub price_import_per_kwh: Vec<f64>,
    /// Absent when the source carries no export tariff.
    pub price_export_per_kwh: Option<Vec<f64>>,
}

/// Parameters a source needs to produce one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileRequest {
    pub horizon: usize,
    pub dt_hours: f64,
    pub seed: u64,
    /// Export tariff fraction used when the source has no export column.
    pub sell_price_factor: f64,
}

/// Anything that can supply an episode profile.
///
/// Called from `reset` only; implementations may block on I/O.
pub trait ProfileSource {
    /// Produces a profile of exactly `request.horizon` steps.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the data cannot be read or is unusable.
    fn load(&mut self, request: &ProfileRequest) -> Result<EpisodeProfile, ProfileError>;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

impl<P: ProfileSource + ?Sized> ProfileSource for Box<P> {
    fn load(&mut self, request: &ProfileRequest) -> Result<EpisodeProfile, ProfileError> {
        (**self).load(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Immutable episode profile, exactly `horizon` entries per series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeProfile {
    renewable_kw: Vec<f64>,
    load_kw: Vec<f64>,
    price_import_per_kwh: Vec<f64>,
    price_export_per_kwh: Vec<f64>,
}

impl EpisodeProfile {
    /// Fits raw series to the horizon: longer series are truncated, shorter
    /// ones repeated. A missing export tariff is derived from the import
    /// tariff times `sell_price_factor`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptySeries` if any series is empty, or
    /// `ProfileError::InvalidValue` if `horizon` is zero.
    pub fn tiled(
        series: ProfileSeries,
        horizon: usize,
        sell_price_factor: f64,
    ) -> Result<Self, ProfileError> {
        if horizon == 0 {
            return Err(ProfileError::InvalidValue {
                column: "horizon".into(),
                row: 0,
                message: "must be > 0".into(),
            });
        }

        let price_export = match series.price_export_per_kwh {
            Some(export) => export,
            None => series
                .price_import_per_kwh
                .iter()
                .map(|p| p * sell_price_factor)
                .collect(),
        };

        Ok(Self {
            renewable_kw: tile(&series.renewable_kw, horizon, "renewable_kw")?,
            load_kw: tile(&series.load_kw, horizon, "load_kw")?,
            price_import_per_kwh: tile(
                &series.price_import_per_kwh,
                horizon,
                "price_import_per_kwh",
            )?,
            price_export_per_kwh: tile(&price_export, horizon, "price_export_per_kwh")?,
        })
    }

    /// Number of steps covered.
    pub fn len(&self) -> usize {
        self.load_kw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.load_kw.is_empty()
    }

    pub fn renewable_at(&self, index: usize) -> f64 {
        hold(&self.renewable_kw, index)
    }

    pub fn load_at(&self, index: usize) -> f64 {
        hold(&self.load_kw, index)
    }

    pub fn price_import_at(&self, index: usize) -> f64 {
        hold(&self.price_import_per_kwh, index)
    }

    pub fn price_export_at(&self, index: usize) -> f64 {
        hold(&self.price_export_per_kwh, index)
    }

    pub fn renewable_kw(&self) -> &[f64] {
        &self.renewable_kw
    }

    pub fn load_kw(&self) -> &[f64] {
        &self.load_kw
    }

    pub fn price_import_per_kwh(&self) -> &[f64] {
        &self.price_import_per_kwh
    }

    pub fn price_export_per_kwh(&self) -> &[f64] {
        &self.price_export_per_kwh
    }
}

/// Reads `series[index]`, holding the last value past the end.
fn hold(series: &[f64], index: usize) -> f64 {
    match series.get(index) {
        Some(v) => *v,
        None => series.last().copied().unwrap_or(0.0),
    }
}

fn tile(series: &[f64], horizon: usize, name: &'static str) -> Result<Vec<f64>, ProfileError> {
    if series.is_empty() {
        return Err(ProfileError::EmptySeries(name));
    }
    Ok(series.iter().copied().cycle().take(horizon).collect())
}

/// In-memory profile source, tiled to the requested horizon.
///
/// Useful for replaying recorded data and for tests.
#[derive(Debug, Clone)]
pub struct StaticProfile {
    series: ProfileSeries,
}

impl StaticProfile {
    pub fn new(series: ProfileSeries) -> Self {
        Self { series }
    }

    /// Constant renewable, load, and import price for every step.
    pub fn constant(renewable_kw: f64, load_kw: f64, price_import_per_kwh: f64) -> Self {
        Self::new(ProfileSeries {
            renewable_kw: vec![renewable_kw],
            load_kw: vec![load_kw],
            price_import_per_kwh: vec![price_import_per_kwh],
            price_export_per_kwh: None,
        })
    }
}

impl ProfileSource for StaticProfile {
    fn load(&mut self, request: &ProfileRequest) -> Result<EpisodeProfile, ProfileError> {
        EpisodeProfile::tiled(
            self.series.clone(),
            request.horizon,
            request.sell_price_factor,
        )
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
