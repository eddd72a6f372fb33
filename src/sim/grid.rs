use crate::sim::types::GridParams;

/// Utility interconnection that closes the bus balance.
///
/// Grid power convention:
/// - Positive values are import (power drawn from the utility)
/// - Negative values are export (power sent to the utility)
#[derive(Debug, Clone)]
pub struct Grid {
    max_import_kw: f64,
    max_export_kw: f64,
}

impl Grid {
    /// Creates a grid connection with the configured transfer limits.
    pub fn new(params: &GridParams) -> Self {
        Self {
            max_import_kw: params.max_import_kw,
            max_export_kw: params.max_export_kw,
        }
    }

    /// Returns the maximum import limit in kW.
    pub fn max_import_kw(&self) -> f64 {
        self.max_import_kw
    }

    /// Returns the maximum export limit in kW (positive magnitude).
    pub fn max_export_kw(&self) -> f64 {
        self.max_export_kw
    }

    /// Returns the minimum grid power (negated export limit).
    pub fn min_kw(&self) -> f64 {
        -self.max_export_kw
    }

    /// Clips a grid power value to `[-max_export_kw, max_import_kw]`.
    pub fn clip_kw(&self, kw: f64) -> f64 {
        kw.clamp(self.min_kw(), self.max_import_kw)
    }

    /// Residual balancing: the grid supplies whatever load is not covered by
    /// renewables and the battery, within transfer limits.
    ///
    /// # Arguments
    ///
    /// * `load_kw` - Load demand (kW, positive)
    /// * `renewable_kw` - Renewable generation (kW, positive)
    /// * `battery_kw` - Realized battery power (kW; + discharge, - charge)
    ///
    /// # Returns
    ///
    /// Realized grid power (kW; + import, - export)
    pub fn balance_kw(&self, load_kw: f64, renewable_kw: f64, battery_kw: f64) -> f64 {
        self.clip_kw(load_kw - renewable_kw - battery_kw)
    }
}
