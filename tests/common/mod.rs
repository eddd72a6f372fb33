//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use microgrid_sim::profile::{ProfileSeries, StaticProfile, SyntheticProfile};
use microgrid_sim::sim::engine::Environment;
use microgrid_sim::sim::types::{BatteryParams, MicrogridParams};

/// Default parameters (96 steps of 15 min, seed 42).
pub fn default_params() -> MicrogridParams {
    MicrogridParams::default()
}

/// Battery used in the hand-computed scenarios (100 kWh, 50 kW, η 0.95).
pub fn reference_battery() -> BatteryParams {
    BatteryParams {
        capacity_kwh: 100.0,
        max_charge_kw: 50.0,
        max_discharge_kw: 50.0,
        charge_efficiency: 0.95,
        discharge_efficiency: 0.95,
        soc_min: 0.1,
        soc_max: 0.9,
        degradation_cost_per_kwh: 0.02,
    }
}

/// Environment over the default synthetic profile.
pub fn synthetic_env() -> Environment<SyntheticProfile> {
    Environment::new(default_params(), SyntheticProfile::default()).unwrap()
}

/// Environment over a constant profile with the reference battery.
pub fn constant_env(
    horizon: usize,
    renewable_kw: f64,
    load_kw: f64,
    price: f64,
) -> Environment<StaticProfile> {
    let mut params = default_params();
    params.env.horizon = horizon;
    params.battery = reference_battery();
    Environment::new(
        params,
        StaticProfile::constant(renewable_kw, load_kw, price),
    )
    .unwrap()
}

/// A short recorded-looking profile with a daily shape.
pub fn short_series() -> ProfileSeries {
    ProfileSeries {
        renewable_kw: vec![0.0, 5.0, 40.0, 90.0, 60.0, 10.0],
        load_kw: vec![70.0, 65.0, 80.0, 95.0, 120.0, 110.0],
        price_import_per_kwh: vec![0.08, 0.08, 0.12, 0.12, 0.20, 0.20],
        price_export_per_kwh: None,
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "microgrid_sim_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
