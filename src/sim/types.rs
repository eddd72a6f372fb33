//! Core simulation types: parameters, episode state, actions, and step records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::safety::SafetyDecision;
use crate::error::{ActionError, ConfigError};

/// Battery energy storage parameters.
///
/// Power convention throughout the engine: positive battery power is
/// discharge (supplying the bus), negative is charge (drawing from the bus).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryParams {
    /// Usable energy capacity (kWh, > 0).
    pub capacity_kwh: f64,
    /// Maximum charging power magnitude (kW, > 0).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW, > 0).
    pub max_discharge_kw: f64,
    /// Charge efficiency in (0, 1].
    pub charge_efficiency: f64,
    /// Discharge efficiency in (0, 1].
    pub discharge_efficiency: f64,
    /// Lower SoC bound (fraction).
    pub soc_min: f64,
    /// Upper SoC bound (fraction).
    pub soc_max: f64,
    /// Linear wear cost per kWh of throughput.
    pub degradation_cost_per_kwh: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            capacity_kwh: 150.0,
            max_charge_kw: 75.0,
            max_discharge_kw: 75.0,
            charge_efficiency: 0.95,
            discharge_efficiency: 0.95,
            soc_min: 0.1,
            soc_max: 0.9,
            degradation_cost_per_kwh: 0.02,
        }
    }
}

/// Utility interconnection limits and tariff fallback.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridParams {
    /// Maximum import power (kW, >= 0).
    pub max_import_kw: f64,
    /// Maximum export power magnitude (kW, >= 0).
    pub max_export_kw: f64,
    /// Export tariff as a fraction of import tariff when the profile has none.
    pub sell_price_factor: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            max_import_kw: 250.0,
            max_export_kw: 150.0,
            sell_price_factor: 0.8,
        }
    }
}

/// Penalty weights applied to reliability and surplus losses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardWeights {
    pub unmet_load_penalty_per_kwh: f64,
    pub export_curtail_penalty_per_kwh: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            unmet_load_penalty_per_kwh: 15.0,
            export_curtail_penalty_per_kwh: 0.1,
        }
    }
}

/// Episode timing and initial conditions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvParams {
    /// Duration of one step in hours (> 0).
    pub time_step_hours: f64,
    /// Number of steps per episode (> 0).
    pub horizon: usize,
    /// Default starting SoC, within `[soc_min, soc_max]`.
    pub initial_soc: f64,
    /// Seed used for profile generation when `reset` is given none.
    pub seed: u64,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            time_step_hours: 0.25,
            horizon: 96,
            initial_soc: 0.5,
            seed: 42,
        }
    }
}

/// Complete immutable parameter set for one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MicrogridParams {
    pub env: EnvParams,
    pub battery: BatteryParams,
    pub grid: GridParams,
    pub reward: RewardWeights,
}

impl MicrogridParams {
    /// Checks every bound and returns all violations.
    ///
    /// Returns an empty vector when the parameter set is usable.
    pub fn check(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: &str| {
            errors.push(ConfigError::new(field, message));
        };

        let e = &self.env;
        if !(e.time_step_hours.is_finite() && e.time_step_hours > 0.0) {
            fail("environment.time_step_hours", "must be > 0");
        }
        if e.horizon == 0 {
            fail("environment.horizon", "must be > 0");
        }

        let b = &self.battery;
        if !(b.capacity_kwh.is_finite() && b.capacity_kwh > 0.0) {
            fail("battery.capacity_kwh", "must be > 0");
        }
        if !(b.max_charge_kw.is_finite() && b.max_charge_kw > 0.0) {
            fail("battery.max_charge_kw", "must be > 0");
        }
        if !(b.max_discharge_kw.is_finite() && b.max_discharge_kw > 0.0) {
            fail("battery.max_discharge_kw", "must be > 0");
        }
        if !(b.charge_efficiency > 0.0 && b.charge_efficiency <= 1.0) {
            fail("battery.charge_efficiency", "must be in (0.0, 1.0]");
        }
        if !(b.discharge_efficiency > 0.0 && b.discharge_efficiency <= 1.0) {
            fail("battery.discharge_efficiency", "must be in (0.0, 1.0]");
        }
        if !(b.soc_min >= 0.0 && b.soc_min < b.soc_max && b.soc_max <= 1.0) {
            fail(
                "battery.soc_min",
                "must satisfy 0.0 <= soc_min < soc_max <= 1.0",
            );
        }
        if !(b.degradation_cost_per_kwh >= 0.0) {
            fail("battery.degradation_cost_per_kwh", "must be >= 0");
        }
        if !(e.initial_soc >= b.soc_min && e.initial_soc <= b.soc_max) {
            fail(
                "environment.initial_soc",
                "must be in [battery.soc_min, battery.soc_max]",
            );
        }

        let g = &self.grid;
        if !(g.max_import_kw >= 0.0) {
            fail("grid.max_import_kw", "must be >= 0");
        }
        if !(g.max_export_kw >= 0.0) {
            fail("grid.max_export_kw", "must be >= 0");
        }
        if !(g.sell_price_factor >= 0.0) {
            fail("grid.sell_price_factor", "must be >= 0");
        }

        let r = &self.reward;
        if !(r.unmet_load_penalty_per_kwh >= 0.0) {
            fail("reward.unmet_load_penalty_per_kwh", "must be >= 0");
        }
        if !(r.export_curtail_penalty_per_kwh >= 0.0) {
            fail("reward.export_curtail_penalty_per_kwh", "must be >= 0");
        }

        errors
    }

    /// Fails with the first violated bound, if any.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` reported by [`MicrogridParams::check`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.check().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Mutable per-episode state, exclusively owned by one environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvironmentState {
    /// Step index in `[0, horizon]`.
    pub t: usize,
    /// State of charge in `[soc_min, soc_max]`.
    pub soc: f64,
    /// Thermal stress proxy in `[15, 60]` °C.
    pub temperature_c: f64,
}

/// A battery power command.
///
/// The legacy form also carries a grid command. It is accepted for
/// compatibility and clipped by the supervisor, but grid power is always
/// derived by residual balancing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Action {
    /// Requested battery power (kW; + discharge, - charge).
    pub battery_kw: f64,
    /// Legacy grid command (kW; + import, - export). Ignored by physics.
    pub grid_kw: Option<f64>,
}

impl Action {
    /// Battery-only action.
    pub fn battery(battery_kw: f64) -> Self {
        Self {
            battery_kw,
            grid_kw: None,
        }
    }

    /// Legacy two-element action.
    pub fn legacy(battery_kw: f64, grid_kw: f64) -> Self {
        Self {
            battery_kw,
            grid_kw: Some(grid_kw),
        }
    }

    /// Parses a raw action vector of length 1 or 2.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` on wrong arity or non-finite values.
    pub fn from_slice(values: &[f64]) -> Result<Self, ActionError> {
        let action = match values {
            [battery_kw] => Self::battery(*battery_kw),
            [battery_kw, grid_kw] => Self::legacy(*battery_kw, *grid_kw),
            _ => return Err(ActionError::WrongArity(values.len())),
        };
        action.validate()?;
        Ok(action)
    }

    /// Rejects non-finite components.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::NonFinite` naming the first offending element.
    pub fn validate(&self) -> Result<(), ActionError> {
        if !self.battery_kw.is_finite() {
            return Err(ActionError::NonFinite {
                index: 0,
                value: self.battery_kw,
            });
        }
        if let Some(grid_kw) = self.grid_kw {
            if !grid_kw.is_finite() {
                return Err(ActionError::NonFinite {
                    index: 1,
                    value: grid_kw,
                });
            }
        }
        Ok(())
    }

    /// Returns the action as a raw vector (length 1 or 2).
    pub fn to_vec(&self) -> Vec<f64> {
        match self.grid_kw {
            Some(grid_kw) => vec![self.battery_kw, grid_kw],
            None => vec![self.battery_kw],
        }
    }
}

/// Fixed-shape observation vector.
///
/// Layout: `[P_ren(t), P_ren(t+1), P_load(t), P_load(t+1), soc, temperature,
/// c_imp(t), c_imp(t+1)]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation(pub [f64; Observation::LEN]);

impl Observation {
    pub const LEN: usize = 8;

    pub fn renewable_kw(&self) -> f64 {
        self.0[0]
    }

    pub fn renewable_next_kw(&self) -> f64 {
        self.0[1]
    }

    pub fn load_kw(&self) -> f64 {
        self.0[2]
    }

    pub fn load_next_kw(&self) -> f64 {
        self.0[3]
    }

    pub fn soc(&self) -> f64 {
        self.0[4]
    }

    pub fn temperature_c(&self) -> f64 {
        self.0[5]
    }

    pub fn price_import(&self) -> f64 {
        self.0[6]
    }

    pub fn price_import_next(&self) -> f64 {
        self.0[7]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Per-step cost components. `reward == -(grid_cost + degradation_cost + penalty_cost)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Import cost minus export revenue.
    pub grid_cost: f64,
    pub degradation_cost: f64,
    pub penalty_cost: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.grid_cost + self.degradation_cost + self.penalty_cost
    }
}

/// Physical and safety diagnostics for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepDiagnostics {
    /// Index of the step that was executed.
    pub timestep: usize,
    pub renewable_kw: f64,
    pub load_kw: f64,
    pub price_import_per_kwh: f64,
    pub price_export_per_kwh: f64,
    pub unmet_energy_kwh: f64,
    pub curtailed_energy_kwh: f64,
    /// Feasibility shortfall between the safe command and realized power.
    pub clip_energy_kwh: f64,
    pub realized_battery_kw: f64,
    pub realized_grid_kw: f64,
    /// SoC after the step.
    pub soc: f64,
    /// Thermal proxy after the step.
    pub temperature_c: f64,
    pub safety_decision: SafetyDecision,
}

/// Outcome of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub costs: CostBreakdown,
    pub done: bool,
    pub diagnostics: StepDiagnostics,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.diagnostics;
        write!(
            f,
            "t={:>3} | ren={:>7.2} load={:>7.2} bat={:>7.2} grid={:>7.2} kW \
             (SoC={:.1}%, {:.1}C) | reward={:>8.3} (grid={:.3} deg={:.3} pen={:.3}) \
             unmet={:.2} curt={:.2} kWh safety={}",
            d.timestep,
            d.renewable_kw,
            d.load_kw,
            d.realized_battery_kw,
            d.realized_grid_kw,
            d.soc * 100.0,
            d.temperature_c,
            self.reward,
            self.costs.grid_cost,
            self.costs.degradation_cost,
            self.costs.penalty_cost,
            d.unmet_energy_kwh,
            d.curtailed_energy_kwh,
            d.safety_decision.reason,
        )
    }
}
