//! Deterministic safety supervisor for battery commands.
//!
//! The supervisor is a pure projection: it holds only immutable limits, never
//! sees policy internals, and can be shared across environments or used on a
//! hardware dispatch path without synchronization.

use std::fmt;

use serde::Serialize;

use super::types::{Action, BatteryParams, GridParams, Observation};

/// SoC margin inside the configured window where directional blocks engage.
pub const SOC_GUARD_MARGIN: f64 = 0.01;
/// Temperature at or above which the battery is forced idle (°C).
pub const THERMAL_BLOCK_C: f64 = 48.0;

/// The last rule that changed the command.
///
/// Variants are ordered by precedence: a later rule that alters the
/// command replaces the reason from an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyReason {
    None,
    PowerLimit,
    SocMinBlock,
    SocMaxBlock,
    ThermalBlock,
}

impl SafetyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PowerLimit => "power_limit",
            Self::SocMinBlock => "soc_min_block",
            Self::SocMaxBlock => "soc_max_block",
            Self::ThermalBlock => "thermal_block",
        }
    }
}

impl fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor verdict for one command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyDecision {
    /// Battery command after projection (kW; + discharge, - charge).
    pub safe_battery_kw: f64,
    /// Legacy grid command after clipping, if one was given.
    pub safe_grid_kw: Option<f64>,
    /// Whether the safe action differs from the raw action.
    pub overridden: bool,
    pub reason: SafetyReason,
}

impl SafetyDecision {
    /// The projected action, preserving the raw action's arity.
    pub fn action(&self) -> Action {
        Action {
            battery_kw: self.safe_battery_kw,
            grid_kw: self.safe_grid_kw,
        }
    }
}

/// Hard safety envelope around battery dispatch.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    max_charge_kw: f64,
    max_discharge_kw: f64,
    soc_min: f64,
    soc_max: f64,
    max_import_kw: f64,
    max_export_kw: f64,
}

impl SafetySupervisor {
    /// Builds a supervisor from validated battery and grid limits.
    pub fn new(battery: &BatteryParams, grid: &GridParams) -> Self {
        Self {
            max_charge_kw: battery.max_charge_kw,
            max_discharge_kw: battery.max_discharge_kw,
            soc_min: battery.soc_min,
            soc_max: battery.soc_max,
            max_import_kw: grid.max_import_kw,
            max_export_kw: grid.max_export_kw,
        }
    }

    /// Projects a raw action onto the safe set for the given state.
    ///
    /// Rules run in order, each seeing the previous result:
    /// 1. clip to power ratings (and the legacy grid element to grid limits)
    /// 2. near `soc_min`, block discharge
    /// 3. near `soc_max`, block charge
    /// 4. at high temperature, force zero
    ///
    /// Total over all inputs: a non-finite battery command is treated as zero
    /// and reported as a power-limit override.
    pub fn apply(&self, raw: &Action, soc: f64, temperature_c: f64) -> SafetyDecision {
        let mut reason = SafetyReason::None;

        // 1. Power limits
        let mut battery_kw = if raw.battery_kw.is_finite() {
            raw.battery_kw.clamp(-self.max_charge_kw, self.max_discharge_kw)
        } else {
            0.0
        };
        if battery_kw != raw.battery_kw {
            reason = SafetyReason::PowerLimit;
        }

        let safe_grid_kw = raw.grid_kw.map(|grid_kw| {
            let clipped = if grid_kw.is_finite() {
                grid_kw.clamp(-self.max_export_kw, self.max_import_kw)
            } else {
                0.0
            };
            if clipped != grid_kw {
                reason = reason.max(SafetyReason::PowerLimit);
            }
            clipped
        });

        // 2. Low SoC: only charge or hold
        if soc <= self.soc_min + SOC_GUARD_MARGIN && battery_kw > 0.0 {
            battery_kw = 0.0;
            reason = SafetyReason::SocMinBlock;
        }

        // 3. High SoC: only discharge or hold
        if soc >= self.soc_max - SOC_GUARD_MARGIN && battery_kw < 0.0 {
            battery_kw = 0.0;
            reason = SafetyReason::SocMaxBlock;
        }

        // 4. Thermal: force idle
        if temperature_c >= THERMAL_BLOCK_C && battery_kw != 0.0 {
            battery_kw = 0.0;
            reason = SafetyReason::ThermalBlock;
        }

        let overridden = reason != SafetyReason::None;
        SafetyDecision {
            safe_battery_kw: battery_kw,
            safe_grid_kw,
            overridden,
            reason,
        }
    }

    /// Same as [`SafetySupervisor::apply`], reading SoC and temperature from
    /// an observation vector.
    pub fn apply_to_observation(&self, raw: &Action, observation: &Observation) -> SafetyDecision {
        self.apply(raw, observation.soc(), observation.temperature_c())
    }
}
