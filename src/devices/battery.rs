use crate::sim::types::BatteryParams;

/// Realized battery dispatch for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryProjection {
    /// Physically realizable power (kW; + discharge, - charge).
    pub power_kw: f64,
    /// State of charge after the step.
    pub soc: f64,
    /// Energy the request could not deliver: `|requested - realized| * dt` (kWh).
    pub clip_energy_kwh: f64,
}

/// Feasibility model for a battery energy storage system.
///
/// `Battery` is stateless: the caller owns the state of charge and feeds it
/// in on every projection. This keeps the model shareable and lets the
/// environment mutate its state in exactly one place.
///
/// # Power Convention (Bus)
/// - Positive power: Discharging (supplying the bus)
/// - Negative power: Charging (drawing from the bus)
#[derive(Debug, Clone)]
pub struct Battery {
    params: BatteryParams,

    /// Duration of one timestep in hours.
    dt_hours: f64,
}

impl Battery {
    /// Creates a battery model from already-validated parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - Capacity, power limits, efficiencies and SoC window
    /// * `dt_hours` - Step duration in hours (> 0)
    pub fn new(params: BatteryParams, dt_hours: f64) -> Self {
        Self { params, dt_hours }
    }

    pub fn params(&self) -> &BatteryParams {
        &self.params
    }

    /// Maximum discharge power the stored energy above `soc_min` can sustain
    /// for one step, after discharge losses.
    pub fn max_discharge_for_soc_kw(&self, soc: f64) -> f64 {
        let p = &self.params;
        let energy_available_kwh = (soc - p.soc_min).max(0.0) * p.capacity_kwh;
        energy_available_kwh * p.discharge_efficiency / self.dt_hours
    }

    /// Maximum charge power magnitude the room below `soc_max` can absorb
    /// for one step, after charge losses.
    pub fn max_charge_for_soc_kw(&self, soc: f64) -> f64 {
        let p = &self.params;
        let room_kwh = (p.soc_max - soc).max(0.0) * p.capacity_kwh;
        room_kwh / (self.dt_hours * p.charge_efficiency)
    }

    /// Maps a requested power to realized power and the next state of charge.
    ///
    /// Enforces power limits, SoC-derived energy limits, and efficiency
    /// losses. The returned SoC always lies in `[soc_min, soc_max]`.
    ///
    /// # Arguments
    ///
    /// * `soc` - Current state of charge
    /// * `requested_kw` - Requested power (kW; + discharge, - charge)
    pub fn project(&self, soc: f64, requested_kw: f64) -> BatteryProjection {
        let p = &self.params;
        let dt = self.dt_hours;

        let (power_kw, next_soc) = if requested_kw >= 0.0 {
            // Discharge: limited by rating and energy above the floor
            let actual_kw = requested_kw
                .min(p.max_discharge_kw)
                .min(self.max_discharge_for_soc_kw(soc))
                .max(0.0);
            let soc_next = soc - (actual_kw * dt) / (p.capacity_kwh * p.discharge_efficiency);
            (actual_kw, soc_next)
        } else {
            // Charge: limited by rating and room below the ceiling
            let actual_abs_kw = (-requested_kw)
                .min(p.max_charge_kw)
                .min(self.max_charge_for_soc_kw(soc))
                .max(0.0);
            let soc_next = soc + (actual_abs_kw * dt * p.charge_efficiency) / p.capacity_kwh;
            (-actual_abs_kw, soc_next)
        };

        // Rounding guard only; the limits above already keep SoC in the window.
        let soc = next_soc.clamp(p.soc_min, p.soc_max);

        BatteryProjection {
            power_kw,
            soc,
            clip_energy_kwh: (requested_kw - power_kw).abs() * dt,
        }
    }
}
