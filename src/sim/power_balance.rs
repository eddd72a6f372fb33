//! Bus power balance, cost accounting, and reward.

use super::types::{BatteryParams, CostBreakdown, RewardWeights};

/// Share of the unmet-load penalty charged per kWh of infeasible battery command.
pub const CLIP_PENALTY_SHARE: f64 = 0.25;

/// Powers at the bus for one step, all in kW.
///
/// Sign conventions:
/// - `renewable_kw`, `load_kw`: positive magnitudes
/// - `battery_kw`: + discharge, - charge
/// - `grid_kw`: + import, - export
#[derive(Debug, Clone, Copy)]
pub struct BusFlows {
    pub renewable_kw: f64,
    pub load_kw: f64,
    pub battery_kw: f64,
    pub grid_kw: f64,
}

/// Tariffs applying to one step.
#[derive(Debug, Clone, Copy)]
pub struct Tariff {
    pub import_per_kwh: f64,
    pub export_per_kwh: f64,
}

/// Energy and cost accounting for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceOutcome {
    /// Bus balance `P_ren + P_b + P_g - P_load` (kW; > 0 surplus, < 0 deficit).
    pub balance_kw: f64,
    pub unmet_energy_kwh: f64,
    pub curtailed_energy_kwh: f64,
    pub costs: CostBreakdown,
    /// `-(grid + degradation + penalty)`.
    pub reward: f64,
}

/// Net bus power: sources minus load.
///
/// This function performs pure summation with **no sign flipping**; inputs
/// must already follow the bus convention documented on [`BusFlows`].
pub fn bus_balance_kw(flows: &BusFlows) -> f64 {
    flows.renewable_kw + flows.battery_kw + flows.grid_kw - flows.load_kw
}

/// Computes balance, unmet/curtailed energy, all cost components, and reward.
///
/// # Arguments
///
/// * `flows` - Realized powers at the bus
/// * `tariff` - Import and export prices for this step
/// * `clip_energy_kwh` - Battery feasibility shortfall for this step
/// * `battery` - Battery parameters (degradation cost)
/// * `weights` - Penalty weights
/// * `dt_hours` - Step duration in hours
pub fn settle(
    flows: &BusFlows,
    tariff: &Tariff,
    clip_energy_kwh: f64,
    battery: &BatteryParams,
    weights: &RewardWeights,
    dt_hours: f64,
) -> BalanceOutcome {
    let balance_kw = bus_balance_kw(flows);
    let unmet_energy_kwh = (-balance_kw).max(0.0) * dt_hours;
    let curtailed_energy_kwh = balance_kw.max(0.0) * dt_hours;

    let import_cost = flows.grid_kw.max(0.0) * tariff.import_per_kwh * dt_hours;
    let export_revenue = (-flows.grid_kw).max(0.0) * tariff.export_per_kwh * dt_hours;
    let grid_cost = import_cost - export_revenue;

    let degradation_cost = flows.battery_kw.abs() * dt_hours * battery.degradation_cost_per_kwh;

    let penalty_cost = weights.unmet_load_penalty_per_kwh * unmet_energy_kwh
        + weights.export_curtail_penalty_per_kwh * curtailed_energy_kwh
        + CLIP_PENALTY_SHARE * weights.unmet_load_penalty_per_kwh * clip_energy_kwh;

    let costs = CostBreakdown {
        grid_cost,
        degradation_cost,
        penalty_cost,
    };

    BalanceOutcome {
        balance_kw,
        unmet_energy_kwh,
        curtailed_energy_kwh,
        costs,
        reward: -(grid_cost + degradation_cost + penalty_cost),
    }
}
