//! Dispatch policies mapping observations to battery commands.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::safety::SOC_GUARD_MARGIN;
use super::types::{Action, BatteryParams, GridParams, Observation};

/// Anything that can choose a battery command from an observation.
///
/// The environment depends only on this capability, never on how a policy
/// arrives at its decision. Returned actions are raw: the environment's
/// safety supervisor projects them before physics.
pub trait Policy {
    /// Chooses the next action.
    fn choose_action(&mut self, observation: &Observation) -> Action;

    /// Short name for logs and reports.
    fn name(&self) -> &str;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn choose_action(&mut self, observation: &Observation) -> Action {
        (**self).choose_action(observation)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Thresholds for [`RuleBasedController`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleBasedPolicyConfig {
    /// Tariff at or below which idle capacity charges (per kWh).
    pub low_price_threshold: f64,
    /// Tariff at or above which deficits are covered from storage (per kWh).
    pub high_price_threshold: f64,
    /// SoC kept in reserve during high-tariff discharge.
    pub reserve_soc: f64,
    /// Opportunistic charging stops at this SoC.
    pub target_soc: f64,
    /// Above this SoC, half of any deficit is discharged regardless of tariff.
    pub high_soc_discharge_bias: f64,
    /// Fraction of the charge rating used for opportunistic charging.
    pub low_price_charge_fraction: f64,
}

impl Default for RuleBasedPolicyConfig {
    fn default() -> Self {
        Self {
            low_price_threshold: 0.11,
            high_price_threshold: 0.16,
            reserve_soc: 0.20,
            target_soc: 0.70,
            high_soc_discharge_bias: 0.75,
            low_price_charge_fraction: 0.5,
        }
    }
}

/// Heuristic cost-aware dispatch baseline.
///
/// Priority order:
/// 1. Renewable surplus: charge with the surplus (up to rating) unless full
/// 2. Deficit at a high tariff: discharge the full deficit above the reserve
/// 3. Deficit at high SoC: discharge half the deficit
/// 4. Low tariff: charge at a fraction of rating up to the target SoC
///
/// Commands the battery only; the grid is balanced by the environment.
#[derive(Debug, Clone)]
pub struct RuleBasedController {
    battery: BatteryParams,
    max_import_kw: f64,
    config: RuleBasedPolicyConfig,
}

impl RuleBasedController {
    pub fn new(battery: &BatteryParams, grid: &GridParams, config: RuleBasedPolicyConfig) -> Self {
        Self {
            battery: battery.clone(),
            max_import_kw: grid.max_import_kw,
            config,
        }
    }

    /// Computes the battery command for the given observation.
    pub fn battery_setpoint_kw(&self, observation: &Observation) -> f64 {
        let b = &self.battery;
        let p = &self.config;
        let soc = observation.soc();
        let price = observation.price_import();

        let net_excess = (observation.renewable_kw() - observation.load_kw()).max(0.0);
        let net_deficit = (observation.load_kw() - observation.renewable_kw()).max(0.0);

        if net_excess > 0.0 && soc < b.soc_max - SOC_GUARD_MARGIN {
            -b.max_charge_kw.min(net_excess)
        } else if net_deficit > 0.0 {
            let reserve_floor = (b.soc_min + SOC_GUARD_MARGIN).max(p.reserve_soc);
            if soc > reserve_floor && price >= p.high_price_threshold {
                b.max_discharge_kw.min(net_deficit)
            } else if soc > p.high_soc_discharge_bias {
                b.max_discharge_kw.min(0.5 * net_deficit)
            } else {
                0.0
            }
        } else if price <= p.low_price_threshold
            && soc < p.target_soc.min(b.soc_max - SOC_GUARD_MARGIN)
        {
            -(b.max_charge_kw * p.low_price_charge_fraction).min(self.max_import_kw)
        } else {
            0.0
        }
    }
}

impl Policy for RuleBasedController {
    fn choose_action(&mut self, observation: &Observation) -> Action {
        Action::battery(self.battery_setpoint_kw(observation))
    }

    fn name(&self) -> &str {
        "rule_based"
    }
}

/// Always holds the battery idle.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdlePolicy;

impl Policy for IdlePolicy {
    fn choose_action(&mut self, _observation: &Observation) -> Action {
        Action::battery(0.0)
    }

    fn name(&self) -> &str {
        "idle"
    }
}

/// Uniformly random battery commands over the rated power range.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    max_charge_kw: f64,
    max_discharge_kw: f64,
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a seeded random policy.
    pub fn new(battery: &BatteryParams, seed: u64) -> Self {
        Self {
            max_charge_kw: battery.max_charge_kw,
            max_discharge_kw: battery.max_discharge_kw,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn choose_action(&mut self, _observation: &Observation) -> Action {
        Action::battery(
            self.rng
                .random_range(-self.max_charge_kw..=self.max_discharge_kw),
        )
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RuleBasedController {
        RuleBasedController::new(
            &BatteryParams::default(),
            &GridParams::default(),
            RuleBasedPolicyConfig::default(),
        )
    }

    fn obs(renewable: f64, load: f64, soc: f64, price: f64) -> Observation {
        Observation([renewable, renewable, load, load, soc, 30.0, price, price])
    }

    #[test]
    fn charges_on_excess_renewable() {
        let kw = controller().battery_setpoint_kw(&obs(120.0, 60.0, 0.5, 0.09));
        assert_eq!(kw, -60.0);
    }

    #[test]
    fn excess_charge_capped_at_rating() {
        let kw = controller().battery_setpoint_kw(&obs(300.0, 60.0, 0.5, 0.2));
        assert_eq!(kw, -75.0);
    }

    #[test]
    fn full_battery_does_not_absorb_surplus() {
        // Surplus but full, price above low threshold: hold
        let kw = controller().battery_setpoint_kw(&obs(120.0, 60.0, 0.895, 0.2));
        assert_eq!(kw, 0.0);
    }

    #[test]
    fn high_tariff_deficit_discharges_fully() {
        let kw = controller().battery_setpoint_kw(&obs(20.0, 80.0, 0.5, 0.2));
        assert_eq!(kw, 60.0);
    }

    #[test]
    fn reserve_floor_blocks_high_tariff_discharge() {
        let kw = controller().battery_setpoint_kw(&obs(20.0, 80.0, 0.2, 0.2));
        assert_eq!(kw, 0.0);
    }

    #[test]
    fn high_soc_discharges_half_deficit() {
        let kw = controller().battery_setpoint_kw(&obs(20.0, 80.0, 0.8, 0.12));
        assert_eq!(kw, 30.0);
    }

    #[test]
    fn low_tariff_charges_toward_target() {
        // Balanced bus, cheap energy, below target
        let kw = controller().battery_setpoint_kw(&obs(50.0, 50.0, 0.4, 0.1));
        assert_eq!(kw, -37.5);

        let kw = controller().battery_setpoint_kw(&obs(50.0, 50.0, 0.75, 0.1));
        assert_eq!(kw, 0.0);
    }

    #[test]
    fn setpoint_within_rating() {
        let b = BatteryParams::default();
        let mut c = controller();
        for soc in [0.1, 0.3, 0.5, 0.8, 0.9] {
            for (ren, load) in [(0.0, 200.0), (200.0, 0.0), (50.0, 50.0)] {
                let a = c.choose_action(&obs(ren, load, soc, 0.15));
                assert!(a.battery_kw >= -b.max_charge_kw && a.battery_kw <= b.max_discharge_kw);
                assert!(a.grid_kw.is_none());
            }
        }
    }

    #[test]
    fn idle_always_zero() {
        let a = IdlePolicy.choose_action(&obs(10.0, 90.0, 0.5, 0.3));
        assert_eq!(a, Action::battery(0.0));
    }

    #[test]
    fn random_policy_is_seeded_and_bounded() {
        let b = BatteryParams::default();
        let mut p1 = RandomPolicy::new(&b, 3);
        let mut p2 = RandomPolicy::new(&b, 3);
        let o = obs(0.0, 0.0, 0.5, 0.1);
        for _ in 0..50 {
            let a1 = p1.choose_action(&o);
            let a2 = p2.choose_action(&o);
            assert_eq!(a1, a2);
            assert!(a1.battery_kw >= -b.max_charge_kw && a1.battery_kw <= b.max_discharge_kw);
        }
    }

    #[test]
    fn boxed_policy_delegates() {
        let mut p: Box<dyn Policy> = Box::new(IdlePolicy);
        assert_eq!(p.name(), "idle");
        assert_eq!(p.choose_action(&obs(0.0, 0.0, 0.5, 0.1)).battery_kw, 0.0);
    }
}
