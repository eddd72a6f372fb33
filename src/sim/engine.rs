//! Environment state machine sequencing supervisor, physics, and accounting.

use crate::devices::thermal::{BASE_TEMPERATURE_C, next_temperature_c};
use crate::devices::Battery;
use crate::error::EnvError;
use crate::profile::{EpisodeProfile, ProfileRequest, ProfileSource};

use super::grid::Grid;
use super::observation;
use super::power_balance::{BusFlows, Tariff, settle};
use super::safety::SafetySupervisor;
use super::types::{
    Action, EnvironmentState, MicrogridParams, Observation, StepDiagnostics, StepResult,
};

/// Single microgrid environment with `reset`/`step` semantics.
///
/// Generic over `P: ProfileSource` for static dispatch. Parameters are
/// validated once in [`Environment::new`] and never change afterwards; the
/// only mutable data is the per-episode state and profile, replaced on every
/// reset.
///
/// One instance is single-writer: run several instances (one per thread)
/// for parallel rollouts rather than sharing one.
pub struct Environment<P: ProfileSource> {
    params: MicrogridParams,
    source: P,
    battery: Battery,
    grid: Grid,
    supervisor: SafetySupervisor,
    profile: Option<EpisodeProfile>,
    state: Option<EnvironmentState>,
}

impl<P: ProfileSource> Environment<P> {
    /// Creates an environment after validating the parameter set.
    ///
    /// # Arguments
    ///
    /// * `params` - Battery, grid, reward, and episode parameters
    /// * `source` - Supplier of episode profiles, consulted on every reset
    ///
    /// # Errors
    ///
    /// Returns `EnvError::Config` naming the first invalid field.
    pub fn new(params: MicrogridParams, source: P) -> Result<Self, EnvError> {
        params.validate()?;
        let battery = Battery::new(params.battery.clone(), params.env.time_step_hours);
        let grid = Grid::new(&params.grid);
        let supervisor = SafetySupervisor::new(&params.battery, &params.grid);
        Ok(Self {
            params,
            source,
            battery,
            grid,
            supervisor,
            profile: None,
            state: None,
        })
    }

    /// Starts a new episode.
    ///
    /// # Arguments
    ///
    /// * `seed` - Profile seed; the configured seed when `None`
    /// * `initial_soc` - Starting SoC; the configured value when `None`
    ///
    /// # Returns
    ///
    /// The observation at `t = 0`.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::InitialSoc` for an override outside the SoC window
    /// and `EnvError::Profile` when the source fails. The previous episode is
    /// left untouched on error.
    pub fn reset(
        &mut self,
        seed: Option<u64>,
        initial_soc: Option<f64>,
    ) -> Result<Observation, EnvError> {
        let b = &self.params.battery;
        let soc = initial_soc.unwrap_or(self.params.env.initial_soc);
        if !(soc >= b.soc_min && soc <= b.soc_max) {
            return Err(EnvError::InitialSoc {
                soc,
                soc_min: b.soc_min,
                soc_max: b.soc_max,
            });
        }

        let horizon = self.params.env.horizon;
        let request = ProfileRequest {
            horizon,
            dt_hours: self.params.env.time_step_hours,
            seed: seed.unwrap_or(self.params.env.seed),
            sell_price_factor: self.params.grid.sell_price_factor,
        };
        let profile = self.source.load(&request)?;
        if profile.len() < horizon {
            return Err(EnvError::ProfileTooShort {
                len: profile.len(),
                horizon,
            });
        }

        let state = EnvironmentState {
            t: 0,
            soc,
            temperature_c: BASE_TEMPERATURE_C,
        };
        let obs = observation::assemble(&state, &profile);

        tracing::debug!(
            source = self.source.name(),
            seed = request.seed,
            soc,
            horizon,
            "environment reset"
        );

        self.state = Some(state);
        self.profile = Some(profile);
        Ok(obs)
    }

    /// Advances one step with a raw action vector of length 1 or 2.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::NotReset`, `EnvError::Terminal`, or
    /// `EnvError::Action` without mutating any state.
    pub fn step(&mut self, raw: &[f64]) -> Result<StepResult, EnvError> {
        // State errors take priority over a malformed action.
        self.current()?;
        let action = Action::from_slice(raw)?;
        self.step_action(&action)
    }

    /// Advances one step with a typed action.
    ///
    /// Sequence: safety supervisor, battery projection, residual grid
    /// balance, cost accounting, thermal update. `t` advances by exactly one
    /// and `done` is set when it reaches the horizon.
    ///
    /// # Errors
    ///
    /// Same as [`Environment::step`].
    pub fn step_action(&mut self, action: &Action) -> Result<StepResult, EnvError> {
        let (state, profile) = self.current()?;
        action.validate()?;

        let t = state.t;
        let dt = self.params.env.time_step_hours;

        // 1. Safety projection on the raw command
        let decision = self.supervisor.apply(action, state.soc, state.temperature_c);
        if decision.overridden {
            tracing::debug!(
                t,
                raw_kw = action.battery_kw,
                safe_kw = decision.safe_battery_kw,
                reason = %decision.reason,
                "safety override"
            );
        }

        // 2. Battery feasibility
        let projection = self.battery.project(state.soc, decision.safe_battery_kw);

        // 3. Residual grid balance
        let renewable_kw = profile.renewable_at(t);
        let load_kw = profile.load_at(t);
        let grid_kw = self
            .grid
            .balance_kw(load_kw, renewable_kw, projection.power_kw);

        // 4. Costs and reward
        let tariff = Tariff {
            import_per_kwh: profile.price_import_at(t),
            export_per_kwh: profile.price_export_at(t),
        };
        let flows = BusFlows {
            renewable_kw,
            load_kw,
            battery_kw: projection.power_kw,
            grid_kw,
        };
        let outcome = settle(
            &flows,
            &tariff,
            projection.clip_energy_kwh,
            &self.params.battery,
            &self.params.reward,
            dt,
        );

        // 5. Thermal proxy
        let temperature_c = next_temperature_c(state.temperature_c, projection.power_kw);

        let next = EnvironmentState {
            t: t + 1,
            soc: projection.soc,
            temperature_c,
        };
        let done = next.t == self.params.env.horizon;
        let obs = observation::assemble(&next, profile);

        let result = StepResult {
            observation: obs,
            reward: outcome.reward,
            costs: outcome.costs,
            done,
            diagnostics: StepDiagnostics {
                timestep: t,
                renewable_kw,
                load_kw,
                price_import_per_kwh: tariff.import_per_kwh,
                price_export_per_kwh: tariff.export_per_kwh,
                unmet_energy_kwh: outcome.unmet_energy_kwh,
                curtailed_energy_kwh: outcome.curtailed_energy_kwh,
                clip_energy_kwh: projection.clip_energy_kwh,
                realized_battery_kw: projection.power_kw,
                realized_grid_kw: grid_kw,
                soc: next.soc,
                temperature_c,
                safety_decision: decision,
            },
        };
        tracing::trace!(step = %result, "step");

        self.state = Some(next);
        Ok(result)
    }

    /// State and profile of a running episode, or the reason there is none.
    fn current(&self) -> Result<(EnvironmentState, &EpisodeProfile), EnvError> {
        match (self.state, &self.profile) {
            (Some(state), Some(profile)) => {
                if state.t >= self.params.env.horizon {
                    Err(EnvError::Terminal { t: state.t })
                } else {
                    Ok((state, profile))
                }
            }
            _ => Err(EnvError::NotReset),
        }
    }

    /// Current episode state, `None` before the first reset.
    pub fn state(&self) -> Option<&EnvironmentState> {
        self.state.as_ref()
    }

    /// Profile of the current episode, `None` before the first reset.
    pub fn profile(&self) -> Option<&EpisodeProfile> {
        self.profile.as_ref()
    }

    /// Whether the current episode has reached the horizon.
    pub fn is_done(&self) -> bool {
        self.state
            .is_some_and(|s| s.t >= self.params.env.horizon)
    }

    pub fn params(&self) -> &MicrogridParams {
        &self.params
    }

    /// The supervisor applied inside `step`, usable standalone.
    pub fn supervisor(&self) -> &SafetySupervisor {
        &self.supervisor
    }

    pub fn source(&self) -> &P {
        &self.source
    }
}
