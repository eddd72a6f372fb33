//! Post-hoc episode metrics computed from step results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Aggregate metrics for one completed episode.
///
/// Computed post-hoc from `&[StepResult]` so that reported totals are always
/// consistent with the recorded step data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeMetrics {
    pub episode: usize,
    pub total_reward: f64,
    pub grid_cost: f64,
    pub degradation_cost: f64,
    pub penalty_cost: f64,
    pub unmet_load_kwh: f64,
    pub curtailed_kwh: f64,
    pub import_kwh: f64,
    pub export_kwh: f64,
    /// Sum of |battery power| * dt (kWh).
    pub battery_throughput_kwh: f64,
    /// Steps where the safety supervisor changed the command.
    pub safety_overrides: usize,
    pub steps: usize,
}

impl EpisodeMetrics {
    /// Computes all metrics from the complete step record slice.
    ///
    /// # Arguments
    ///
    /// * `episode` - Episode index within an evaluation
    /// * `results` - Step results in order
    /// * `dt_hours` - Timestep duration in hours
    pub fn from_results(episode: usize, results: &[StepResult], dt_hours: f64) -> Self {
        let mut m = Self {
            episode,
            steps: results.len(),
            ..Self::default()
        };

        for r in results {
            let d = &r.diagnostics;
            m.total_reward += r.reward;
            m.grid_cost += r.costs.grid_cost;
            m.degradation_cost += r.costs.degradation_cost;
            m.penalty_cost += r.costs.penalty_cost;
            m.unmet_load_kwh += d.unmet_energy_kwh;
            m.curtailed_kwh += d.curtailed_energy_kwh;
            m.import_kwh += d.realized_grid_kw.max(0.0) * dt_hours;
            m.export_kwh += (-d.realized_grid_kw).max(0.0) * dt_hours;
            m.battery_throughput_kwh += d.realized_battery_kw.abs() * dt_hours;
            if d.safety_decision.overridden {
                m.safety_overrides += 1;
            }
        }
        m
    }
}

impl fmt::Display for EpisodeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Episode {} ({} steps) ---", self.episode, self.steps)?;
        writeln!(f, "Total reward:          {:.3}", self.total_reward)?;
        writeln!(f, "Grid cost:             {:.3}", self.grid_cost)?;
        writeln!(f, "Degradation cost:      {:.3}", self.degradation_cost)?;
        writeln!(f, "Penalty cost:          {:.3}", self.penalty_cost)?;
        writeln!(f, "Unmet load:            {:.2} kWh", self.unmet_load_kwh)?;
        writeln!(f, "Curtailed:             {:.2} kWh", self.curtailed_kwh)?;
        writeln!(
            f,
            "Grid import/export:    {:.2} / {:.2} kWh",
            self.import_kwh, self.export_kwh
        )?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh",
            self.battery_throughput_kwh
        )?;
        write!(f, "Safety overrides:      {}", self.safety_overrides)
    }
}
