use std::fmt;

use serde::Serialize;

use crate::error::{EnvError, EvaluationError};
use crate::profile::ProfileSource;
use crate::sim::controller::Policy;
use crate::sim::engine::Environment;
use crate::sim::kpi::EpisodeMetrics;
use crate::sim::types::StepResult;

/// Runs one complete episode and returns every step result in order.
///
/// # Arguments
///
/// * `env` - Environment to drive; reset at the start
/// * `policy` - Chooses an action from each observation
/// * `seed` - Profile seed for the reset
///
/// # Errors
///
/// Propagates any `EnvError` from `reset` or `step`.
pub fn rollout<S, P>(
    env: &mut Environment<S>,
    policy: &mut P,
    seed: u64,
) -> Result<Vec<StepResult>, EnvError>
where
    S: ProfileSource,
    P: Policy + ?Sized,
{
    let mut observation = env.reset(Some(seed), None)?;
    let mut results = Vec::with_capacity(env.params().env.horizon);
    loop {
        let action = policy.choose_action(&observation);
        let result = env.step_action(&action)?;
        observation = result.observation;
        let done = result.done;
        results.push(result);
        if done {
            break;
        }
    }
    Ok(results)
}

/// Averages over several episodes plus the per-episode details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub policy: String,
    pub episodes: usize,
    pub avg_reward: f64,
    pub avg_grid_cost: f64,
    pub avg_degradation_cost: f64,
    pub avg_penalty_cost: f64,
    pub avg_unmet_load_kwh: f64,
    pub avg_curtailed_kwh: f64,
    pub avg_import_kwh: f64,
    pub avg_export_kwh: f64,
    pub avg_battery_throughput_kwh: f64,
    pub avg_safety_overrides: f64,
    pub details: Vec<EpisodeMetrics>,
}

impl EvaluationSummary {
    /// Averages the given episode metrics. `details` must be non-empty.
    fn from_details(policy: &str, details: Vec<EpisodeMetrics>) -> Self {
        let n = details.len().max(1) as f64;
        let avg = |f: fn(&EpisodeMetrics) -> f64| details.iter().map(f).sum::<f64>() / n;
        Self {
            policy: policy.to_string(),
            episodes: details.len(),
            avg_reward: avg(|m| m.total_reward),
            avg_grid_cost: avg(|m| m.grid_cost),
            avg_degradation_cost: avg(|m| m.degradation_cost),
            avg_penalty_cost: avg(|m| m.penalty_cost),
            avg_unmet_load_kwh: avg(|m| m.unmet_load_kwh),
            avg_curtailed_kwh: avg(|m| m.curtailed_kwh),
            avg_import_kwh: avg(|m| m.import_kwh),
            avg_export_kwh: avg(|m| m.export_kwh),
            avg_battery_throughput_kwh: avg(|m| m.battery_throughput_kwh),
            avg_safety_overrides: avg(|m| m.safety_overrides as f64),
            details,
        }
    }
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Evaluation: {} ({} episodes) ---",
            self.policy, self.episodes
        )?;
        writeln!(f, "Avg reward:            {:.3}", self.avg_reward)?;
        writeln!(f, "Avg grid cost:         {:.3}", self.avg_grid_cost)?;
        writeln!(f, "Avg degradation cost:  {:.3}", self.avg_degradation_cost)?;
        writeln!(f, "Avg penalty cost:      {:.3}", self.avg_penalty_cost)?;
        writeln!(f, "Avg unmet load:        {:.2} kWh", self.avg_unmet_load_kwh)?;
        writeln!(f, "Avg curtailed:         {:.2} kWh", self.avg_curtailed_kwh)?;
        writeln!(
            f,
            "Avg import/export:     {:.2} / {:.2} kWh",
            self.avg_import_kwh, self.avg_export_kwh
        )?;
        writeln!(
            f,
            "Avg battery throughput: {:.2} kWh",
            self.avg_battery_throughput_kwh
        )?;
        write!(f, "Avg safety overrides:  {:.2}", self.avg_safety_overrides)
    }
}

/// Evaluates a policy over consecutive seeds `seed_start..seed_start + episodes`.
///
/// # Errors
///
/// Returns `EvaluationError::NoEpisodes` when `episodes == 0`, otherwise
/// propagates environment errors.
pub fn evaluate_policy<S, P>(
    env: &mut Environment<S>,
    policy: &mut P,
    policy_name: &str,
    episodes: usize,
    seed_start: u64,
) -> Result<EvaluationSummary, EvaluationError>
where
    S: ProfileSource,
    P: Policy + ?Sized,
{
    if episodes == 0 {
        return Err(EvaluationError::NoEpisodes);
    }

    let dt = env.params().env.time_step_hours;
    let mut details = Vec::with_capacity(episodes);
    for (episode, seed) in (seed_start..).take(episodes).enumerate() {
        let results = rollout(env, policy, seed)?;
        let metrics = EpisodeMetrics::from_results(episode, &results, dt);
        tracing::debug!(
            policy = policy_name,
            episode,
            seed,
            reward = metrics.total_reward,
            "episode complete"
        );
        details.push(metrics);
    }

    let summary = EvaluationSummary::from_details(policy_name, details);
    tracing::info!(
        policy = policy_name,
        episodes,
        avg_reward = summary.avg_reward,
        "evaluation complete"
    );
    Ok(summary)
}
