use std::fmt;

use serde::Serialize;

use super::runner::EvaluationSummary;

/// Baselines smaller than this in magnitude yield no percentage.
const PCT_EPS: f64 = 1e-12;

/// Which direction counts as better for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Higher,
    Lower,
    /// Reported but never scored.
    Neutral,
}

/// One metric compared between two policies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: &'static str,
    pub objective: Objective,
    pub baseline: f64,
    pub candidate: f64,
    /// `candidate - baseline`.
    pub delta: f64,
    pub improved: Option<bool>,
    pub improvement_pct: Option<f64>,
}

/// Side-by-side comparison of two evaluation summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub baseline_policy: String,
    pub candidate_policy: String,
    pub episodes: usize,
    pub metrics: Vec<MetricComparison>,
    pub improved_metric_count: usize,
    pub compared_metric_count: usize,
}

fn improvement(baseline: f64, candidate: f64, objective: Objective) -> (Option<bool>, Option<f64>) {
    let (improved, gain) = match objective {
        Objective::Neutral => return (None, None),
        Objective::Higher => (candidate > baseline, candidate - baseline),
        Objective::Lower => (candidate < baseline, baseline - candidate),
    };
    if baseline.abs() < PCT_EPS {
        (Some(improved), None)
    } else {
        (Some(improved), Some(gain / baseline.abs() * 100.0))
    }
}

/// Compares a candidate policy against a baseline metric by metric.
pub fn compare_summaries(
    baseline: &EvaluationSummary,
    candidate: &EvaluationSummary,
) -> ComparisonReport {
    let specs: [(&'static str, Objective, fn(&EvaluationSummary) -> f64); 10] = [
        ("avg_reward", Objective::Higher, |s| s.avg_reward),
        ("avg_grid_cost", Objective::Lower, |s| s.avg_grid_cost),
        ("avg_degradation_cost", Objective::Lower, |s| {
            s.avg_degradation_cost
        }),
        ("avg_penalty_cost", Objective::Lower, |s| s.avg_penalty_cost),
        ("avg_unmet_load_kwh", Objective::Lower, |s| {
            s.avg_unmet_load_kwh
        }),
        ("avg_curtailed_kwh", Objective::Lower, |s| s.avg_curtailed_kwh),
        ("avg_import_kwh", Objective::Lower, |s| s.avg_import_kwh),
        ("avg_export_kwh", Objective::Neutral, |s| s.avg_export_kwh),
        ("avg_battery_throughput_kwh", Objective::Lower, |s| {
            s.avg_battery_throughput_kwh
        }),
        ("avg_safety_overrides", Objective::Lower, |s| {
            s.avg_safety_overrides
        }),
    ];

    let metrics: Vec<MetricComparison> = specs
        .iter()
        .map(|&(metric, objective, get)| {
            let b = get(baseline);
            let c = get(candidate);
            let (improved, improvement_pct) = improvement(b, c, objective);
            MetricComparison {
                metric,
                objective,
                baseline: b,
                candidate: c,
                delta: c - b,
                improved,
                improvement_pct,
            }
        })
        .collect();

    let compared_metric_count = metrics.iter().filter(|m| m.improved.is_some()).count();
    let improved_metric_count = metrics.iter().filter(|m| m.improved == Some(true)).count();

    ComparisonReport {
        baseline_policy: baseline.policy.clone(),
        candidate_policy: candidate.policy.clone(),
        episodes: baseline.episodes.min(candidate.episodes),
        metrics,
        improved_metric_count,
        compared_metric_count,
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Comparison: {} vs {} ({} episodes) ---",
            self.candidate_policy, self.baseline_policy, self.episodes
        )?;
        for m in &self.metrics {
            let mark = match m.improved {
                Some(true) => "+",
                Some(false) => "-",
                None => " ",
            };
            let pct = m
                .improvement_pct
                .map(|p| format!("{p:+.1}%"))
                .unwrap_or_else(|| "n/a".into());
            writeln!(
                f,
                "{mark} {:<28} {:>12.3} -> {:>12.3} ({pct})",
                m.metric, m.baseline, m.candidate
            )?;
        }
        write!(
            f,
            "Improved {}/{} scored metrics",
            self.improved_metric_count, self.compared_metric_count
        )
    }
}
