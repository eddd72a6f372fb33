//! Multi-episode policy evaluation and comparison.

/// Candidate-versus-baseline comparison reports.
pub mod comparison;
/// Episode rollouts and evaluation summaries.
pub mod runner;

pub use comparison::{ComparisonReport, MetricComparison, Objective, compare_summaries};
pub use runner::{EvaluationSummary, evaluate_policy, rollout};
