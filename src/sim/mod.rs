/// Observation-to-action policies.
pub mod controller;
/// Environment state machine.
pub mod engine;
/// Utility interconnection and residual balancing.
pub mod grid;
pub mod kpi;
pub mod observation;
pub mod power_balance;
/// Safety supervisor applied to every command.
pub mod safety;
pub mod types;
