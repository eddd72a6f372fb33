//! Grid-tied microgrid simulation with a hard battery safety envelope.

pub mod config;
pub mod devices;
pub mod error;
/// Policy rollouts, evaluation summaries, and comparisons.
pub mod evaluation;
pub mod io;
/// Episode profiles: synthetic, CSV, validation, and splitting.
pub mod profile;
/// Environment state machine, safety supervisor, and accounting.
pub mod sim;
