//! Observation assembly from profile values and internal state.

use super::types::{EnvironmentState, Observation};
use crate::profile::EpisodeProfile;

/// Builds the observation for the state's current index.
///
/// Lookahead values past the last profile index hold the last available
/// value. The terminal observation (t == horizon) holds the last value for
/// both current and lookahead slots.
pub fn assemble(state: &EnvironmentState, profile: &EpisodeProfile) -> Observation {
    let t = state.t;
    Observation([
        profile.renewable_at(t),
        profile.renewable_at(t + 1),
        profile.load_at(t),
        profile.load_at(t + 1),
        state.soc,
        state.temperature_c,
        profile.price_import_at(t),
        profile.price_import_at(t + 1),
    ])
}
