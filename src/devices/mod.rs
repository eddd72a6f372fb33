//! Physical component models for the microgrid bus.

/// Battery feasibility projection.
pub mod battery;
/// Thermal stress proxy.
pub mod thermal;
pub mod types;

pub use battery::{Battery, BatteryProjection};
pub use types::gaussian_noise;
