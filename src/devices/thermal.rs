//! Bounded thermal stress proxy for the battery pack.

/// Temperature the proxy starts from on every reset (°C).
pub const BASE_TEMPERATURE_C: f64 = 30.0;
/// Lower clip bound (°C).
pub const MIN_TEMPERATURE_C: f64 = 15.0;
/// Upper clip bound (°C).
pub const MAX_TEMPERATURE_C: f64 = 60.0;

/// Heating per kW of battery power per step.
const HEATING_PER_KW: f64 = 0.01;
/// Passive cooling per step.
const COOLING_PER_STEP: f64 = 0.02;

/// Advances the temperature proxy by one step.
///
/// Not a physical model: a stress signal that rises with |P_b|, decays
/// slowly at rest, and stays within `[15, 60]`.
pub fn next_temperature_c(temperature_c: f64, battery_kw: f64) -> f64 {
    (temperature_c + HEATING_PER_KW * battery_kw.abs() - COOLING_PER_STEP)
        .clamp(MIN_TEMPERATURE_C, MAX_TEMPERATURE_C)
}
