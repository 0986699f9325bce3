//! # Simulated Equipment Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::{ActId, ButtonId};
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the simulated equipment.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {

    // ---- CLOCK ----

    /// Simulated time that passes on every read of an input.
    ///
    /// Units: milliseconds
    pub tick_ms: u64,

    // ---- ACTUATORS ----

    /// Encoder rate of the pump per unit of commanded velocity.
    ///
    /// Units: degrees/millisecond
    pub pump_rate: f64,

    /// Encoder rate of each primary scan axis motor per unit of commanded velocity.
    ///
    /// Units: degrees/millisecond
    pub x_axis_rate: f64,

    /// Units: degrees/millisecond
    pub y_axis_rate: f64,

    /// Units: degrees/millisecond
    pub rotation_rate: f64,

    /// Actuators whose encoders never advance, whatever they are commanded to do.
    #[serde(default)]
    pub jammed: Vec<ActId>,

    // ---- SENSORS ----

    /// Whether the water tank reads as filled.
    pub tank_filled: bool,

    /// Time at which the emergency stop is asserted. It stays asserted afterwards.
    ///
    /// Units: milliseconds
    #[serde(default)]
    pub estop_at_ms: Option<u64>,

    /// Scripted button presses.
    #[serde(default)]
    pub presses: Vec<ButtonPress>,

    /// Time after which the shut down button is pressed, ending the run.
    ///
    /// Units: milliseconds
    #[serde(default)]
    pub run_duration_ms: Option<u64>,
}

/// A scripted button press.
///
/// The press goes down on the first read of the button at or after `at_ms`, so that a press is
/// never missed while a cycle is running, and is released `hold_ms` later.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ButtonPress {
    pub button: ButtonId,

    /// Units: milliseconds
    pub at_ms: u64,

    /// Units: milliseconds
    pub hold_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            tick_ms: 1,
            pump_rate: 1.0,
            x_axis_rate: 0.04,
            y_axis_rate: 0.1,
            rotation_rate: 0.01,
            jammed: Vec::new(),
            tank_filled: true,
            estop_at_ms: None,
            presses: Vec::new(),
            run_duration_ms: None,
        }
    }
}

impl SimParams {
    /// Encoder rate of the given actuator per unit of commanded velocity.
    pub fn rate(&self, act: ActId) -> f64 {
        match act {
            ActId::Pump => self.pump_rate,
            ActId::AxisX1 | ActId::AxisX2 => self.x_axis_rate,
            ActId::AxisY => self.y_axis_rate,
            ActId::Rotation => self.rotation_rate,
        }
    }
}
