//! # Equipment Interface
//!
//! This module defines the narrow interfaces through which the automation core reads sensors,
//! commands actuators and measures time. The core never touches hardware registers directly, so
//! any backend implementing these traits (real hardware or a simulation) can drive it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuators available to the greenhouse.
///
/// These are logical identities. Which physical motor port each one is wired to is a property
/// of the equipment backend.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ActId {
    /// Peristaltic water pump, no encoder feedback
    Pump,
    /// First motor of the primary (X) scan axis
    AxisX1,
    /// Second motor of the primary (X) scan axis, always commanded with `AxisX1`
    AxisX2,
    /// Secondary (Y) scan axis
    AxisY,
    /// Bed rotation
    Rotation,
}

/// User buttons on the controller.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ButtonId {
    /// Show the run statistics
    Stats,
    /// Shut the greenhouse down cleanly
    ShutDown,
}

/// Elapsed-time counters provided by the clock.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum TimerId {
    /// Time since the start of the run. Never reset by the core, used as the time base for
    /// fail-safe deadlines.
    Run,
    /// Time since the last successful water cycle
    Water,
    /// Time since the last successful rotation
    Rotation,
}

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

impl ActId {
    /// Every actuator, in the order they are stopped on shutdown.
    pub const ALL: [ActId; 5] = [
        ActId::Pump,
        ActId::Rotation,
        ActId::AxisY,
        ActId::AxisX1,
        ActId::AxisX2,
    ];
}

/// Both motors driving the primary scan axis.
pub const X_AXIS: [ActId; 2] = [ActId::AxisX1, ActId::AxisX2];

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Velocity-commanded actuators with encoder feedback.
pub trait Actuators {
    /// Command an actuator to run at the given signed velocity. Zero stops it.
    fn command(&mut self, act: ActId, velocity: f64);

    /// Read the actuator's encoder, in degrees since the last reset.
    fn read_encoder(&mut self, act: ActId) -> i64;

    /// Zero the actuator's encoder.
    fn reset_encoder(&mut self, act: ActId);
}

/// Digital inputs.
pub trait Sensors {
    /// True if the water tank contains water.
    fn fill_level_ok(&mut self) -> bool;

    /// True while the emergency stop is asserted.
    fn emergency_stop(&mut self) -> bool;

    /// True while the given button is held down.
    fn button(&mut self, id: ButtonId) -> bool;
}

/// Elapsed-time counters.
pub trait Clock {
    /// Time elapsed since the given timer was last reset.
    fn elapsed(&mut self, timer: TimerId) -> Duration;

    /// Restart the given timer from zero.
    fn reset_timer(&mut self, timer: TimerId);
}

/// Full equipment interface required by the automation core.
pub trait Eqpt: Actuators + Sensors + Clock {}

impl<T: Actuators + Sensors + Clock> Eqpt for T {}
