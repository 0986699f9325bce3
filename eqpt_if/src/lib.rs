//! # Equipment interface crate.
//!
//! Provides the interfaces between the plant care automation core and its collaborators: the
//! actuator, sensor and clock backends, and the user settings record.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Identifiers and traits for actuators, sensors and timers
pub mod eqpt;

/// User settings record
pub mod settings;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use eqpt::*;
pub use settings::Settings;
