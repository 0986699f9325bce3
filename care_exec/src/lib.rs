//! # Plant care library.
//!
//! The automation core of the greenhouse, shared between the executable and its tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cycles dispatched by the scheduler - water, axis reset and rotation
pub mod cycles;

/// Bounded motion - the fail-safe motion primitive
pub mod motion;

/// Calibration parameters
pub mod params;

/// Run reports and the reporting collaborator
pub mod report;

/// Run state and failure taxonomy
pub mod run_state;

/// Scheduler - the priority ordered control loop
pub mod scheduler;

/// Simulated equipment
pub mod sim;
