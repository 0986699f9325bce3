//! # Plant Care Cycles
//!
//! The tasks dispatched by the scheduler. Each is built from one or more bounded motions and
//! classifies its own failures, returning a `CycleResult` for the scheduler to act on.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod axis_reset;
mod rotation;
mod water;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::fmt;

use crate::run_state::FailedTask;

pub use axis_reset::axis_reset;
pub use rotation::rotation_cycle;
pub use water::water_cycle;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Outcome of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleResult {
    /// The cycle ran to completion.
    Completed,

    /// A fail-safe deadline elapsed during the given task.
    Failed(FailedTask),

    /// The cycle was abandoned because the emergency stop was asserted.
    Stopped,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleResult {
    pub fn is_completed(&self) -> bool {
        *self == CycleResult::Completed
    }
}

impl fmt::Display for CycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleResult::Completed => write!(f, "completed"),
            CycleResult::Failed(task) => write!(f, "{} failed", task),
            CycleResult::Stopped => write!(f, "stopped"),
        }
    }
}
