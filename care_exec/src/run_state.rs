//! # Run State
//!
//! State carried by the scheduler between passes: whether the greenhouse is still executing, why
//! it stopped, which task failed, and the rotation state machine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The task whose fail-safe deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailedTask {
    Rotation,
    Pump,
    Axis,
}

/// Direction the bed is currently being rotated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Why the run stopped executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopCause {
    /// The shut down button was pressed
    UserShutdown,

    /// The emergency stop was asserted
    EmergencyStop,

    /// A task timed out
    TaskFailed(FailedTask),
}

/// Error returned by a run which ended because a task failed.
#[derive(Debug, Error, PartialEq)]
pub enum RunError {
    #[error("Run ended with a {0} failure")]
    TaskFailed(FailedTask),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of a greenhouse run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    /// False once the scheduler must stop dispatching.
    pub executing: bool,

    /// The task that failed, if any.
    pub failed_task: Option<FailedTask>,

    /// Turns made since the rotation direction last changed.
    pub rotation_count: u32,

    pub rotation_direction: RotationDirection,

    /// Set when `executing` is cleared.
    pub stop_cause: Option<StopCause>,

    /// Water cycles completed, including the return of the scan axis.
    pub water_cycles: u32,

    /// Rotations completed.
    pub rotations: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for FailedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailedTask::Rotation => "rotation",
            FailedTask::Pump => "water pump",
            FailedTask::Axis => "2D axis",
        };
        write!(f, "{}", name)
    }
}

impl RotationDirection {
    /// Sign applied to the rotation velocity.
    pub fn sign(self) -> f64 {
        match self {
            RotationDirection::Clockwise => 1.0,
            RotationDirection::CounterClockwise => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            RotationDirection::Clockwise => RotationDirection::CounterClockwise,
            RotationDirection::CounterClockwise => RotationDirection::Clockwise,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            executing: true,
            failed_task: None,
            rotation_count: 0,
            rotation_direction: RotationDirection::Clockwise,
            stop_cause: None,
            water_cycles: 0,
            rotations: 0,
        }
    }
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task failure and stop executing.
    ///
    /// An earlier stop cause is kept, so that a failure found while shutting down does not hide
    /// why the run was ending.
    pub fn fail(&mut self, task: FailedTask) {
        self.failed_task = Some(task);
        self.halt(StopCause::TaskFailed(task));
    }

    /// Stop executing. The first cause recorded wins.
    pub fn halt(&mut self, cause: StopCause) {
        self.executing = false;
        if self.stop_cause.is_none() {
            self.stop_cause = Some(cause);
        }
    }

    /// Step the rotation state machine before a turn.
    ///
    /// Once `max_rotations` turns have been made in one direction the direction flips and the
    /// count restarts, otherwise the count is incremented.
    pub fn advance_rotation(&mut self, max_rotations: u32) {
        if self.rotation_count == max_rotations {
            self.rotation_direction = self.rotation_direction.flipped();
            self.rotation_count = 0;
        } else {
            self.rotation_count += 1;
        }
    }

    /// Outcome of the run, an error if a task failed.
    ///
    /// Stopping for the shut down button or the emergency stop is not an error.
    pub fn result(&self) -> Result<(), RunError> {
        match self.failed_task {
            Some(task) => Err(RunError::TaskFailed(task)),
            None => Ok(()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_state_machine() {
        use RotationDirection::*;

        let mut state = RunState::new();
        let mut seen = Vec::new();

        for _ in 0..6 {
            state.advance_rotation(2);
            seen.push((state.rotation_direction, state.rotation_count));
        }

        assert_eq!(
            seen,
            vec![
                (Clockwise, 1),
                (Clockwise, 2),
                (CounterClockwise, 0),
                (CounterClockwise, 1),
                (CounterClockwise, 2),
                (Clockwise, 0),
            ]
        );
    }

    #[test]
    fn test_fail_stops_execution() {
        let mut state = RunState::new();
        assert!(state.executing);

        state.fail(FailedTask::Pump);

        assert!(!state.executing);
        assert_eq!(state.failed_task, Some(FailedTask::Pump));
        assert_eq!(state.stop_cause, Some(StopCause::TaskFailed(FailedTask::Pump)));
    }

    #[test]
    fn test_first_stop_cause_kept() {
        let mut state = RunState::new();

        state.halt(StopCause::UserShutdown);
        state.fail(FailedTask::Axis);

        assert_eq!(state.failed_task, Some(FailedTask::Axis));
        assert_eq!(state.stop_cause, Some(StopCause::UserShutdown));
    }

    #[test]
    fn test_result() {
        let mut state = RunState::new();
        state.halt(StopCause::EmergencyStop);
        assert_eq!(state.result(), Ok(()));

        let mut state = RunState::new();
        state.fail(FailedTask::Rotation);
        assert_eq!(state.result(), Err(RunError::TaskFailed(FailedTask::Rotation)));
        assert_eq!(
            state.result().unwrap_err().to_string(),
            "Run ended with a rotation failure"
        );
    }
}
