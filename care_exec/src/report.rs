//! # Run Reports
//!
//! The scheduler hands the run state to a `Reporter` when the user asks for statistics and once
//! more when the run ends. `SessionReporter` is the reporter used by the executable, which logs
//! the report and saves it in the session directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use eqpt_if::Settings;
use log::info;
use serde::Serialize;
use thiserror::Error;
use util::{session::Session, time};

use crate::run_state::{FailedTask, RunState, StopCause};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Format used to display dates and times in reports.
const DATE_TIME_FORMAT: &str = "%m/%d/%Y %I:%M %P";

/// Name of the human readable end of run file in the session directory.
const END_FILE_NAME: &str = "run_end.txt";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Collaborator which presents the state of the run to the user.
pub trait Reporter {
    /// Present the statistics of the run so far.
    fn stats(&mut self, state: &RunState, settings: &Settings, runtime: Duration);

    /// Produce the report for a run which has ended.
    fn final_report(
        &mut self,
        state: &RunState,
        settings: &Settings,
        runtime: Duration,
    ) -> Result<(), ReportError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub plant_name: String,

    /// Units: milliseconds
    pub water_interval_ms: u64,

    /// Units: milliseconds
    pub rotation_interval_ms: u64,

    pub start: NaiveDateTime,

    /// Start of the run plus the run time.
    pub end: NaiveDateTime,

    /// Units: milliseconds
    pub runtime_ms: u64,

    pub water_cycles: u32,
    pub rotations: u32,

    pub outcome: Outcome,
}

/// Reporter which writes to the log and the session directory.
pub struct SessionReporter<'a> {
    session: &'a Session,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    NoFailure,
    EmergencyStop,
    RotationFailed,
    PumpFailed,
    AxisFailed,
}

/// Errors raised while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot write the end of run file {0:?}: {1}")]
    EndFileError(PathBuf, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RunReport {
    pub fn new(state: &RunState, settings: &Settings, runtime: Duration) -> Self {
        let end = time::std_to_chrono(runtime)
            .and_then(|d| settings.start.checked_add_signed(d))
            .unwrap_or(settings.start);

        Self {
            plant_name: settings.plant_name.clone(),
            water_interval_ms: settings.water_interval_ms,
            rotation_interval_ms: settings.rotation_interval_ms,
            start: settings.start,
            end,
            runtime_ms: time::duration_to_millis(runtime),
            water_cycles: state.water_cycles,
            rotations: state.rotations,
            outcome: Outcome::from(state),
        }
    }

    /// The report as display lines.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Plant name: {}", self.plant_name),
            format!("Water cycle interval: {} ms", self.water_interval_ms),
            format!("Rotation cycle interval: {} ms", self.rotation_interval_ms),
            format!("Start: {}", self.start.format(DATE_TIME_FORMAT)),
            format!("End: {}", self.end.format(DATE_TIME_FORMAT)),
            format!("Total run time: {} ms", self.runtime_ms),
            format!("Number of water cycles: {}", self.water_cycles),
            format!("Number of rotations: {}", self.rotations),
            format!("Outcome: {}", self.outcome),
        ]
    }
}

impl From<&RunState> for Outcome {
    fn from(state: &RunState) -> Self {
        match state.failed_task {
            Some(FailedTask::Rotation) => Outcome::RotationFailed,
            Some(FailedTask::Pump) => Outcome::PumpFailed,
            Some(FailedTask::Axis) => Outcome::AxisFailed,
            None => match state.stop_cause {
                Some(StopCause::EmergencyStop) => Outcome::EmergencyStop,
                _ => Outcome::NoFailure,
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::NoFailure => "NO FAILURE",
            Outcome::EmergencyStop => "EMERGENCY STOP",
            Outcome::RotationFailed => "ROTATION FAILED",
            Outcome::PumpFailed => "WATER PUMP FAILED",
            Outcome::AxisFailed => "2D AXIS FAILED",
        };
        write!(f, "{}", s)
    }
}

impl<'a> SessionReporter<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }
}

impl<'a> Reporter for SessionReporter<'a> {
    fn stats(&mut self, state: &RunState, settings: &Settings, runtime: Duration) {
        info!("---- STATISTICS ----");
        for line in RunReport::new(state, settings, runtime).lines() {
            info!("{}", line);
        }
    }

    fn final_report(
        &mut self,
        state: &RunState,
        settings: &Settings,
        runtime: Duration,
    ) -> Result<(), ReportError> {
        let report = RunReport::new(state, settings, runtime);

        info!("---- END OF RUN ----");
        let lines = report.lines();
        for line in lines.iter() {
            info!("{}", line);
        }

        let mut path = self.session.session_root.clone();
        path.push(END_FILE_NAME);
        std::fs::write(&path, lines.join("\n") + "\n")
            .map_err(|e| ReportError::EndFileError(path, e))?;

        self.session.save("report.json", report);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn settings() -> Settings {
        Settings {
            plant_name: String::from("Basil"),
            water_interval_ms: 60_000,
            rotation_interval_ms: 30_000,
            start: NaiveDate::from_ymd_opt(2024, 12, 31)
                .unwrap()
                .and_hms_opt(23, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_end_rolls_over_the_year() {
        let mut state = RunState::new();
        state.water_cycles = 3;
        state.rotations = 5;

        let report = RunReport::new(&state, &settings(), Duration::from_secs(45 * 60));

        assert_eq!(
            report.end,
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 15, 0)
                .unwrap()
        );
        assert_eq!(report.runtime_ms, 2_700_000);
        assert_eq!(report.water_cycles, 3);
        assert_eq!(report.rotations, 5);
        assert_eq!(report.outcome, Outcome::NoFailure);

        let lines = report.lines();
        assert!(lines.contains(&String::from("End: 01/01/2025 12:15 am")));
        assert!(lines.contains(&String::from("Outcome: NO FAILURE")));
    }

    #[test]
    fn test_outcomes() {
        let mut state = RunState::new();
        state.halt(StopCause::UserShutdown);
        assert_eq!(Outcome::from(&state).to_string(), "NO FAILURE");

        let mut state = RunState::new();
        state.halt(StopCause::EmergencyStop);
        assert_eq!(Outcome::from(&state).to_string(), "EMERGENCY STOP");

        let cases = [
            (FailedTask::Rotation, "ROTATION FAILED"),
            (FailedTask::Pump, "WATER PUMP FAILED"),
            (FailedTask::Axis, "2D AXIS FAILED"),
        ];
        for (task, expected) in cases.iter() {
            let mut state = RunState::new();
            state.fail(*task);
            assert_eq!(Outcome::from(&state).to_string(), *expected);
        }

        // A failure found after an emergency stop is still reported
        let mut state = RunState::new();
        state.halt(StopCause::EmergencyStop);
        state.fail(FailedTask::Axis);
        assert_eq!(Outcome::from(&state), Outcome::AxisFailed);
    }
}
