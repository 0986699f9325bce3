//! # Scheduler
//!
//! Cooperative control loop of the greenhouse. Each pass polls the emergency stop, the user
//! buttons and the interval timers, and dispatches at most one action in fixed priority order:
//!
//! 1. Emergency stop
//! 2. Shut down button
//! 3. Statistics button
//! 4. Water cycle, followed by the scan axis reset
//! 5. Rotation cycle
//!
//! A pass with nothing to do returns immediately, so `run` busy-polls between actions.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::{ActId, ButtonId, Eqpt, Settings, TimerId};
use log::{error, info, warn};
use serde::Serialize;
use util::{archive::Archiver, time};

use crate::{
    cycles::{axis_reset, rotation_cycle, water_cycle, CycleResult},
    params::Params,
    report::Reporter,
    run_state::{RunState, StopCause},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The greenhouse scheduler.
pub struct Scheduler<E, R> {
    eqpt: E,
    reporter: R,

    params: Params,
    settings: Settings,

    state: RunState,

    /// Set when a cycle abandoned its work because of the emergency stop, so that the next pass
    /// halts even if the input has since been released.
    estop_latched: bool,

    arch: Archiver,
}

/// Row of the dispatch archive, one per non-idle pass.
#[derive(Debug, Serialize)]
struct DispatchRecord {
    /// Units: milliseconds
    time_ms: u64,

    action: &'static str,

    result: String,

    water_cycles: u32,
    rotations: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The action taken by a single pass of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Idle,
    EmergencyStop,
    ShutDown,
    Stats,
    Water(CycleResult),
    Rotation(CycleResult),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<E: Eqpt, R: Reporter> Scheduler<E, R> {
    pub fn new(eqpt: E, reporter: R, params: Params, settings: Settings) -> Self {
        Self {
            eqpt,
            reporter,
            params,
            settings,
            state: RunState::new(),
            estop_latched: false,
            arch: Archiver::default(),
        }
    }

    /// Archive every dispatched action with the given archiver.
    pub fn with_archive(mut self, arch: Archiver) -> Self {
        if arch.is_enabled() {
            info!("Archiving dispatched actions");
        } else {
            warn!("Archive disabled, dispatched actions will not be recorded");
        }
        self.arch = arch;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn eqpt(&self) -> &E {
        &self.eqpt
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run passes until the greenhouse stops executing, then shut down.
    ///
    /// The interval timers are restarted first, so the first cycles happen one interval after
    /// the run begins.
    pub fn run(&mut self) -> RunState {
        self.eqpt.reset_timer(TimerId::Water);
        self.eqpt.reset_timer(TimerId::Rotation);

        info!("Greenhouse running for \"{}\"", self.settings.plant_name);

        while self.state.executing {
            self.step();
        }

        self.shutdown();

        self.state.clone()
    }

    /// Perform a single pass of the scheduler.
    pub fn step(&mut self) -> Dispatch {
        let dispatch = if self.estop_latched || self.eqpt.emergency_stop() {
            warn!("Emergency stop, halting");
            self.state.halt(StopCause::EmergencyStop);
            Dispatch::EmergencyStop
        } else if self.eqpt.button(ButtonId::ShutDown) {
            self.debounce(ButtonId::ShutDown);
            info!("Shut down requested");
            self.state.halt(StopCause::UserShutdown);
            Dispatch::ShutDown
        } else if self.eqpt.button(ButtonId::Stats) {
            self.debounce(ButtonId::Stats);
            let runtime = self.eqpt.elapsed(TimerId::Run);
            self.reporter.stats(&self.state, &self.settings, runtime);
            Dispatch::Stats
        } else if self.eqpt.elapsed(TimerId::Water) >= self.settings.water_interval() {
            Dispatch::Water(self.water())
        } else if self.eqpt.elapsed(TimerId::Rotation) >= self.settings.rotation_interval() {
            Dispatch::Rotation(self.rotate())
        } else {
            Dispatch::Idle
        };

        if dispatch != Dispatch::Idle {
            self.archive(dispatch);
        }

        dispatch
    }

    /// Bring the greenhouse to a safe state and produce the final report.
    ///
    /// Runs on every path out of the main loop. The scan axis is always returned home, and a
    /// failure to do so is recorded unless an earlier failure already has been.
    pub fn shutdown(&mut self) {
        info!("Shutting down");

        for act in ActId::ALL.iter() {
            self.eqpt.command(*act, 0.0);
        }

        if let CycleResult::Failed(task) = axis_reset(&mut self.eqpt, &self.params) {
            if self.state.failed_task.is_none() {
                self.state.fail(task);
            } else {
                warn!("Scan axis reset failed after an earlier failure");
            }
        }

        let runtime = self.eqpt.elapsed(TimerId::Run);
        if let Err(e) = self
            .reporter
            .final_report(&self.state, &self.settings, runtime)
        {
            error!("Could not produce the final report: {}", e);
        }
    }

    /// Water the bed and return the scan axis home.
    fn water(&mut self) -> CycleResult {
        let mut result = water_cycle(&mut self.eqpt, &self.params);

        if result.is_completed() {
            result = axis_reset(&mut self.eqpt, &self.params);
        }

        match result {
            CycleResult::Completed => {
                self.state.water_cycles += 1;
                self.eqpt.reset_timer(TimerId::Water);
            }
            CycleResult::Failed(task) => {
                error!("Water cycle failed ({}), halting", task);
                self.state.fail(task);
            }
            CycleResult::Stopped => self.estop_latched = true,
        }

        result
    }

    fn rotate(&mut self) -> CycleResult {
        let result = rotation_cycle(&mut self.eqpt, &self.params, &mut self.state);

        match result {
            CycleResult::Completed => self.eqpt.reset_timer(TimerId::Rotation),
            CycleResult::Failed(task) => {
                error!("Rotation cycle failed ({}), halting", task);
                self.state.fail(task);
            }
            CycleResult::Stopped => self.estop_latched = true,
        }

        result
    }

    /// Wait for the button to be released, then let it settle.
    fn debounce(&mut self, button: ButtonId) {
        while self.eqpt.button(button) {}

        let start = self.eqpt.elapsed(TimerId::Run);
        while self.eqpt.elapsed(TimerId::Run).saturating_sub(start) < self.params.debounce() {}
    }

    fn archive(&mut self, dispatch: Dispatch) {
        let (action, result) = match dispatch {
            Dispatch::Idle => ("idle", String::new()),
            Dispatch::EmergencyStop => ("emergency_stop", String::new()),
            Dispatch::ShutDown => ("shut_down", String::new()),
            Dispatch::Stats => ("stats", String::new()),
            Dispatch::Water(r) => ("water", r.to_string()),
            Dispatch::Rotation(r) => ("rotation", r.to_string()),
        };

        let record = DispatchRecord {
            time_ms: time::duration_to_millis(self.eqpt.elapsed(TimerId::Run)),
            action,
            result,
            water_cycles: self.state.water_cycles,
            rotations: self.state.rotations,
        };

        if let Err(e) = self.arch.serialise(record) {
            warn!("Could not archive the dispatch record: {}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::ReportError,
        run_state::FailedTask,
        sim::{SimEqpt, SimParams},
    };
    use chrono::NaiveDate;
    use eqpt_if::Clock;
    use std::time::Duration;

    /// Reporter which remembers what it was given.
    #[derive(Default)]
    struct RecordingReporter {
        stats: Vec<RunState>,
        finals: Vec<RunState>,
    }

    impl Reporter for RecordingReporter {
        fn stats(&mut self, state: &RunState, _: &Settings, _: Duration) {
            self.stats.push(state.clone());
        }

        fn final_report(
            &mut self,
            state: &RunState,
            _: &Settings,
            _: Duration,
        ) -> Result<(), ReportError> {
            self.finals.push(state.clone());
            Ok(())
        }
    }

    fn settings(water_interval_ms: u64, rotation_interval_ms: u64) -> Settings {
        Settings {
            plant_name: String::from("Fern"),
            water_interval_ms,
            rotation_interval_ms,
            start: NaiveDate::from_ymd_opt(2024, 11, 18)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        }
    }

    fn scheduler(
        sim: SimEqpt,
        settings: Settings,
    ) -> Scheduler<SimEqpt, RecordingReporter> {
        Scheduler::new(sim, RecordingReporter::default(), Params::default(), settings)
    }

    #[test]
    fn test_idle_pass() {
        let mut sched = scheduler(SimEqpt::new(SimParams::default()), settings(60_000, 60_000));

        assert_eq!(sched.step(), Dispatch::Idle);
        assert!(sched.state().executing);
        assert!(sched.eqpt().commands().is_empty());
    }

    #[test]
    fn test_priority_order() {
        // Everything is due at once: both timers elapsed, both buttons pressed, emergency stop set
        let sim = SimEqpt::new(SimParams::default())
            .with_press(ButtonId::ShutDown, 0, 10)
            .with_press(ButtonId::Stats, 0, 10)
            .with_estop_at(0);
        let mut sched = scheduler(sim, settings(0, 0));

        assert_eq!(sched.step(), Dispatch::EmergencyStop);
        assert_eq!(sched.state().stop_cause, Some(StopCause::EmergencyStop));

        // Without the emergency stop the shut down button wins
        let sim = SimEqpt::new(SimParams::default())
            .with_press(ButtonId::ShutDown, 0, 10)
            .with_press(ButtonId::Stats, 0, 10);
        let mut sched = scheduler(sim, settings(0, 0));
        assert_eq!(sched.step(), Dispatch::ShutDown);

        // Then the stats button, then the water cycle ahead of the rotation. The long press lets
        // the water interval elapse.
        let sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::Stats, 0, 200);
        let mut sched = scheduler(sim, settings(100, 0));
        assert_eq!(sched.step(), Dispatch::Stats);
        assert_eq!(sched.step(), Dispatch::Water(CycleResult::Completed));
        assert_eq!(sched.step(), Dispatch::Rotation(CycleResult::Completed));
    }

    #[test]
    fn test_shutdown_button() {
        let sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::ShutDown, 100, 30);
        let mut sched = scheduler(sim, settings(60_000, 60_000));

        let state = sched.run();

        assert!(!state.executing);
        assert_eq!(state.failed_task, None);
        assert_eq!(state.stop_cause, Some(StopCause::UserShutdown));

        // Released and settled before halting
        assert!(sched.eqpt().now() >= Duration::from_millis(100 + 30 + 50));

        // The scan axis is still returned home and the final report produced
        assert_eq!(sched.eqpt().moves(ActId::AxisX1), vec![-5.0]);
        assert_eq!(sched.reporter().finals, vec![state]);
    }

    #[test]
    fn test_stats_button() {
        let sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::Stats, 10, 20);
        let mut sched = scheduler(sim, settings(60_000, 60_000));

        let mut dispatched = Vec::new();
        for _ in 0..10 {
            dispatched.push(sched.step());
        }

        assert_eq!(
            dispatched.iter().filter(|d| **d == Dispatch::Stats).count(),
            1
        );
        assert_eq!(sched.reporter().stats.len(), 1);
        assert!(sched.state().executing);
    }

    #[test]
    fn test_water_success_resets_timer() {
        let mut sched = scheduler(SimEqpt::new(SimParams::default()), settings(1_000, 600_000));
        sched.eqpt.reset_timer(TimerId::Water);
        sched.eqpt.reset_timer(TimerId::Rotation);

        let mut dispatch = Dispatch::Idle;
        while dispatch == Dispatch::Idle {
            dispatch = sched.step();
        }

        assert_eq!(dispatch, Dispatch::Water(CycleResult::Completed));
        assert_eq!(sched.state().water_cycles, 1);

        // Sweep out and back home
        let x = Params::default().x_axis_speed;
        assert_eq!(sched.eqpt().moves(ActId::AxisX1), vec![x, -x]);

        // The timer restarted at the end of the cycle
        assert!(sched.eqpt.elapsed(TimerId::Water) < Duration::from_millis(10));
        assert_eq!(sched.step(), Dispatch::Idle);
    }

    #[test]
    fn test_rotation_failure_halts_and_parks_axis() {
        let sim = SimEqpt::new(SimParams::default()).jam(ActId::Rotation);
        let mut sched = scheduler(sim, settings(600_000, 1_000));

        let state = sched.run();

        assert!(!state.executing);
        assert_eq!(state.failed_task, Some(FailedTask::Rotation));
        assert_eq!(
            state.stop_cause,
            Some(StopCause::TaskFailed(FailedTask::Rotation))
        );
        assert_eq!(state.rotations, 0);

        // Rotation timer was never reset, the deadline ran out
        assert!(sched.eqpt().now() >= Duration::from_millis(1_000 + 20_000));

        // Shutdown still returned the scan axis home, then reported
        let x = Params::default().x_axis_speed;
        assert_eq!(sched.eqpt().moves(ActId::AxisX1), vec![-x]);
        for act in ActId::ALL.iter() {
            assert_eq!(sched.eqpt().velocity(*act), 0.0);
        }
        assert_eq!(sched.reporter().finals, vec![state]);
    }

    #[test]
    fn test_shutdown_axis_failure_recorded() {
        let sim = SimEqpt::new(SimParams::default())
            .jam(ActId::AxisX1)
            .with_press(ButtonId::ShutDown, 10, 10);
        let mut sched = scheduler(sim, settings(600_000, 600_000));

        let state = sched.run();

        assert_eq!(state.failed_task, Some(FailedTask::Axis));
        assert_eq!(state.stop_cause, Some(StopCause::UserShutdown));
    }

    #[test]
    fn test_emergency_stop_mid_sweep() {
        // The stop is asserted part way through the first secondary axis segment
        let sim = SimEqpt::new(SimParams::default()).with_estop_at(1_500);
        let mut sched = scheduler(sim, settings(1_000, 600_000));

        let state = sched.run();

        assert!(!state.executing);
        assert_eq!(state.failed_task, None);
        assert_eq!(state.stop_cause, Some(StopCause::EmergencyStop));
        assert_eq!(state.water_cycles, 0);

        // The segment in progress completed, no other started
        let y = Params::default().y_axis_speed;
        assert_eq!(sched.eqpt().moves(ActId::AxisY), vec![y]);
        assert_eq!(sched.reporter().finals, vec![state]);
    }

    #[test]
    fn test_archive_rows() {
        let mut path = std::env::temp_dir();
        path.push(format!("greenhouse_dispatch_test_{}.csv", std::process::id()));

        let sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::ShutDown, 5_000, 10);
        let mut sched = scheduler(sim, settings(600_000, 1_000))
            .with_archive(Archiver::open(&path).unwrap());
        assert!(sched.arch.is_enabled());

        sched.run();
        drop(sched);

        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "time_ms,action,result,water_cycles,rotations");
        assert!(lines[1].ends_with(",rotation,completed,0,1"));
        assert!(lines.last().unwrap().ends_with(",shut_down,,0,1"));
    }

    #[test]
    fn test_disabled_archive() {
        let sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::ShutDown, 5_000, 10);
        let mut sched =
            scheduler(sim, settings(600_000, 1_000)).with_archive(Archiver::default());
        assert!(!sched.arch.is_enabled());

        // Rows are dropped without affecting the run
        let state = sched.run();
        assert_eq!(state.rotations, 1);
        assert_eq!(state.stop_cause, Some(StopCause::UserShutdown));
    }
}
