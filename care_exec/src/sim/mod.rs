//! # Simulated Equipment
//!
//! A deterministic stand-in for the greenhouse hardware. Simulated time only moves when an input
//! is read: every encoder, sensor, button or clock read advances the clock by one tick and
//! integrates the actuator positions over that tick. Busy-poll loops therefore always make
//! progress and every run is exactly repeatable.
//!
//! The simulation also records what the automation core asked of it, so that tests can check the
//! commands issued, encoder resets and sensor polls.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use eqpt_if::{ActId, Actuators, ButtonId, Clock, Sensors, TimerId};
use log::trace;
use serde::Serialize;

pub use params::{ButtonPress, SimParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long the shut down button is held when the run duration expires.
///
/// Units: milliseconds
const RUN_END_HOLD_MS: u64 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulated greenhouse equipment.
pub struct SimEqpt {
    params: SimParams,

    /// Current simulated time.
    ///
    /// Units: milliseconds
    now_ms: u64,

    timer_starts: HashMap<TimerId, u64>,

    velocities: HashMap<ActId, f64>,

    /// Actuator positions since the last encoder reset.
    ///
    /// Units: degrees
    positions: HashMap<ActId, f64>,

    fill_script: VecDeque<bool>,
    fill_polls: u64,

    presses: Vec<ButtonPress>,

    /// Time at which each press in `presses` went down, if it has.
    press_starts: Vec<Option<u64>>,

    commands: Vec<CommandRecord>,
    encoder_resets: HashMap<ActId, u32>,
}

/// A velocity command received by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommandRecord {
    /// Units: milliseconds
    pub at_ms: u64,

    /// Number of fill level polls made before the command was issued.
    pub fill_polls: u64,

    pub act: ActId,

    pub velocity: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimEqpt {
    pub fn new(params: SimParams) -> Self {
        let mut presses = params.presses.clone();

        if let Some(at_ms) = params.run_duration_ms {
            presses.push(ButtonPress {
                button: ButtonId::ShutDown,
                at_ms,
                hold_ms: RUN_END_HOLD_MS,
            });
        }

        let press_starts = vec![None; presses.len()];

        Self {
            params,
            now_ms: 0,
            timer_starts: HashMap::new(),
            velocities: HashMap::new(),
            positions: HashMap::new(),
            fill_script: VecDeque::new(),
            fill_polls: 0,
            presses,
            press_starts,
            commands: Vec::new(),
            encoder_resets: HashMap::new(),
        }
    }

    /// Script the readings of the fill level sensor. Once the script runs out the sensor reads
    /// the configured tank state.
    pub fn with_fill_script<I: IntoIterator<Item = bool>>(mut self, script: I) -> Self {
        self.fill_script.extend(script);
        self
    }

    /// Jam an actuator so that its encoder never advances.
    pub fn jam(mut self, act: ActId) -> Self {
        if !self.params.jammed.contains(&act) {
            self.params.jammed.push(act);
        }
        self
    }

    /// Assert the emergency stop from the given time onwards.
    pub fn with_estop_at(mut self, at_ms: u64) -> Self {
        self.params.estop_at_ms = Some(at_ms);
        self
    }

    /// Add a scripted button press.
    pub fn with_press(mut self, button: ButtonId, at_ms: u64, hold_ms: u64) -> Self {
        self.presses.push(ButtonPress {
            button,
            at_ms,
            hold_ms,
        });
        self.press_starts.push(None);
        self
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms)
    }

    /// Velocity the actuator is currently commanded to.
    pub fn velocity(&self, act: ActId) -> f64 {
        self.velocities.get(&act).copied().unwrap_or(0.0)
    }

    /// Every command received, in order.
    pub fn commands(&self) -> &[CommandRecord] {
        &self.commands
    }

    /// Non-zero commands received by the given actuator, in order.
    pub fn moves(&self, act: ActId) -> Vec<f64> {
        self.commands
            .iter()
            .filter(|c| c.act == act && c.velocity != 0.0)
            .map(|c| c.velocity)
            .collect()
    }

    /// Number of times the actuator's encoder has been reset.
    pub fn encoder_resets(&self, act: ActId) -> u32 {
        self.encoder_resets.get(&act).copied().unwrap_or(0)
    }

    /// Number of times the fill level sensor has been read.
    pub fn fill_polls(&self) -> u64 {
        self.fill_polls
    }

    /// Advance simulated time by one tick.
    fn tick(&mut self) {
        let dt_ms = self.params.tick_ms as f64;

        for act in ActId::ALL.iter() {
            if self.params.jammed.contains(act) {
                continue;
            }

            let rate = self.params.rate(*act);
            let velocity = self.velocity(*act);
            *self.positions.entry(*act).or_insert(0.0) += velocity * rate * dt_ms;
        }

        self.now_ms += self.params.tick_ms;
    }
}

impl Actuators for SimEqpt {
    fn command(&mut self, act: ActId, velocity: f64) {
        trace!("[sim] {:?} <- {}", act, velocity);

        self.velocities.insert(act, velocity);
        self.commands.push(CommandRecord {
            at_ms: self.now_ms,
            fill_polls: self.fill_polls,
            act,
            velocity,
        });
    }

    fn read_encoder(&mut self, act: ActId) -> i64 {
        self.tick();

        // Encoders count whole degrees
        self.positions.get(&act).copied().unwrap_or(0.0) as i64
    }

    fn reset_encoder(&mut self, act: ActId) {
        self.positions.insert(act, 0.0);
        *self.encoder_resets.entry(act).or_insert(0) += 1;
    }
}

impl Sensors for SimEqpt {
    fn fill_level_ok(&mut self) -> bool {
        self.tick();
        self.fill_polls += 1;

        match self.fill_script.pop_front() {
            Some(level) => level,
            None => self.params.tank_filled,
        }
    }

    fn emergency_stop(&mut self) -> bool {
        self.tick();

        match self.params.estop_at_ms {
            Some(t) => self.now_ms >= t,
            None => false,
        }
    }

    fn button(&mut self, id: ButtonId) -> bool {
        self.tick();

        let now = self.now_ms;
        let mut down = false;

        for (press, start) in self.presses.iter().zip(self.press_starts.iter_mut()) {
            if press.button != id || now < press.at_ms {
                continue;
            }

            let start = *start.get_or_insert(now);
            if now < start + press.hold_ms {
                down = true;
            }
        }

        down
    }
}

impl Clock for SimEqpt {
    fn elapsed(&mut self, timer: TimerId) -> Duration {
        self.tick();

        let start = self.timer_starts.get(&timer).copied().unwrap_or(0);
        Duration::from_millis(self.now_ms - start)
    }

    fn reset_timer(&mut self, timer: TimerId) {
        self.timer_starts.insert(timer, self.now_ms);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_integrates_velocity() {
        let mut sim = SimEqpt::new(SimParams::default());

        sim.command(ActId::AxisY, 3.0);

        // 11 reads at 1 ms, 0.3 degrees/ms
        let mut enc = 0;
        for _ in 0..11 {
            enc = sim.read_encoder(ActId::AxisY);
        }
        assert_eq!(enc, 3);
        assert_eq!(sim.now(), Duration::from_millis(11));

        sim.reset_encoder(ActId::AxisY);
        assert_eq!(sim.encoder_resets(ActId::AxisY), 1);

        sim.command(ActId::AxisY, -3.0);
        for _ in 0..21 {
            enc = sim.read_encoder(ActId::AxisY);
        }
        assert_eq!(enc, -6);
    }

    #[test]
    fn test_jammed_actuator_does_not_move() {
        let mut sim = SimEqpt::new(SimParams::default()).jam(ActId::Rotation);

        sim.command(ActId::Rotation, 20.0);
        for _ in 0..1000 {
            assert_eq!(sim.read_encoder(ActId::Rotation), 0);
        }
        assert_eq!(sim.velocity(ActId::Rotation), 20.0);
    }

    #[test]
    fn test_timers() {
        let mut sim = SimEqpt::new(SimParams::default());

        assert_eq!(sim.elapsed(TimerId::Run), Duration::from_millis(1));
        sim.reset_timer(TimerId::Water);
        assert_eq!(sim.elapsed(TimerId::Water), Duration::from_millis(1));
        assert_eq!(sim.elapsed(TimerId::Run), Duration::from_millis(3));
    }

    #[test]
    fn test_fill_script() {
        let mut sim = SimEqpt::new(SimParams::default()).with_fill_script(vec![false, false]);

        assert!(!sim.fill_level_ok());
        assert!(!sim.fill_level_ok());
        assert!(sim.fill_level_ok());
        assert_eq!(sim.fill_polls(), 3);
    }

    #[test]
    fn test_button_press_waits_to_be_seen() {
        let mut sim = SimEqpt::new(SimParams::default()).with_press(ButtonId::Stats, 5, 3);

        // Let time pass without looking at the button
        for _ in 0..20 {
            sim.emergency_stop();
        }

        assert!(sim.button(ButtonId::Stats));
        assert!(!sim.button(ButtonId::ShutDown));
        assert!(sim.button(ButtonId::Stats));
        assert!(!sim.button(ButtonId::Stats));
        assert!(!sim.button(ButtonId::Stats));
    }

    #[test]
    fn test_estop() {
        let mut sim = SimEqpt::new(SimParams::default()).with_estop_at(3);

        assert!(!sim.emergency_stop());
        assert!(!sim.emergency_stop());
        assert!(sim.emergency_stop());
        assert!(sim.emergency_stop());
    }

    #[test]
    fn test_params_from_toml() {
        let p: SimParams = util::params::parse(
            r#"
            tick_ms = 10
            pump_rate = 1.0
            x_axis_rate = 0.04
            y_axis_rate = 0.1
            rotation_rate = 0.01
            tank_filled = true
            jammed = ["Rotation"]
            run_duration_ms = 600000

            [[presses]]
            button = "Stats"
            at_ms = 1000
            hold_ms = 200
            "#,
        )
        .unwrap();

        assert_eq!(p.jammed, vec![ActId::Rotation]);
        assert_eq!(p.presses.len(), 1);
        assert_eq!(p.presses[0].button, ButtonId::Stats);
        assert_eq!(p.estop_at_ms, None);
        assert_eq!(p.rate(ActId::AxisX2), 0.04);
    }
}
