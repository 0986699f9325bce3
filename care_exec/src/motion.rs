//! # Bounded Motion
//!
//! The single motion primitive used by every cycle. One or more actuators are driven at a fixed
//! velocity until the lead actuator's encoder shows the target distance has been covered, or until
//! a fail-safe deadline elapses. The actuators are always stopped on return.
//!
//! There is no closed loop control here: the velocity is commanded once and the encoder and clock
//! are polled until one of the two thresholds is crossed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use eqpt_if::{ActId, Eqpt, TimerId};
use log::{debug, trace};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Description of a single bounded motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSpec {
    /// Signed velocity commanded to every channel.
    pub velocity: f64,

    /// Distance the lead channel must cover.
    ///
    /// Units: centimeters
    pub target_distance: f64,

    /// Distance covered per encoder degree.
    ///
    /// Units: centimeters/degree
    pub conversion_factor: f64,

    /// Fail-safe time limit for the motion.
    pub deadline: Duration,
}

/// Result of a bounded motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionOutcome {
    /// True if the target distance was reached, false if the deadline elapsed first.
    pub completed: bool,

    /// Time spent polling.
    pub elapsed: Duration,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drive `channels` at `spec.velocity` until the first channel has covered the target distance or
/// the deadline has elapsed.
///
/// All channels are commanded identically, so paired motors on the same axis stay in step. Every
/// channel is commanded to zero before returning, whatever the outcome. A target which is already
/// satisfied on entry completes immediately.
///
/// The deadline is measured against the never-reset `Run` timer.
pub fn bounded_motion<E: Eqpt>(eqpt: &mut E, channels: &[ActId], spec: &MotionSpec) -> MotionOutcome {
    let lead = match channels.first() {
        Some(c) => *c,
        None => {
            return MotionOutcome {
                completed: true,
                elapsed: Duration::from_millis(0),
            }
        }
    };

    for ch in channels {
        eqpt.command(*ch, spec.velocity);
    }

    let start = eqpt.elapsed(TimerId::Run);
    let mut elapsed = Duration::from_millis(0);

    // The target is checked after the clock so that a poll which sees both thresholds crossed
    // counts as a completion.
    let mut reached = target_reached(eqpt, lead, spec);
    while !reached && elapsed < spec.deadline {
        elapsed = eqpt.elapsed(TimerId::Run).saturating_sub(start);
        reached = target_reached(eqpt, lead, spec);
    }

    for ch in channels {
        eqpt.command(*ch, 0.0);
    }

    if reached {
        debug!("{:?} reached {:.2} cm in {:?}", lead, spec.target_distance, elapsed);
    } else {
        debug!(
            "{:?} timed out after {:?} short of {:.2} cm",
            lead, elapsed, spec.target_distance
        );
    }

    MotionOutcome {
        completed: reached,
        elapsed,
    }
}

fn target_reached<E: Eqpt>(eqpt: &mut E, lead: ActId, spec: &MotionSpec) -> bool {
    let enc = eqpt.read_encoder(lead);
    let distance = enc.abs() as f64 * spec.conversion_factor;

    trace!("{:?} at {} deg ({:.3} cm)", lead, enc, distance);

    distance >= spec.target_distance
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimEqpt, SimParams};
    use eqpt_if::Actuators;

    fn spec(target_distance: f64, deadline_ms: u64) -> MotionSpec {
        MotionSpec {
            velocity: 3.0,
            target_distance,
            conversion_factor: 0.1,
            deadline: Duration::from_millis(deadline_ms),
        }
    }

    #[test]
    fn test_satisfied_target_completes_immediately() {
        let mut sim = SimEqpt::new(SimParams::default());

        for target in [0.0, -2.0].iter() {
            let out = bounded_motion(&mut sim, &[ActId::AxisY], &spec(*target, 1000));

            assert!(out.completed);
            assert_eq!(out.elapsed, Duration::from_millis(0));
            assert_eq!(sim.velocity(ActId::AxisY), 0.0);
        }
    }

    #[test]
    fn test_jammed_motion_times_out() {
        let mut sim = SimEqpt::new(SimParams::default()).jam(ActId::AxisY);
        let deadline = Duration::from_millis(500);

        let out = bounded_motion(&mut sim, &[ActId::AxisY], &spec(1.0, 500));

        assert!(!out.completed);
        assert!(out.elapsed >= deadline);
        assert!(out.elapsed < deadline + Duration::from_millis(5));
        assert_eq!(sim.velocity(ActId::AxisY), 0.0);
        assert_eq!(sim.moves(ActId::AxisY), vec![3.0]);
    }

    #[test]
    fn test_motion_reaches_target() {
        let mut sim = SimEqpt::new(SimParams::default());

        // 0.3 degrees/ms, 10.05 cm at 0.1 cm/degree needs 101 degrees
        let out = bounded_motion(&mut sim, &[ActId::AxisY], &spec(10.05, 10_000));

        assert!(out.completed);
        assert!(out.elapsed < Duration::from_secs(1));
        assert!(sim.read_encoder(ActId::AxisY) >= 101);
        assert_eq!(sim.velocity(ActId::AxisY), 0.0);
    }

    #[test]
    fn test_paired_channels_commanded_together() {
        let mut sim = SimEqpt::new(SimParams::default());
        let pair = [ActId::AxisX1, ActId::AxisX2];
        let spec = MotionSpec {
            velocity: -5.0,
            target_distance: 1.0,
            conversion_factor: 0.05,
            deadline: Duration::from_secs(5),
        };

        let out = bounded_motion(&mut sim, &pair, &spec);

        assert!(out.completed);
        assert_eq!(sim.moves(ActId::AxisX1), vec![-5.0]);
        assert_eq!(sim.moves(ActId::AxisX2), vec![-5.0]);
        assert_eq!(sim.velocity(ActId::AxisX1), 0.0);
        assert_eq!(sim.velocity(ActId::AxisX2), 0.0);

        // Both motors ran for the same time
        assert_eq!(
            sim.read_encoder(ActId::AxisX1),
            sim.read_encoder(ActId::AxisX2)
        );
    }
}
