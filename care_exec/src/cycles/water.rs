//! Water cycle
//!
//! The pump runs while the nozzle is swept over the bed. The primary (X) axis makes one slow pass
//! over its length while the secondary (Y) axis shuttles back and forth across it, giving a
//! boustrophedon pattern.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::{ActId, Eqpt, TimerId, X_AXIS};
use log::{debug, error, info, warn};

use super::CycleResult;
use crate::{
    motion::{bounded_motion, MotionSpec},
    params::Params,
    run_state::FailedTask,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of empty fill level polls between repeats of the refill prompt.
const REFILL_PROMPT_POLLS: u64 = 10_000;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Water the bed.
///
/// Blocks, without any deadline, until the water tank reads as filled. The emergency stop is
/// checked between shuttle segments of the secondary axis; when it is asserted the sweep is
/// abandoned after the segment in progress.
///
/// The scan axis is left at the far end of its travel, `axis_reset` returns it home.
pub fn water_cycle<E: Eqpt>(eqpt: &mut E, params: &Params) -> CycleResult {
    wait_for_water(eqpt);

    info!("Starting water cycle");

    let start = eqpt.elapsed(TimerId::Run);

    // Pump runs for the whole sweep
    eqpt.command(ActId::Pump, params.pump_speed);

    for act in X_AXIS.iter() {
        eqpt.reset_encoder(*act);
    }
    eqpt.reset_encoder(ActId::AxisY);

    for act in X_AXIS.iter() {
        eqpt.command(*act, params.x_axis_speed);
    }

    let mut segment = MotionSpec {
        velocity: params.y_axis_speed,
        target_distance: params.y_axis_length_cm,
        conversion_factor: params.y_axis_conversion_factor(),
        deadline: params.max_y_axis_time(),
    };

    let mut segment_timed_out = false;
    let mut stopped = false;
    let mut segments = 0u32;

    let (x_reached, x_timeout, pump_timeout) = loop {
        let elapsed = eqpt.elapsed(TimerId::Run).saturating_sub(start);
        let x_reached = x_distance(eqpt, params) >= params.x_axis_length_cm;
        let x_timeout = elapsed >= params.max_x_axis_time();
        let pump_timeout = elapsed >= params.max_pump_time();

        if x_reached || x_timeout || pump_timeout || stopped {
            break (x_reached, x_timeout, pump_timeout);
        }

        let outcome = bounded_motion(eqpt, &[ActId::AxisY], &segment);
        segments += 1;

        if !outcome.completed {
            warn!("Secondary axis segment {} timed out", segments);
            segment_timed_out = true;
        }

        // Shuttle back the other way
        segment.velocity = -segment.velocity;
        eqpt.reset_encoder(ActId::AxisY);

        if eqpt.emergency_stop() {
            warn!("Emergency stop asserted, abandoning the sweep");
            stopped = true;
        }
    };

    eqpt.command(ActId::Pump, 0.0);
    for act in X_AXIS.iter() {
        eqpt.command(*act, 0.0);
    }
    eqpt.command(ActId::AxisY, 0.0);

    debug!("Sweep ended after {} segments", segments);

    let result = if x_reached {
        if segment_timed_out {
            CycleResult::Failed(FailedTask::Axis)
        } else {
            CycleResult::Completed
        }
    } else if x_timeout {
        CycleResult::Failed(FailedTask::Axis)
    } else if pump_timeout {
        CycleResult::Failed(FailedTask::Pump)
    } else {
        CycleResult::Stopped
    };

    match result {
        CycleResult::Completed => info!("Water cycle complete"),
        CycleResult::Failed(task) => error!("Water cycle failed: {} timed out", task),
        CycleResult::Stopped => warn!("Water cycle stopped"),
    }

    result
}

/// Block until the tank has water in it, repeating the refill prompt while waiting.
fn wait_for_water<E: Eqpt>(eqpt: &mut E) {
    if eqpt.fill_level_ok() {
        return;
    }

    warn!("Water tank is empty, refill it to continue");

    let mut polls = 1u64;
    while !eqpt.fill_level_ok() {
        polls += 1;

        if polls % REFILL_PROMPT_POLLS == 0 {
            warn!("Still waiting for the water tank to be refilled");
        }
    }

    info!("Water tank refilled");
}

/// Distance covered by the primary axis since its encoders were reset.
fn x_distance<E: Eqpt>(eqpt: &mut E, params: &Params) -> f64 {
    eqpt.read_encoder(X_AXIS[0]).abs() as f64 * params.x_axis_conversion_factor()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
