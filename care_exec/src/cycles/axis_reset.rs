//! Return the primary scan axis to its home position

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::{Eqpt, X_AXIS};
use log::{error, info};

use super::CycleResult;
use crate::{
    motion::{bounded_motion, MotionSpec},
    params::Params,
    run_state::FailedTask,
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drive the primary scan axis back over its full length plus the home buffer.
pub fn axis_reset<E: Eqpt>(eqpt: &mut E, params: &Params) -> CycleResult {
    for act in X_AXIS.iter() {
        eqpt.reset_encoder(*act);
    }

    let spec = MotionSpec {
        velocity: -params.x_axis_speed,
        target_distance: params.x_axis_length_cm + params.buffer_length_cm,
        conversion_factor: params.x_axis_conversion_factor(),
        deadline: params.max_x_axis_time(),
    };

    let outcome = bounded_motion(eqpt, &X_AXIS, &spec);

    if outcome.completed {
        info!("Scan axis returned home in {:?}", outcome.elapsed);
        CycleResult::Completed
    } else {
        error!("Scan axis did not return home within {:?}", spec.deadline);
        CycleResult::Failed(FailedTask::Axis)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
