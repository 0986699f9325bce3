//! Bed rotation cycle

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::{ActId, Eqpt};
use log::{error, info};

use super::CycleResult;
use crate::{
    motion::{bounded_motion, MotionSpec},
    params::Params,
    run_state::{FailedTask, RunState},
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Make one quarter turn of the bed.
///
/// The direction alternates every `max_rotations` turns so that the bed never winds up its
/// hoses. A completed turn is counted in `state.rotations`; failures are left for the caller to
/// record.
pub fn rotation_cycle<E: Eqpt>(eqpt: &mut E, params: &Params, state: &mut RunState) -> CycleResult {
    state.advance_rotation(params.max_rotations);

    eqpt.reset_encoder(ActId::Rotation);

    let spec = MotionSpec {
        velocity: state.rotation_direction.sign() * params.rotation_speed,
        target_distance: params.rotation_distance_cm,
        conversion_factor: params.rotation_conversion_factor(),
        deadline: params.max_rotation_time(),
    };

    let outcome = bounded_motion(eqpt, &[ActId::Rotation], &spec);

    if outcome.completed {
        state.rotations += 1;
        info!(
            "Rotated {:?} in {:?} ({} this way)",
            state.rotation_direction, outcome.elapsed, state.rotation_count
        );
        CycleResult::Completed
    } else {
        error!("Rotation did not complete within {:?}", spec.deadline);
        CycleResult::Failed(FailedTask::Rotation)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
