//! Stage recalculation driver.
//!
//! Runs the pure derivation in `cofund_state::stage` against a stage of an
//! aggregate and writes the result back. Called after every request-state
//! change, inside the same transaction.

use tracing::{debug, info};

use cofund_core::{StageId, Timestamp};
use cofund_state::StageState;

use crate::aggregate::ProjectAggregate;
use crate::error::EngineError;

/// Recompute and store the state of one stage.
pub(crate) fn recompute_stage(
    aggregate: &mut ProjectAggregate,
    stage_id: StageId,
    now: Timestamp,
) -> Result<StageState, EngineError> {
    let children = aggregate.request_states_of(stage_id);
    let stage = aggregate
        .stage_mut(stage_id)
        .ok_or_else(|| EngineError::not_found("stage", stage_id))?;
    let before = stage.state;
    let after = stage.recompute(&children, now);
    if before != after {
        info!(stage = %stage_id, from = %before, to = %after, "stage state recalculated");
    } else {
        debug!(stage = %stage_id, state = %after, requests = children.len(), "stage unchanged");
    }
    Ok(after)
}
