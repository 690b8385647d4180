//! Request lifecycle transitions.
//!
//! The only code paths that change a request's state. Each one moves the
//! request forward and then recalculates its stage, so the pair is always
//! applied in the same transaction. Reached only through offer arbitration.

use tracing::info;

use cofund_core::{RequestId, Timestamp};
use cofund_state::{RequestState, StageState};

use crate::aggregate::ProjectAggregate;
use crate::error::EngineError;
use crate::recalc::recompute_stage;

/// PENDING → COMMITTED, then recalculate the stage.
pub(crate) fn commit(
    aggregate: &mut ProjectAggregate,
    request_id: RequestId,
    now: Timestamp,
) -> Result<StageState, EngineError> {
    let request = aggregate
        .request_mut(request_id)
        .ok_or_else(|| EngineError::not_found("request", request_id))?;
    request.commit(now)?;
    let stage_id = request.stage_id;
    info!(request = %request_id, "request committed");
    recompute_stage(aggregate, stage_id, now)
}

/// COMMITTED → COMPLETED, then recalculate the stage.
///
/// Returns the request's previous state and the stage's new state.
pub(crate) fn complete(
    aggregate: &mut ProjectAggregate,
    request_id: RequestId,
    now: Timestamp,
) -> Result<(RequestState, StageState), EngineError> {
    let request = aggregate
        .request_mut(request_id)
        .ok_or_else(|| EngineError::not_found("request", request_id))?;
    let previous = request.state;
    request.complete(now)?;
    let stage_id = request.stage_id;
    info!(request = %request_id, "request completed");
    let stage_state = recompute_stage(aggregate, stage_id, now)?;
    Ok((previous, stage_state))
}
