//! # Stage API
//!
//! Manual stage transitions (owner only, project in execution), and adding
//! or removing coverage requests on a stage that has not started. Funded and
//! Completed by recalculation are never set here; they follow from request
//! states.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use uuid::Uuid;

use cofund_core::{RequestId, StageId};
use cofund_state::NewRequest;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_validated_json;
use crate::routes::projects::CreateRequestBody;
use crate::state::AppState;
use crate::views::{RequestView, StageView};

/// Build the stages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/stages/:id/start", post(start_stage))
        .route("/v1/stages/:id/complete", post(complete_stage))
        .route("/v1/stages/:id/requests", post(add_request))
        .route("/v1/requests/:id", delete(delete_request))
}

/// POST /v1/stages/:id/start — Start execution of a fully covered stage.
#[utoipa::path(
    post,
    path = "/v1/stages/{id}/start",
    params(("id" = Uuid, Path, description = "Stage ID")),
    responses(
        (status = 200, description = "Stage in execution", body = StageView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Wrong state, or requests still pending coverage", body = crate::error::ErrorBody),
    ),
    tag = "stages"
)]
async fn start_stage(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<StageView>, AppError> {
    let stage = state.engine.start_stage(StageId(id), &caller.actor())?;
    state.persist(stage.project_id).await?;
    Ok(Json(StageView::from(&stage)))
}

/// POST /v1/stages/:id/complete — Close a stage in execution.
#[utoipa::path(
    post,
    path = "/v1/stages/{id}/complete",
    params(("id" = Uuid, Path, description = "Stage ID")),
    responses(
        (status = 200, description = "Stage completed", body = StageView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Stage is not in execution", body = crate::error::ErrorBody),
    ),
    tag = "stages"
)]
async fn complete_stage(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<StageView>, AppError> {
    let stage = state.engine.complete_stage(StageId(id), &caller.actor())?;
    state.persist(stage.project_id).await?;
    Ok(Json(StageView::from(&stage)))
}

/// POST /v1/stages/:id/requests — Add a coverage request to a stage.
#[utoipa::path(
    post,
    path = "/v1/stages/{id}/requests",
    params(("id" = Uuid, Path, description = "Stage ID")),
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request added", body = RequestView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 409, description = "Stage already started", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "stages"
)]
async fn add_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestView>), AppError> {
    let req = extract_validated_json(body)?;
    let request = state
        .engine
        .add_request(StageId(id), &caller.actor(), NewRequest::from(req))?;
    state.persist(request.project_id).await?;
    Ok((StatusCode::CREATED, Json(RequestView::from(&request))))
}

/// DELETE /v1/requests/:id — Remove an uncovered request and its offers.
#[utoipa::path(
    delete,
    path = "/v1/requests/{id}",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request deleted; the recalculated stage", body = StageView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Request already covered, or stage already started", body = crate::error::ErrorBody),
    ),
    tag = "stages"
)]
async fn delete_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<StageView>, AppError> {
    let stage = state
        .engine
        .delete_request(RequestId(id), &caller.actor())?;
    state.persist(stage.project_id).await?;
    Ok(Json(StageView::from(&stage)))
}
