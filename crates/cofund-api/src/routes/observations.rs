//! # Observation API
//!
//! Council members raise observations on projects in execution; the project
//! owner answers them. Reads derive `OVERDUE` from the clock and, when that
//! changed stored state, persist the escalation before responding.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use cofund_core::{ObservationId, ProjectId};
use cofund_state::ObservationState;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_state_filter, Validate};
use crate::routes::StateFilter;
use crate::state::AppState;
use crate::views::ObservationView;

const MAX_TEXT_LEN: usize = 4000;

fn check_text(field: &str, text: &str) -> Result<(), String> {
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(format!("{field} must not exceed {MAX_TEXT_LEN} characters"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateObservationRequest {
    pub body: String,
}

impl Validate for CreateObservationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("body", &self.body)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateObservationRequest {
    pub body: String,
}

impl Validate for UpdateObservationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("body", &self.body)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveObservationRequest {
    pub response: String,
}

impl Validate for ResolveObservationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("response", &self.response)
    }
}

/// Build the observations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/projects/:id/observations",
            get(list_observations).post(create_observation),
        )
        .route(
            "/v1/observations/:id",
            get(get_observation).patch(update_observation),
        )
        .route("/v1/observations/:id/resolve", post(resolve_observation))
}

/// POST /v1/projects/:id/observations — Raise an observation. Council only.
#[utoipa::path(
    post,
    path = "/v1/projects/{id}/observations",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = CreateObservationRequest,
    responses(
        (status = 201, description = "Observation raised", body = ObservationView),
        (status = 403, description = "Caller is not a council member", body = crate::error::ErrorBody),
        (status = 409, description = "Project is not in execution", body = crate::error::ErrorBody),
        (status = 422, description = "Empty body", body = crate::error::ErrorBody),
    ),
    tag = "observations"
)]
async fn create_observation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateObservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ObservationView>), AppError> {
    let req = extract_validated_json(body)?;
    let obs = state
        .engine
        .raise_observation(ProjectId(id), &caller.actor(), req.body)?;
    state.persist(obs.project_id).await?;
    Ok((StatusCode::CREATED, Json(ObservationView::from(&obs))))
}

/// GET /v1/projects/:id/observations — Observations, newest first.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}/observations",
    params(("id" = Uuid, Path, description = "Project ID"), StateFilter),
    responses(
        (status = 200, description = "Observations", body = Vec<ObservationView>),
        (status = 400, description = "Unknown state filter", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "observations"
)]
async fn list_observations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<StateFilter>,
) -> Result<Json<Vec<ObservationView>>, AppError> {
    let wanted = parse_state_filter(
        filter.state.as_deref(),
        ObservationState::from_wire,
        "pending, overdue, resolved",
    )?;
    let project_id = ProjectId(id);
    let listed = state.engine.list_observations(project_id, wanted)?;
    if listed.escalated {
        state.persist(project_id).await?;
    }
    Ok(Json(listed.value.iter().map(ObservationView::from).collect()))
}

/// GET /v1/observations/:id — One observation.
#[utoipa::path(
    get,
    path = "/v1/observations/{id}",
    params(("id" = Uuid, Path, description = "Observation ID")),
    responses(
        (status = 200, description = "Observation found", body = ObservationView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "observations"
)]
async fn get_observation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ObservationView>, AppError> {
    let read = state.engine.get_observation(ObservationId(id))?;
    if read.escalated {
        state.persist(read.value.project_id).await?;
    }
    Ok(Json(ObservationView::from(&read.value)))
}

/// PATCH /v1/observations/:id — Edit the text. Author or project owner.
#[utoipa::path(
    patch,
    path = "/v1/observations/{id}",
    params(("id" = Uuid, Path, description = "Observation ID")),
    request_body = UpdateObservationRequest,
    responses(
        (status = 200, description = "Observation updated", body = ObservationView),
        (status = 403, description = "Caller is neither the author nor the project owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already resolved", body = crate::error::ErrorBody),
        (status = 422, description = "Empty body", body = crate::error::ErrorBody),
    ),
    tag = "observations"
)]
async fn update_observation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateObservationRequest>, JsonRejection>,
) -> Result<Json<ObservationView>, AppError> {
    let req = extract_validated_json(body)?;
    let obs = state
        .engine
        .update_observation(ObservationId(id), &caller.actor(), req.body)?;
    state.persist(obs.project_id).await?;
    Ok(Json(ObservationView::from(&obs)))
}

/// POST /v1/observations/:id/resolve — Answer an observation. Project owner only.
#[utoipa::path(
    post,
    path = "/v1/observations/{id}/resolve",
    params(("id" = Uuid, Path, description = "Observation ID")),
    request_body = ResolveObservationRequest,
    responses(
        (status = 200, description = "Observation resolved", body = ObservationView),
        (status = 403, description = "Caller is not the project owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already resolved", body = crate::error::ErrorBody),
        (status = 422, description = "Empty response", body = crate::error::ErrorBody),
    ),
    tag = "observations"
)]
async fn resolve_observation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ResolveObservationRequest>, JsonRejection>,
) -> Result<Json<ObservationView>, AppError> {
    let req = extract_validated_json(body)?;
    let obs = state
        .engine
        .resolve_observation(ObservationId(id), &caller.actor(), req.response)?;
    state.persist(obs.project_id).await?;
    Ok(Json(ObservationView::from(&obs)))
}
