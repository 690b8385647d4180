//! # Project API
//!
//! Project creation with nested stages and requests, retrieval, deletion,
//! and the Project Gate. `start` and `complete` fail with 409 and a
//! blocking report listing every request or stage in the way.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use cofund_core::{Amount, ProjectId};
use cofund_state::{NewProject, NewRequest, NewStage, RequestKind, RequestState};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_state_filter, Validate};
use crate::routes::StateFilter;
use crate::state::AppState;
use crate::views::{ProjectTreeView, ProjectView, RequestView, StageView};

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 4000;

fn check_len(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} must not exceed {max} characters"));
    }
    Ok(())
}

// ─── Request DTOs ────────────────────────────────────────────────────

/// A coverage request as submitted by a project owner.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    /// economic, materials, labor, transport or equipment.
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "materials")]
    pub kind: RequestKind,
    pub description: String,
    /// Decimal string with at most two fraction digits. Economic only.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "250000.00")]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Validate for CreateRequestBody {
    fn validate(&self) -> Result<(), String> {
        check_len("description", &self.description, MAX_TEXT_LEN)?;
        if let Some(currency) = &self.currency {
            check_len("currency", currency, 8)?;
        }
        Ok(())
    }
}

impl From<CreateRequestBody> for NewRequest {
    fn from(body: CreateRequestBody) -> Self {
        Self {
            kind: body.kind,
            description: body.description,
            amount: body.amount,
            currency: body.currency,
            quantity: body.quantity,
            unit: body.unit,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStageBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub requests: Vec<CreateRequestBody>,
}

impl From<CreateStageBody> for NewStage {
    fn from(body: CreateStageBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            starts_on: body.starts_on,
            ends_on: body.ends_on,
            requests: body.requests.into_iter().map(NewRequest::from).collect(),
        }
    }
}

/// Request to create a project. Stages may be given in any order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stages: Vec<CreateStageBody>,
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> Result<(), String> {
        check_len("title", &self.title, MAX_TITLE_LEN)?;
        check_len("description", &self.description, MAX_TEXT_LEN)?;
        for stage in &self.stages {
            check_len("stage name", &stage.name, MAX_TITLE_LEN)?;
            check_len("stage description", &stage.description, MAX_TEXT_LEN)?;
            stage.requests.iter().try_for_each(|r| r.validate())?;
        }
        Ok(())
    }
}

impl From<CreateProjectRequest> for NewProject {
    fn from(body: CreateProjectRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            stages: body.stages.into_iter().map(NewStage::from).collect(),
        }
    }
}

// ─── Router ──────────────────────────────────────────────────────────

/// Build the projects router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/projects", post(create_project))
        .route("/v1/projects/:id", get(get_project).delete(delete_project))
        .route("/v1/projects/:id/start", post(start_project))
        .route("/v1/projects/:id/complete", post(complete_project))
        .route("/v1/projects/:id/stages", get(list_stages))
        .route("/v1/projects/:id/requests", get(list_requests))
}

// ─── Handlers ────────────────────────────────────────────────────────

/// POST /v1/projects — Create a project owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectTreeView),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn create_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectTreeView>), AppError> {
    let req = extract_validated_json(body)?;
    let aggregate = state
        .engine
        .create_project(&caller.actor(), NewProject::from(req))?;
    state.persist(aggregate.project.id).await?;
    Ok((StatusCode::CREATED, Json(ProjectTreeView::from(&aggregate))))
}

/// GET /v1/projects/:id — Project with its stages and requests.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project found", body = ProjectTreeView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectTreeView>, AppError> {
    let project_id = ProjectId(id);
    let read = state.engine.read_project(project_id)?;
    if read.escalated {
        state.persist(project_id).await?;
    }
    Ok(Json(ProjectTreeView::from(&read.value)))
}

/// DELETE /v1/projects/:id — Delete a project and everything beneath it. Owner only.
#[utoipa::path(
    delete,
    path = "/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn delete_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let project_id = ProjectId(id);
    state.engine.delete_project(project_id, &caller.actor())?;
    state.persist(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/projects/:id/start — Move a fully covered project into execution.
#[utoipa::path(
    post,
    path = "/v1/projects/{id}/start",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project in execution", body = ProjectView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 409, description = "Project not pending, or requests still pending coverage", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn start_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectView>, AppError> {
    let project = state.engine.start_project(ProjectId(id), &caller.actor())?;
    state.persist(project.id).await?;
    Ok(Json(ProjectView::from(&project)))
}

/// POST /v1/projects/:id/complete — Finish a project whose stages are all completed.
#[utoipa::path(
    post,
    path = "/v1/projects/{id}/complete",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project finished", body = ProjectView),
        (status = 403, description = "Caller is not the owner", body = crate::error::ErrorBody),
        (status = 409, description = "Project not in execution, or stages not completed", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn complete_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectView>, AppError> {
    let project = state
        .engine
        .complete_project(ProjectId(id), &caller.actor())?;
    state.persist(project.id).await?;
    Ok(Json(ProjectView::from(&project)))
}

/// GET /v1/projects/:id/stages — Stages ordered by start date.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}/stages",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Stages", body = Vec<StageView>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn list_stages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StageView>>, AppError> {
    let stages = state.engine.list_stages(ProjectId(id))?;
    Ok(Json(stages.iter().map(StageView::from).collect()))
}

/// GET /v1/projects/:id/requests — Requests in stage order, optionally filtered by state.
#[utoipa::path(
    get,
    path = "/v1/projects/{id}/requests",
    params(("id" = Uuid, Path, description = "Project ID"), StateFilter),
    responses(
        (status = 200, description = "Requests", body = Vec<RequestView>),
        (status = 400, description = "Unknown state filter", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "projects"
)]
async fn list_requests(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<StateFilter>,
) -> Result<Json<Vec<RequestView>>, AppError> {
    let wanted = parse_state_filter(
        filter.state.as_deref(),
        RequestState::from_wire,
        "pending, committed, completed",
    )?;
    let requests = state.engine.list_requests(ProjectId(id), wanted)?;
    Ok(Json(requests.iter().map(RequestView::from).collect()))
}
