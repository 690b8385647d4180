//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "cofund API",
        version = "0.3.0",
        description = "Lifecycle-consistency engine for crowd-funded projects: projects, stages, coverage requests, offers and council observations.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Projects
        crate::routes::projects::create_project,
        crate::routes::projects::get_project,
        crate::routes::projects::delete_project,
        crate::routes::projects::start_project,
        crate::routes::projects::complete_project,
        crate::routes::projects::list_stages,
        crate::routes::projects::list_requests,
        // Stages
        crate::routes::stages::start_stage,
        crate::routes::stages::complete_stage,
        crate::routes::stages::add_request,
        crate::routes::stages::delete_request,
        // Offers
        crate::routes::offers::submit_offer,
        crate::routes::offers::list_offers,
        crate::routes::offers::accept_offer,
        crate::routes::offers::reject_offer,
        crate::routes::offers::confirm_fulfillment,
        crate::routes::offers::my_commitments,
        // Observations
        crate::routes::observations::create_observation,
        crate::routes::observations::list_observations,
        crate::routes::observations::get_observation,
        crate::routes::observations::update_observation,
        crate::routes::observations::resolve_observation,
    ),
    components(schemas(
        // Views
        crate::views::TransitionView,
        crate::views::ProjectView,
        crate::views::StageView,
        crate::views::RequestView,
        crate::views::OfferView,
        crate::views::ObservationView,
        crate::views::ProjectTreeView,
        crate::views::AcceptView,
        crate::views::ReceiptView,
        crate::views::CommitmentView,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Request DTOs
        crate::routes::projects::CreateProjectRequest,
        crate::routes::projects::CreateStageBody,
        crate::routes::projects::CreateRequestBody,
        crate::routes::offers::SubmitOfferRequest,
        crate::routes::observations::CreateObservationRequest,
        crate::routes::observations::UpdateObservationRequest,
        crate::routes::observations::ResolveObservationRequest,
    )),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "projects", description = "Project lifecycle and Project Gate"),
        (name = "stages", description = "Stage transitions, adding and deleting requests"),
        (name = "offers", description = "Offer arbitration and fulfilment"),
        (name = "observations", description = "Council observations"),
    )
)]
pub struct ApiDoc;

/// Registers the `{role}:{user_id}:{secret}` bearer scheme.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("{role}:{user_id}:{secret}, role is member or council"))
                    .build(),
            ),
        );
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
