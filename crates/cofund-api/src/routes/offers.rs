//! # Offer API
//!
//! Offer submission and listing on a request, arbitration by the project
//! owner, fulfilment confirmation by the winning bidder, and the caller's
//! own commitments.
//!
//! Two owners racing to accept sibling offers on the same request both
//! reach the engine; exactly one gets 200 and the other gets 409.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use cofund_core::{Amount, OfferId, RequestId};
use cofund_state::{NewOffer, RequestState};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_state_filter, Validate};
use crate::state::AppState;
use crate::views::{AcceptView, CommitmentView, OfferView, ReceiptView};

const MAX_MESSAGE_LEN: usize = 2000;

/// Request to bid on a coverage request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitOfferRequest {
    /// Quoted amount, if the bidder names one.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "120000.00")]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Validate for SubmitOfferRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount.as_ref().is_some_and(Amount::is_zero) {
            return Err("amount must be greater than zero".into());
        }
        match &self.message {
            Some(m) if m.chars().count() > MAX_MESSAGE_LEN => Err(format!(
                "message must not exceed {MAX_MESSAGE_LEN} characters"
            )),
            _ => Ok(()),
        }
    }
}

/// `?request_state=` filter for the caller's commitments.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommitmentFilter {
    /// `committed` or `completed`.
    pub request_state: Option<String>,
}

/// Build the offers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/requests/:id/offers",
            get(list_offers).post(submit_offer),
        )
        .route("/v1/offers/mine", get(my_commitments))
        .route("/v1/offers/:id/accept", post(accept_offer))
        .route("/v1/offers/:id/reject", post(reject_offer))
        .route("/v1/offers/:id/confirm", post(confirm_fulfillment))
}

/// POST /v1/requests/:id/offers — Bid on a pending request.
#[utoipa::path(
    post,
    path = "/v1/requests/{id}/offers",
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = SubmitOfferRequest,
    responses(
        (status = 201, description = "Offer submitted", body = OfferView),
        (status = 403, description = "Owners cannot bid on their own requests", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Request already covered, or duplicate pending offer", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn submit_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<SubmitOfferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OfferView>), AppError> {
    let req = extract_validated_json(body)?;
    let input = NewOffer {
        amount: req.amount,
        message: req.message,
    };
    let offer = state
        .engine
        .submit_offer(RequestId(id), &caller.actor(), input)?;
    state.persist(offer.project_id).await?;
    Ok((StatusCode::CREATED, Json(OfferView::from(&offer))))
}

/// GET /v1/requests/:id/offers — Offers on a request, newest first.
///
/// The project owner sees every offer; other callers see their own.
#[utoipa::path(
    get,
    path = "/v1/requests/{id}/offers",
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Offers", body = Vec<OfferView>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn list_offers(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<OfferView>>, AppError> {
    let offers = state.engine.list_offers(RequestId(id), &caller.actor())?;
    Ok(Json(offers.iter().map(OfferView::from).collect()))
}

/// POST /v1/offers/:id/accept — Accept an offer, rejecting its pending siblings.
#[utoipa::path(
    post,
    path = "/v1/offers/{id}/accept",
    params(("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Offer accepted, request committed", body = AcceptView),
        (status = 403, description = "Caller is not the project owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Offer already decided or request already covered", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn accept_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AcceptView>, AppError> {
    let outcome = state.engine.accept(OfferId(id), &caller.actor())?;
    state.persist(outcome.offer.project_id).await?;
    Ok(Json(AcceptView::from(&outcome)))
}

/// POST /v1/offers/:id/reject — Reject a single pending offer.
#[utoipa::path(
    post,
    path = "/v1/offers/{id}/reject",
    params(("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Offer rejected", body = OfferView),
        (status = 403, description = "Caller is not the project owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Offer already decided", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn reject_offer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferView>, AppError> {
    let offer = state.engine.reject(OfferId(id), &caller.actor())?;
    state.persist(offer.project_id).await?;
    Ok(Json(OfferView::from(&offer)))
}

/// POST /v1/offers/:id/confirm — The winning bidder confirms fulfilment.
#[utoipa::path(
    post,
    path = "/v1/offers/{id}/confirm",
    params(("id" = Uuid, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Request completed", body = ReceiptView),
        (status = 403, description = "Caller is not the bidder", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Offer not accepted, or already confirmed", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn confirm_fulfillment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceiptView>, AppError> {
    let receipt = state
        .engine
        .confirm_fulfillment(OfferId(id), &caller.actor())?;
    state.persist(receipt.project_id).await?;
    Ok(Json(ReceiptView::from(&receipt)))
}

/// GET /v1/offers/mine — The caller's accepted offers across projects.
#[utoipa::path(
    get,
    path = "/v1/offers/mine",
    params(CommitmentFilter),
    responses(
        (status = 200, description = "Commitments, newest first", body = Vec<CommitmentView>),
        (status = 400, description = "Unknown state filter", body = crate::error::ErrorBody),
    ),
    tag = "offers"
)]
async fn my_commitments(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(filter): Query<CommitmentFilter>,
) -> Result<Json<Vec<CommitmentView>>, AppError> {
    let wanted = parse_state_filter(
        filter.request_state.as_deref(),
        RequestState::from_wire,
        "committed, completed",
    )?;
    let commitments = state.engine.my_commitments(&caller.actor(), wanted);
    Ok(Json(commitments.iter().map(CommitmentView::from).collect()))
}
