//! # Offer Arbitration
//!
//! Accepting an offer is a single atomic unit against its request: the
//! chosen offer becomes `Accepted`, every other pending offer on the same
//! request becomes `Rejected`, the request is committed and its stage is
//! recalculated. Because the request's `Pending` state is re-checked under
//! the aggregate lock, two concurrent accepts on sibling offers cannot both
//! succeed; the later one sees a decided offer or a committed request and
//! fails with `InvalidState`.
//!
//! Rejecting an offer touches only that offer.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cofund_core::{Actor, OfferId, ProjectId, RequestId, StageId, Timestamp};
use cofund_state::{
    CoverageRequest, NewOffer, Offer, OfferState, RequestState, StageState,
};

use crate::engine::{require_owner, Engine};
use crate::error::EngineError;
use crate::lifecycle;
use crate::store::AggregateStore;

/// Result of a successful `accept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    pub offer: Offer,
    pub request: CoverageRequest,
    /// Sibling offers rejected by this acceptance.
    pub auto_rejected: Vec<OfferId>,
    pub stage_state: StageState,
}

/// Result of a successful `confirm_fulfillment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentReceipt {
    pub project_id: ProjectId,
    pub stage_id: StageId,
    pub request_id: RequestId,
    pub offer_id: OfferId,
    pub previous_state: RequestState,
    pub new_state: RequestState,
    pub stage_state: StageState,
    pub confirmed_at: Timestamp,
}

/// An accepted offer together with the request it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub project_title: String,
    pub stage_name: String,
    pub offer: Offer,
    pub request: CoverageRequest,
}

impl<S: AggregateStore> Engine<S> {
    /// Submit an offer against a pending request.
    ///
    /// The project owner cannot bid, and a bidder may hold only one pending
    /// offer per request.
    pub fn submit_offer(
        &self,
        request_id: RequestId,
        actor: &Actor,
        input: NewOffer,
    ) -> Result<Offer, EngineError> {
        input.validate()?;
        let project_id = self.locate("request", request_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let request = agg
                .request(request_id)
                .ok_or_else(|| EngineError::not_found("request", request_id))?;
            if agg.project.is_owned_by(actor.id) {
                return Err(EngineError::Forbidden(
                    "project owners cannot bid on their own requests".into(),
                ));
            }
            if request.state != RequestState::Pending {
                return Err(EngineError::invalid_state(
                    request_id,
                    RequestState::Pending,
                    request.state,
                ));
            }
            if agg
                .offers_of(request_id)
                .any(|o| o.bidder == actor.id && o.is_pending())
            {
                return Err(EngineError::DuplicateOffer {
                    request: request_id,
                    bidder: actor.id,
                });
            }
            let offer = Offer::submit(
                agg.project.id,
                request.stage_id,
                request_id,
                actor.id,
                input,
                now,
            );
            info!(offer = %offer.id, request = %request_id, bidder = %actor.id, "offer submitted");
            agg.offers.push(offer.clone());
            Ok(offer)
        })
    }

    /// Accept an offer: the single winner for its request.
    pub fn accept(&self, offer_id: OfferId, actor: &Actor) -> Result<AcceptOutcome, EngineError> {
        let project_id = self.locate("offer", offer_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let offer = agg
                .offer(offer_id)
                .ok_or_else(|| EngineError::not_found("offer", offer_id))?;
            require_owner(&agg.project, actor)?;
            if !offer.is_pending() {
                warn!(offer = %offer_id, state = %offer.state, "accept on decided offer");
                return Err(EngineError::invalid_state(offer_id, OfferState::Pending, offer.state));
            }
            let request_id = offer.request_id;
            let request = agg
                .request(request_id)
                .ok_or_else(|| EngineError::not_found("request", request_id))?;
            if request.state != RequestState::Pending {
                warn!(offer = %offer_id, request = %request_id, state = %request.state, "accept on covered request");
                return Err(EngineError::invalid_state(
                    request_id,
                    RequestState::Pending,
                    request.state,
                ));
            }

            let mut auto_rejected = Vec::new();
            for o in agg.offers.iter_mut().filter(|o| o.request_id == request_id) {
                if o.id == offer_id {
                    o.accept(now)?;
                } else if o.is_pending() {
                    o.reject(now)?;
                    auto_rejected.push(o.id);
                }
            }
            let stage_state = lifecycle::commit(agg, request_id, now)?;
            info!(
                offer = %offer_id,
                request = %request_id,
                auto_rejected = auto_rejected.len(),
                stage_state = %stage_state,
                "offer accepted"
            );

            let offer = agg
                .offer(offer_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("offer", offer_id))?;
            let request = agg
                .request(request_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("request", request_id))?;
            Ok(AcceptOutcome {
                offer,
                request,
                auto_rejected,
                stage_state,
            })
        })
    }

    /// Reject one pending offer. Siblings, request and stage are untouched.
    pub fn reject(&self, offer_id: OfferId, actor: &Actor) -> Result<Offer, EngineError> {
        let project_id = self.locate("offer", offer_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            if agg.offer(offer_id).is_none() {
                return Err(EngineError::not_found("offer", offer_id));
            }
            require_owner(&agg.project, actor)?;
            let offer = agg
                .offer_mut(offer_id)
                .ok_or_else(|| EngineError::not_found("offer", offer_id))?;
            offer.reject(now)?;
            info!(offer = %offer_id, "offer rejected");
            Ok(offer.clone())
        })
    }

    /// The winning bidder confirms the request has been fulfilled.
    pub fn confirm_fulfillment(
        &self,
        offer_id: OfferId,
        actor: &Actor,
    ) -> Result<FulfillmentReceipt, EngineError> {
        let project_id = self.locate("offer", offer_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let offer = agg
                .offer(offer_id)
                .ok_or_else(|| EngineError::not_found("offer", offer_id))?;
            if offer.bidder != actor.id {
                return Err(EngineError::Forbidden(format!(
                    "only the bidder of {offer_id} may confirm fulfilment"
                )));
            }
            if offer.state != OfferState::Accepted {
                return Err(EngineError::invalid_state(offer_id, OfferState::Accepted, offer.state));
            }
            let (request_id, stage_id) = (offer.request_id, offer.stage_id);
            let (previous_state, stage_state) = lifecycle::complete(agg, request_id, now)?;
            info!(offer = %offer_id, request = %request_id, stage_state = %stage_state, "fulfilment confirmed");
            Ok(FulfillmentReceipt {
                project_id: agg.project.id,
                stage_id,
                request_id,
                offer_id,
                previous_state,
                new_state: RequestState::Completed,
                stage_state,
                confirmed_at: now,
            })
        })
    }

    /// Offers on a request, newest first.
    ///
    /// The owner sees every offer; anyone else sees only their own.
    pub fn list_offers(&self, request_id: RequestId, actor: &Actor) -> Result<Vec<Offer>, EngineError> {
        let project_id = self.locate("request", request_id.0)?;
        let agg = self
            .store()
            .load(project_id)
            .ok_or_else(|| EngineError::not_found("project", project_id))?;
        if agg.request(request_id).is_none() {
            return Err(EngineError::not_found("request", request_id));
        }
        let owner = agg.project.is_owned_by(actor.id);
        let mut offers: Vec<Offer> = agg
            .offers_of(request_id)
            .filter(|o| owner || o.bidder == actor.id)
            .cloned()
            .collect();
        offers.reverse();
        Ok(offers)
    }

    /// Every accepted offer made by `actor`, across projects.
    pub fn my_commitments(
        &self,
        actor: &Actor,
        request_state: Option<RequestState>,
    ) -> Vec<Commitment> {
        let mut out = Vec::new();
        for agg in self.store().list() {
            for offer in agg
                .offers
                .iter()
                .filter(|o| o.bidder == actor.id && o.state == OfferState::Accepted)
            {
                let Some(request) = agg.request(offer.request_id) else {
                    continue;
                };
                if request_state.is_some_and(|s| s != request.state) {
                    continue;
                }
                let stage_name = agg
                    .stage(offer.stage_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                out.push(Commitment {
                    project_title: agg.project.title.clone(),
                    stage_name,
                    offer: offer.clone(),
                    request: request.clone(),
                });
            }
        }
        out.sort_by(|a, b| b.offer.created_at.cmp(&a.offer.created_at));
        out
    }
}
