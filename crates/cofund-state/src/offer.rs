//! # Offer Lifecycle
//!
//! ```text
//! Pending ──▶ Accepted (terminal)
//!    │
//!    └──────▶ Rejected (terminal)
//! ```
//!
//! An offer is decided exactly once. The one-winner-per-request rule is
//! enforced by the engine, which accepts one offer and rejects its pending
//! siblings in the same transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cofund_core::{Amount, OfferId, ProjectId, RequestId, StageId, Timestamp, UserId};

// ─── Offer State ─────────────────────────────────────────────────────

/// The lifecycle state of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferState {
    /// Awaiting the project owner's decision.
    Pending,
    /// Chosen as the request's single winner (terminal).
    Accepted,
    /// Declined, explicitly or because a sibling won (terminal).
    Rejected,
}

impl OfferState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OfferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during offer transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferError {
    /// The offer has already been decided.
    #[error("{id} is already {state}")]
    AlreadyDecided { id: OfferId, state: OfferState },

    /// The offer input failed validation.
    #[error("invalid offer: {0}")]
    Invalid(String),
}

// ─── Offer ───────────────────────────────────────────────────────────

/// Input for submitting an offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffer {
    /// Proposed amount, when the bidder quotes one.
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewOffer {
    /// A quoted amount must be greater than zero.
    pub fn validate(&self) -> Result<(), OfferError> {
        match &self.amount {
            Some(a) if a.is_zero() => Err(OfferError::Invalid(
                "offered amount must be greater than zero".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// A bid made by a non-owner against a coverage request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub project_id: ProjectId,
    pub stage_id: StageId,
    pub request_id: RequestId,
    pub bidder: UserId,
    pub amount: Option<Amount>,
    pub message: Option<String>,
    pub state: OfferState,
    pub created_at: Timestamp,
    /// When the offer was accepted or rejected.
    pub decided_at: Option<Timestamp>,
}

impl Offer {
    /// Submit a new offer in `Pending`.
    pub fn submit(
        project_id: ProjectId,
        stage_id: StageId,
        request_id: RequestId,
        bidder: UserId,
        input: NewOffer,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OfferId::new(),
            project_id,
            stage_id,
            request_id,
            bidder,
            amount: input.amount,
            message: input.message,
            state: OfferState::Pending,
            created_at: now,
            decided_at: None,
        }
    }

    /// PENDING → ACCEPTED.
    pub fn accept(&mut self, now: Timestamp) -> Result<(), OfferError> {
        self.decide(OfferState::Accepted, now)
    }

    /// PENDING → REJECTED.
    pub fn reject(&mut self, now: Timestamp) -> Result<(), OfferError> {
        self.decide(OfferState::Rejected, now)
    }

    /// Whether this offer is still awaiting a decision.
    pub fn is_pending(&self) -> bool {
        self.state == OfferState::Pending
    }

    fn decide(&mut self, to: OfferState, now: Timestamp) -> Result<(), OfferError> {
        if self.state.is_terminal() {
            return Err(OfferError::AlreadyDecided {
                id: self.id,
                state: self.state,
            });
        }
        self.state = to;
        self.decided_at = Some(now);
        Ok(())
    }
}
