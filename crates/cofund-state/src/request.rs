//! # Coverage Request Lifecycle
//!
//! A coverage request is a typed need within a stage (money, materials,
//! labour, transport, equipment) that must be covered by exactly one
//! accepted offer.
//!
//! ## States
//!
//! ```text
//! Pending ──accept──▶ Committed ──confirm──▶ Completed
//! ```
//!
//! Transitions are strictly forward. `commit` is driven by offer
//! acceptance and `complete` by fulfilment confirmation; no other entry
//! point mutates request state. A second `complete` on an already
//! completed request reports [`RequestError::AlreadyCompleted`] rather than
//! a generic transition failure so callers can treat confirmation as
//! idempotent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cofund_core::{Amount, ProjectId, RequestId, StageId, Timestamp};

// ─── Request State ───────────────────────────────────────────────────

/// The lifecycle state of a coverage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Open for offers.
    Pending,
    /// An offer has been accepted; fulfilment outstanding.
    Committed,
    /// The bidder confirmed fulfilment (terminal).
    Completed,
}

impl RequestState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether an offer has been accepted (Committed or Completed).
    pub fn is_covered(&self) -> bool {
        matches!(self, Self::Committed | Self::Completed)
    }

    /// Parse the wire spelling (`pending`, `committed`, `completed`).
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "committed" => Some(Self::Committed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Committed => "COMMITTED",
            Self::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

// ─── Request Kind ────────────────────────────────────────────────────

/// What a request asks for. Determines which quantity fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Money: requires `amount` and `currency`.
    Economic,
    Materials,
    Labor,
    Transport,
    Equipment,
}

impl RequestKind {
    /// Whether this kind is measured in money rather than units.
    pub fn is_monetary(&self) -> bool {
        matches!(self, Self::Economic)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Economic => "economic",
            Self::Materials => "materials",
            Self::Labor => "labor",
            Self::Transport => "transport",
            Self::Equipment => "equipment",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during request lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: RequestId,
        from: RequestState,
        to: RequestState,
    },

    /// Fulfilment has already been confirmed.
    #[error("{id} is already completed")]
    AlreadyCompleted { id: RequestId },

    /// Creation input failed validation.
    #[error("invalid request: {0}")]
    Invalid(String),
}

// ─── Creation Input ──────────────────────────────────────────────────

/// Input for creating a coverage request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub description: String,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl NewRequest {
    /// Check that the fields required by `kind` are present and sane.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.description.trim().is_empty() {
            return Err(RequestError::Invalid("description must not be empty".into()));
        }
        if self.kind.is_monetary() {
            match &self.amount {
                None => return Err(RequestError::Invalid("economic requests need an amount".into())),
                Some(a) if a.is_zero() => {
                    return Err(RequestError::Invalid("amount must be greater than zero".into()))
                }
                Some(_) => {}
            }
            if self.currency.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err(RequestError::Invalid("economic requests need a currency".into()));
            }
        } else {
            match self.quantity {
                None | Some(0) => {
                    return Err(RequestError::Invalid(format!(
                        "{} requests need a positive quantity",
                        self.kind
                    )))
                }
                Some(_) => {}
            }
            if self.unit.as_deref().map_or(true, |u| u.trim().is_empty()) {
                return Err(RequestError::Invalid(format!(
                    "{} requests need a unit",
                    self.kind
                )));
            }
        }
        Ok(())
    }
}

// ─── Coverage Request ────────────────────────────────────────────────

/// A coverage request with its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRequest {
    pub id: RequestId,
    pub project_id: ProjectId,
    pub stage_id: StageId,
    pub kind: RequestKind,
    pub description: String,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub state: RequestState,
    pub created_at: Timestamp,
    /// When an offer was accepted.
    pub committed_at: Option<Timestamp>,
    /// When fulfilment was confirmed.
    pub completed_at: Option<Timestamp>,
}

impl CoverageRequest {
    /// Open a new request in `Pending`. Input must already be validated.
    pub fn open(project_id: ProjectId, stage_id: StageId, input: NewRequest, now: Timestamp) -> Self {
        Self {
            id: RequestId::new(),
            project_id,
            stage_id,
            kind: input.kind,
            description: input.description,
            amount: input.amount,
            currency: input.currency,
            quantity: input.quantity,
            unit: input.unit,
            state: RequestState::Pending,
            created_at: now,
            committed_at: None,
            completed_at: None,
        }
    }

    /// An offer was accepted (PENDING → COMMITTED).
    pub fn commit(&mut self, now: Timestamp) -> Result<(), RequestError> {
        self.require_state(RequestState::Pending, RequestState::Committed)?;
        self.state = RequestState::Committed;
        self.committed_at = Some(now);
        Ok(())
    }

    /// Fulfilment confirmed (COMMITTED → COMPLETED).
    pub fn complete(&mut self, now: Timestamp) -> Result<(), RequestError> {
        if self.state == RequestState::Completed {
            return Err(RequestError::AlreadyCompleted { id: self.id });
        }
        self.require_state(RequestState::Committed, RequestState::Completed)?;
        self.state = RequestState::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    fn require_state(&self, expected: RequestState, to: RequestState) -> Result<(), RequestError> {
        if self.state != expected {
            return Err(RequestError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
