//! # Engine Errors
//!
//! Every rejected precondition surfaces as an [`EngineError`] carrying the
//! ids and the expected vs. actual state involved. Errors are produced
//! inside the aggregate transaction, so a failed call never leaves a
//! partial cascade behind.

use thiserror::Error;

use cofund_core::{RequestId, UserId};
use cofund_state::{
    ObservationError, OfferError, OfferState, ProjectError, ProjectState, RequestError,
    RequestState, StageError, StageState,
};

use crate::report::BlockingReport;

/// Failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    AlreadyConfirmed,
    AlreadyResolved,
    ValidationFailed,
    Conflict,
}

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unknown id.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The actor lacks ownership or the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A state precondition was violated.
    #[error("{entity} is {actual}, expected {expected}")]
    InvalidState {
        entity: String,
        expected: String,
        actual: String,
    },

    /// Fulfilment was already confirmed for this request.
    #[error("{0} has already been confirmed")]
    AlreadyConfirmed(String),

    #[error("{0} is already resolved")]
    AlreadyResolved(String),

    /// Malformed input.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A bulk check found blocking child records.
    #[error("{0}")]
    Blocked(BlockingReport),

    /// The bidder already holds a pending offer on the request.
    #[error("{bidder} already has a pending offer on {request}")]
    DuplicateOffer { request: RequestId, bidder: UserId },
}

impl EngineError {
    /// Taxonomy kind of this error. `Blocked` is an `InvalidState`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState { .. } | Self::Blocked(_) => ErrorKind::InvalidState,
            Self::AlreadyConfirmed(_) => ErrorKind::AlreadyConfirmed,
            Self::AlreadyResolved(_) => ErrorKind::AlreadyResolved,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::DuplicateOffer { .. } => ErrorKind::Conflict,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_state(
        entity: impl std::fmt::Display,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidState {
            entity: entity.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

// ─── State-machine error conversion ─────────────────────────────────

impl From<RequestError> for EngineError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::InvalidTransition { id, from, to } => {
                let expected = match to {
                    RequestState::Committed => RequestState::Pending,
                    _ => RequestState::Committed,
                };
                Self::invalid_state(id, expected, from)
            }
            RequestError::AlreadyCompleted { id } => Self::AlreadyConfirmed(id.to_string()),
            RequestError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl From<OfferError> for EngineError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::AlreadyDecided { id, state } => {
                Self::invalid_state(id, OfferState::Pending, state)
            }
            OfferError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl From<StageError> for EngineError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::InvalidTransition { id, from, to } => {
                let expected = match to {
                    StageState::InExecution => {
                        format!("{} or {}", StageState::Pending, StageState::Funded)
                    }
                    _ => StageState::InExecution.to_string(),
                };
                Self::invalid_state(id, expected, from)
            }
            StageError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl From<ProjectError> for EngineError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::InvalidTransition { id, from, to } => {
                let expected = match to {
                    ProjectState::InExecution => ProjectState::Pending,
                    _ => ProjectState::InExecution,
                };
                Self::invalid_state(id, expected, from)
            }
            ProjectError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}

impl From<ObservationError> for EngineError {
    fn from(err: ObservationError) -> Self {
        match err {
            ObservationError::AlreadyResolved { id } => Self::AlreadyResolved(id.to_string()),
            ObservationError::Invalid(msg) => Self::ValidationFailed(msg),
        }
    }
}
