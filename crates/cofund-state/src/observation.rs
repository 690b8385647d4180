//! # Observation Escalation
//!
//! A council member raises an observation against a project in execution.
//! The project owner must answer it before a fixed deadline, set once at
//! creation to creation time + [`OBSERVATION_DEADLINE_DAYS`].
//!
//! ## States
//!
//! ```text
//! Pending ──(now > deadline)──▶ Overdue
//!    │                             │
//!    └──────────resolve────────────┴──▶ Resolved (terminal)
//! ```
//!
//! `Pending`/`Overdue` is never advanced by a timer. [`Observation::derive`]
//! takes the current time as a parameter and read paths call
//! [`Observation::escalate`] to store the derived value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cofund_core::{ObservationId, ProjectId, Timestamp, UserId};

/// Days between creation and the response deadline.
pub const OBSERVATION_DEADLINE_DAYS: i64 = 5;

/// The lifecycle state of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationState {
    /// Awaiting a response, deadline not yet passed.
    Pending,
    /// Awaiting a response past the deadline.
    Overdue,
    /// Answered by the project owner (terminal).
    Resolved,
}

impl ObservationState {
    /// Parse the wire spelling (`pending`, `overdue`, `resolved`).
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "overdue" => Some(Self::Overdue),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Overdue => "OVERDUE",
            Self::Resolved => "RESOLVED",
        };
        f.write_str(s)
    }
}

/// Errors from observation transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    #[error("{id} is already resolved")]
    AlreadyResolved { id: ObservationId },

    #[error("invalid observation: {0}")]
    Invalid(String),
}

/// A time-boxed review note raised by a council member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub project_id: ProjectId,
    pub author: UserId,
    pub body: String,
    pub state: ObservationState,
    pub created_at: Timestamp,
    /// Immutable after creation.
    pub deadline: Timestamp,
    pub response: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<Timestamp>,
}

impl Observation {
    /// Raise a new observation; the deadline is fixed here.
    pub fn raise(
        project_id: ProjectId,
        author: UserId,
        body: String,
        now: Timestamp,
    ) -> Result<Self, ObservationError> {
        if body.trim().is_empty() {
            return Err(ObservationError::Invalid("observation body must not be empty".into()));
        }
        Ok(Self {
            id: ObservationId::new(),
            project_id,
            author,
            body,
            state: ObservationState::Pending,
            created_at: now,
            deadline: now.plus_days(OBSERVATION_DEADLINE_DAYS),
            response: None,
            resolved_by: None,
            resolved_at: None,
        })
    }

    /// The state this observation has at `now`.
    pub fn derive(&self, now: Timestamp) -> ObservationState {
        if self.state == ObservationState::Resolved {
            ObservationState::Resolved
        } else if now > self.deadline {
            ObservationState::Overdue
        } else {
            ObservationState::Pending
        }
    }

    /// Store the derived state. Returns `true` if it changed.
    pub fn escalate(&mut self, now: Timestamp) -> bool {
        let next = self.derive(now);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Replace the body text. Deadline, state and resolution are untouched;
    /// a resolved observation is closed to edits.
    pub fn edit(&mut self, body: String) -> Result<(), ObservationError> {
        if self.state == ObservationState::Resolved {
            return Err(ObservationError::AlreadyResolved { id: self.id });
        }
        if body.trim().is_empty() {
            return Err(ObservationError::Invalid("observation body must not be empty".into()));
        }
        self.body = body;
        Ok(())
    }

    /// Answer the observation, from `Pending` or `Overdue`.
    pub fn resolve(
        &mut self,
        by: UserId,
        response: String,
        now: Timestamp,
    ) -> Result<(), ObservationError> {
        if self.state == ObservationState::Resolved {
            return Err(ObservationError::AlreadyResolved { id: self.id });
        }
        if response.trim().is_empty() {
            return Err(ObservationError::Invalid("response must not be empty".into()));
        }
        self.state = ObservationState::Resolved;
        self.response = Some(response);
        self.resolved_by = Some(by);
        self.resolved_at = Some(now);
        Ok(())
    }
}
