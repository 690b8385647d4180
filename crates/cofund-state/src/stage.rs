//! # Stage Lifecycle and Recalculation
//!
//! A stage's state is derived from the states of its requests, except for
//! the two manual steps performed by the project owner.
//!
//! ## States
//!
//! ```text
//!            recalculation                 manual start       manual complete
//! Pending ◀────────────────▶ Funded ─────────────────▶ InExecution ──────────▶ Completed
//!    │                                                                          ▲
//!    └──────────────── recalculation (all requests completed) ──────────────────┘
//! ```
//!
//! ## Recalculation
//!
//! [`derive_stage_state`] is a pure function of the stored state and the
//! child request states:
//!
//! 1. `InExecution` is locked and returned unchanged.
//! 2. Non-empty and every request `Completed` → `Completed`.
//! 3. Non-empty and every request at least `Committed` → `Funded`.
//! 4. Otherwise → `Pending`.
//!
//! A stage with zero requests therefore never advances past `Pending` on
//! its own. If a request ever regressed, recalculation would move a
//! `Completed` stage back to `Funded` or `Pending`; no current operation
//! regresses a request, so that path is unreachable but not special-cased.
//!
//! The completion timestamp is stamped on first entry to `Completed` and
//! never changed or cleared afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cofund_core::{ProjectId, StageId, Timestamp, UserId};

use crate::history::{TransitionRecord, TransitionTrigger};
use crate::request::{NewRequest, RequestState};

// ─── Stage State ─────────────────────────────────────────────────────

/// The lifecycle state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Some request is still uncovered, or the stage has no requests.
    Pending,
    /// Every request is covered by an accepted offer.
    Funded,
    /// Work has been started by the owner.
    InExecution,
    /// Every request fulfilled, or closed manually by the owner.
    Completed,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Funded => "FUNDED",
            Self::InExecution => "IN_EXECUTION",
            Self::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Derive a stage state from its stored state and its requests' states.
pub fn derive_stage_state(stored: StageState, requests: &[RequestState]) -> StageState {
    if stored == StageState::InExecution {
        return StageState::InExecution;
    }
    if requests.is_empty() {
        return StageState::Pending;
    }
    if requests.iter().all(|r| *r == RequestState::Completed) {
        StageState::Completed
    } else if requests.iter().all(RequestState::is_covered) {
        StageState::Funded
    } else {
        StageState::Pending
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from manual stage transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: StageId,
        from: StageState,
        to: StageState,
    },

    /// Creation input failed validation.
    #[error("invalid stage: {0}")]
    Invalid(String),
}

// ─── Creation Input ──────────────────────────────────────────────────

/// Input for creating a stage, with its initial requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub requests: Vec<NewRequest>,
}

impl NewStage {
    /// Check name and date range. Requests are validated separately.
    pub fn validate(&self) -> Result<(), StageError> {
        if self.name.trim().is_empty() {
            return Err(StageError::Invalid("stage name must not be empty".into()));
        }
        if self.ends_on < self.starts_on {
            return Err(StageError::Invalid(format!(
                "stage {:?} ends ({}) before it starts ({})",
                self.name, self.ends_on, self.starts_on
            )));
        }
        Ok(())
    }
}

// ─── Stage ───────────────────────────────────────────────────────────

/// A stage of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub state: StageState,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    /// Set once on first entry to `Completed`; never cleared.
    pub completed_at: Option<Timestamp>,
    pub transitions: Vec<TransitionRecord<StageState>>,
}

impl Stage {
    /// Create a stage in `Pending`. The requests in `input` are not attached.
    pub fn open(project_id: ProjectId, input: &NewStage, now: Timestamp) -> Self {
        Self {
            id: StageId::new(),
            project_id,
            name: input.name.clone(),
            description: input.description.clone(),
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            state: StageState::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            transitions: Vec::new(),
        }
    }

    /// Replace the stored state with the derived one and return it.
    ///
    /// Calling this again with the same request states changes nothing.
    pub fn recompute(&mut self, requests: &[RequestState], now: Timestamp) -> StageState {
        let next = derive_stage_state(self.state, requests);
        if next != self.state {
            self.do_transition(next, TransitionTrigger::Recalculation, None, now);
        }
        next
    }

    /// Manual start (FUNDED, or PENDING with no open requests → IN_EXECUTION).
    ///
    /// Whether the stage's requests allow starting is checked by the caller,
    /// which sees the requests; this only rejects stages already started or
    /// completed.
    pub fn start(&mut self, actor: UserId, now: Timestamp) -> Result<(), StageError> {
        if !matches!(self.state, StageState::Pending | StageState::Funded) {
            return Err(self.invalid(StageState::InExecution));
        }
        self.started_at = Some(now);
        self.do_transition(StageState::InExecution, TransitionTrigger::Manual, Some(actor), now);
        Ok(())
    }

    /// Manual completion (IN_EXECUTION → COMPLETED).
    pub fn complete(&mut self, actor: UserId, now: Timestamp) -> Result<(), StageError> {
        if self.state != StageState::InExecution {
            return Err(self.invalid(StageState::Completed));
        }
        self.do_transition(StageState::Completed, TransitionTrigger::Manual, Some(actor), now);
        Ok(())
    }

    fn invalid(&self, to: StageState) -> StageError {
        StageError::InvalidTransition {
            id: self.id,
            from: self.state,
            to,
        }
    }

    fn do_transition(
        &mut self,
        to: StageState,
        trigger: TransitionTrigger,
        actor: Option<UserId>,
        now: Timestamp,
    ) {
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            at: now,
            trigger,
            actor,
        });
        if to == StageState::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
