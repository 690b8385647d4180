//! # Project Lifecycle
//!
//! ```text
//! Pending ──start──▶ InExecution ──finish──▶ Finished (terminal)
//! ```
//!
//! Both transitions are manual and owner-gated. The aggregate checks that
//! gate them (every request covered before `start`, every stage completed
//! before `finish`) need the whole tree and live in the engine; this type
//! only guards the project's own state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cofund_core::{ProjectId, Timestamp, UserId};

use crate::history::{TransitionRecord, TransitionTrigger};
use crate::stage::NewStage;

// ─── Project State ───────────────────────────────────────────────────

/// The lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// Collecting offers.
    Pending,
    /// Work under way.
    InExecution,
    /// All stages completed (terminal).
    Finished,
}

impl ProjectState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::InExecution => "IN_EXECUTION",
            Self::Finished => "FINISHED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from project transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ProjectId,
        from: ProjectState,
        to: ProjectState,
    },

    /// Creation input failed validation.
    #[error("invalid project: {0}")]
    Invalid(String),
}

// ─── Creation Input ──────────────────────────────────────────────────

/// Input for creating a project with its nested stages and requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stages: Vec<NewStage>,
}

impl NewProject {
    /// Validate the project, every stage, and every request.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.title.trim().is_empty() {
            return Err(ProjectError::Invalid("project title must not be empty".into()));
        }
        for stage in &self.stages {
            stage
                .validate()
                .map_err(|e| ProjectError::Invalid(e.to_string()))?;
            for request in &stage.requests {
                request
                    .validate()
                    .map_err(|e| ProjectError::Invalid(format!("stage {:?}: {e}", stage.name)))?;
            }
        }
        Ok(())
    }
}

// ─── Project ─────────────────────────────────────────────────────────

/// The aggregate root's own record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub state: ProjectState,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub transitions: Vec<TransitionRecord<ProjectState>>,
}

impl Project {
    /// Create a project in `Pending`. Stages are attached by the caller.
    pub fn open(owner: UserId, input: &NewProject, now: Timestamp) -> Self {
        Self {
            id: ProjectId::new(),
            owner,
            title: input.title.clone(),
            description: input.description.clone(),
            state: ProjectState::Pending,
            created_at: now,
            started_at: None,
            finished_at: None,
            transitions: Vec::new(),
        }
    }

    /// Ownership is reference equality on the owner id.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// PENDING → IN_EXECUTION.
    pub fn start(&mut self, actor: UserId, now: Timestamp) -> Result<(), ProjectError> {
        self.require_state(ProjectState::Pending, ProjectState::InExecution)?;
        self.started_at = Some(now);
        self.do_transition(ProjectState::InExecution, actor, now);
        Ok(())
    }

    /// IN_EXECUTION → FINISHED.
    pub fn finish(&mut self, actor: UserId, now: Timestamp) -> Result<(), ProjectError> {
        self.require_state(ProjectState::InExecution, ProjectState::Finished)?;
        self.finished_at = Some(now);
        self.do_transition(ProjectState::Finished, actor, now);
        Ok(())
    }

    fn require_state(&self, expected: ProjectState, to: ProjectState) -> Result<(), ProjectError> {
        if self.state != expected {
            return Err(ProjectError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: ProjectState, actor: UserId, now: Timestamp) {
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            at: now,
            trigger: TransitionTrigger::Manual,
            actor: Some(actor),
        });
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{NewRequest, RequestKind};
    use chrono::NaiveDate;

    fn input() -> NewProject {
        NewProject {
            title: "Community kitchen".into(),
            description: "Roof and stoves".into(),
            stages: vec![NewStage {
                name: "Roof".into(),
                description: String::new(),
                starts_on: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                ends_on: NaiveDate::from_ymd_opt(2026, 5, 31).unwrap(),
                requests: vec![NewRequest {
                    kind: RequestKind::Labor,
                    description: "Two roofers".into(),
                    amount: None,
                    currency: None,
                    quantity: Some(2),
                    unit: Some("person".into()),
                }],
            }],
        }
    }

    #[test]
    fn lifecycle() {
        let owner = UserId::new();
        let mut p = Project::open(owner, &input(), Timestamp::now());
        assert!(p.is_owned_by(owner));
        assert!(!p.is_owned_by(UserId::new()));

        p.start(owner, Timestamp::now()).unwrap();
        assert_eq!(p.state, ProjectState::InExecution);
        assert!(p.started_at.is_some());

        p.finish(owner, Timestamp::now()).unwrap();
        assert!(p.state.is_terminal());
        assert_eq!(p.transitions.len(), 2);
    }

    #[test]
    fn cannot_finish_pending_or_restart() {
        let owner = UserId::new();
        let mut p = Project::open(owner, &input(), Timestamp::now());
        assert!(matches!(
            p.finish(owner, Timestamp::now()),
            Err(ProjectError::InvalidTransition { from: ProjectState::Pending, .. })
        ));
        p.start(owner, Timestamp::now()).unwrap();
        assert!(p.start(owner, Timestamp::now()).is_err());
    }

    #[test]
    fn validation_walks_the_tree() {
        assert!(input().validate().is_ok());

        let mut untitled = input();
        untitled.title = String::new();
        assert!(untitled.validate().is_err());

        let mut bad_request = input();
        bad_request.stages[0].requests[0].quantity = None;
        let err = bad_request.validate().unwrap_err().to_string();
        assert!(err.contains("Roof"), "{err}");
    }
}
