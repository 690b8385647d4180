//! # Engine
//!
//! Entry point for every state-changing operation on a project's tree.
//! Operations are grouped by concern in sibling modules and implemented as
//! `impl Engine` blocks:
//!
//! | Module          | Operations |
//! |-----------------|------------|
//! | `projects`      | create/get/delete project, add/list requests, list stages |
//! | `arbitration`   | submit/accept/reject offers, confirm fulfilment, commitments |
//! | `gate`          | start/complete project, start/complete stage |
//! | `escalator`     | raise/get/list/resolve observations |
//!
//! Each mutating operation resolves the owning project, then performs all
//! precondition checks and effects inside a single
//! [`AggregateStore::transact`] call.

use std::sync::Arc;

use uuid::Uuid;

use cofund_core::{Actor, ProjectId, Timestamp};
use cofund_state::Project;

use crate::aggregate::ProjectAggregate;
use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::store::{AggregateStore, MemoryStore};

/// The lifecycle-consistency engine.
pub struct Engine<S = MemoryStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl Engine<MemoryStore> {
    /// An engine over an empty in-memory store and the system clock.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), Arc::new(SystemClock))
    }
}

impl<S: AggregateStore> Engine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Stored snapshot of a project, without read-time derivation.
    pub(crate) fn load(&self, project_id: ProjectId) -> Result<ProjectAggregate, EngineError> {
        self.store
            .load(project_id)
            .ok_or_else(|| EngineError::not_found("project", project_id))
    }

    /// Project owning a child record, or `NotFound` for `entity`.
    pub(crate) fn locate(&self, entity: &'static str, id: Uuid) -> Result<ProjectId, EngineError> {
        self.store
            .locate(id)
            .ok_or_else(|| EngineError::not_found(entity, id))
    }
}

impl<S> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

/// Fail with `Forbidden` unless `actor` owns `project`.
pub(crate) fn require_owner(project: &Project, actor: &Actor) -> Result<(), EngineError> {
    if !project.is_owned_by(actor.id) {
        return Err(EngineError::Forbidden(format!(
            "{} is not the owner of {}",
            actor.id, project.id
        )));
    }
    Ok(())
}
