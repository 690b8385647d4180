//! # Aggregate Store
//!
//! Holds project aggregates and provides the atomic read-modify-write the
//! engine relies on. [`AggregateStore::transact`] runs a closure against
//! the freshly read aggregate while holding that aggregate's lock; the
//! result is committed only if the closure returns `Ok`.
//!
//! [`MemoryStore`] locks per aggregate: transactions on different projects
//! run in parallel, transactions on the same project serialize. The closure
//! works on a copy, so an error anywhere in a cascade discards every change
//! the closure made.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use cofund_core::ProjectId;

use crate::aggregate::ProjectAggregate;
use crate::error::EngineError;

/// Transactional holder of project aggregates.
pub trait AggregateStore: Send + Sync {
    /// Add a new aggregate. Fails if the project id is already present.
    fn insert(&self, aggregate: ProjectAggregate) -> Result<(), EngineError>;

    /// Snapshot of one aggregate.
    fn load(&self, id: ProjectId) -> Option<ProjectAggregate>;

    /// Snapshots of every aggregate.
    fn list(&self) -> Vec<ProjectAggregate>;

    /// The project that owns a child record (stage, request, offer, observation).
    fn locate(&self, child: Uuid) -> Option<ProjectId>;

    /// Remove an aggregate and its whole subtree.
    fn remove(&self, id: ProjectId) -> Option<ProjectAggregate>;

    /// Atomically read, validate, and update one aggregate.
    ///
    /// On `Ok` the modified aggregate replaces the stored one and its
    /// version is incremented. On `Err` nothing changes.
    fn transact<R, F>(&self, id: ProjectId, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut ProjectAggregate) -> Result<R, EngineError>;
}

/// In-memory store with one lock per aggregate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    aggregates: RwLock<HashMap<ProjectId, Arc<Mutex<ProjectAggregate>>>>,
    index: RwLock<HashMap<Uuid, ProjectId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of aggregates held.
    pub fn len(&self) -> usize {
        self.aggregates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reindex(&self, aggregate: &ProjectAggregate) {
        let id = aggregate.project.id;
        let mut index = self.index.write();
        for child in aggregate.child_ids() {
            index.insert(child, id);
        }
    }
}

impl AggregateStore for MemoryStore {
    fn insert(&self, aggregate: ProjectAggregate) -> Result<(), EngineError> {
        let id = aggregate.project.id;
        let mut aggregates = self.aggregates.write();
        if aggregates.contains_key(&id) {
            return Err(EngineError::invalid_state(id, "a new project id", "already stored"));
        }
        self.reindex(&aggregate);
        aggregates.insert(id, Arc::new(Mutex::new(aggregate)));
        Ok(())
    }

    fn load(&self, id: ProjectId) -> Option<ProjectAggregate> {
        let aggregates = self.aggregates.read();
        let cell = aggregates.get(&id)?;
        let snapshot = cell.lock().clone();
        Some(snapshot)
    }

    fn list(&self) -> Vec<ProjectAggregate> {
        self.aggregates
            .read()
            .values()
            .map(|cell| cell.lock().clone())
            .collect()
    }

    fn locate(&self, child: Uuid) -> Option<ProjectId> {
        self.index.read().get(&child).copied()
    }

    fn remove(&self, id: ProjectId) -> Option<ProjectAggregate> {
        let cell = self.aggregates.write().remove(&id)?;
        let aggregate = cell.lock().clone();
        let mut index = self.index.write();
        for child in aggregate.child_ids() {
            index.remove(&child);
        }
        Some(aggregate)
    }

    fn transact<R, F>(&self, id: ProjectId, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut ProjectAggregate) -> Result<R, EngineError>,
    {
        // The map read guard is held for the whole transaction so a
        // concurrent `remove` cannot detach the aggregate mid-write.
        let aggregates = self.aggregates.read();
        let cell = aggregates
            .get(&id)
            .ok_or_else(|| EngineError::not_found("project", id))?;
        let mut guard = cell.lock();

        let mut working = guard.clone();
        let result = f(&mut working)?;
        working.version = guard.version + 1;
        let kept: HashSet<Uuid> = working.child_ids().collect();
        let dropped: Vec<Uuid> = guard.child_ids().filter(|c| !kept.contains(c)).collect();
        if !dropped.is_empty() {
            let mut index = self.index.write();
            for child in dropped {
                index.remove(&child);
            }
        }
        self.reindex(&working);
        *guard = working;
        Ok(result)
    }
}
