//! # Project Gate
//!
//! Manual, owner-gated transitions of projects and stages, each validated
//! against the rest of the aggregate:
//!
//! - `start_project`: every request in every stage must be covered.
//! - `complete_project`: every stage must be completed.
//! - `start_stage`: project in execution, stage not yet started, and no
//!   pending request in the stage.
//! - `complete_stage`: project in execution, stage in execution.
//!
//! Bulk failures return a [`BlockingReport`] listing every offending
//! record. Recalculation never calls into the gate: projects only move when
//! their owner asks.

use tracing::info;

use cofund_core::{Actor, ProjectId, StageId};
use cofund_state::{Project, ProjectState, RequestState, Stage, StageState};

use crate::aggregate::ProjectAggregate;
use crate::engine::{require_owner, Engine};
use crate::error::EngineError;
use crate::report::{BlockingItem, BlockingReport};
use crate::store::AggregateStore;

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Every pending request, in stage order, optionally limited to one stage.
fn pending_requests(agg: &ProjectAggregate, only: Option<StageId>) -> Vec<BlockingItem> {
    agg.stages
        .iter()
        .filter(|s| only.map_or(true, |id| s.id == id))
        .flat_map(|stage| {
            agg.requests_of(stage.id)
                .filter(|r| r.state == RequestState::Pending)
                .map(move |r| BlockingItem::request(&stage.name, r))
        })
        .collect()
}

fn require_in_execution(project: &Project) -> Result<(), EngineError> {
    if project.state != ProjectState::InExecution {
        return Err(EngineError::invalid_state(
            project.id,
            ProjectState::InExecution,
            project.state,
        ));
    }
    Ok(())
}

impl<S: AggregateStore> Engine<S> {
    /// Move a project into execution once every request is covered.
    pub fn start_project(&self, project_id: ProjectId, actor: &Actor) -> Result<Project, EngineError> {
        let now = self.now();
        self.store().transact(project_id, |agg| {
            require_owner(&agg.project, actor)?;
            if agg.project.state != ProjectState::Pending {
                return Err(EngineError::invalid_state(
                    project_id,
                    ProjectState::Pending,
                    agg.project.state,
                ));
            }
            let blocking = pending_requests(agg, None);
            if !blocking.is_empty() {
                return Err(EngineError::Blocked(BlockingReport {
                    message: format!(
                        "cannot start project: {} still pending coverage",
                        plural(blocking.len(), "request is", "requests are")
                    ),
                    blocking,
                }));
            }
            agg.project.start(actor.id, now)?;
            info!(project = %project_id, "project started");
            Ok(agg.project.clone())
        })
    }

    /// Finish a project once every stage is completed.
    pub fn complete_project(
        &self,
        project_id: ProjectId,
        actor: &Actor,
    ) -> Result<Project, EngineError> {
        let now = self.now();
        self.store().transact(project_id, |agg| {
            require_owner(&agg.project, actor)?;
            require_in_execution(&agg.project)?;
            let blocking: Vec<BlockingItem> = agg
                .stages
                .iter()
                .filter(|s| s.state != StageState::Completed)
                .map(BlockingItem::stage)
                .collect();
            if !blocking.is_empty() {
                return Err(EngineError::Blocked(BlockingReport {
                    message: format!(
                        "cannot complete project: {} not completed",
                        plural(blocking.len(), "stage is", "stages are")
                    ),
                    blocking,
                }));
            }
            agg.project.finish(actor.id, now)?;
            info!(project = %project_id, "project finished");
            Ok(agg.project.clone())
        })
    }

    /// Start execution of a stage whose requests are all covered.
    pub fn start_stage(&self, stage_id: StageId, actor: &Actor) -> Result<Stage, EngineError> {
        let project_id = self.locate("stage", stage_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let state = agg
                .stage(stage_id)
                .map(|s| s.state)
                .ok_or_else(|| EngineError::not_found("stage", stage_id))?;
            require_owner(&agg.project, actor)?;
            require_in_execution(&agg.project)?;
            if matches!(state, StageState::InExecution | StageState::Completed) {
                return Err(EngineError::invalid_state(
                    stage_id,
                    format!("{} or {}", StageState::Pending, StageState::Funded),
                    state,
                ));
            }
            let blocking = pending_requests(agg, Some(stage_id));
            if !blocking.is_empty() {
                return Err(EngineError::Blocked(BlockingReport {
                    message: format!(
                        "cannot start stage: {} still pending coverage",
                        plural(blocking.len(), "request is", "requests are")
                    ),
                    blocking,
                }));
            }
            let stage = agg
                .stage_mut(stage_id)
                .ok_or_else(|| EngineError::not_found("stage", stage_id))?;
            stage.start(actor.id, now)?;
            info!(stage = %stage_id, project = %project_id, "stage started");
            Ok(stage.clone())
        })
    }

    /// Close a stage that is in execution.
    pub fn complete_stage(&self, stage_id: StageId, actor: &Actor) -> Result<Stage, EngineError> {
        let project_id = self.locate("stage", stage_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            if agg.stage(stage_id).is_none() {
                return Err(EngineError::not_found("stage", stage_id));
            }
            require_owner(&agg.project, actor)?;
            require_in_execution(&agg.project)?;
            let stage = agg
                .stage_mut(stage_id)
                .ok_or_else(|| EngineError::not_found("stage", stage_id))?;
            stage.complete(actor.id, now)?;
            info!(stage = %stage_id, project = %project_id, "stage completed");
            Ok(stage.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::plural;

    #[test]
    fn pluralizes_counts() {
        assert_eq!(plural(1, "stage is", "stages are"), "1 stage is");
        assert_eq!(plural(3, "stage is", "stages are"), "3 stages are");
    }
}
