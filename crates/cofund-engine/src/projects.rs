//! Project creation, deletion, and request management.
//!
//! New requests always start `Pending`, and their stage is recalculated in
//! the same transaction that adds them.

use tracing::info;

use cofund_core::{Actor, ProjectId, RequestId, StageId};
use cofund_state::{
    CoverageRequest, NewProject, NewRequest, Project, ProjectState, RequestState, Stage,
    StageState,
};

use crate::aggregate::ProjectAggregate;
use crate::engine::{require_owner, Engine};
use crate::error::EngineError;
use crate::escalator::Escalated;
use crate::recalc::recompute_stage;
use crate::store::AggregateStore;

impl<S: AggregateStore> Engine<S> {
    /// Create a project owned by `actor`, with nested stages and requests.
    pub fn create_project(
        &self,
        actor: &Actor,
        input: NewProject,
    ) -> Result<ProjectAggregate, EngineError> {
        input.validate()?;
        let now = self.now();
        let mut agg = ProjectAggregate::new(Project::open(actor.id, &input, now));
        let project_id = agg.project.id;
        for stage_input in input.stages {
            let stage = Stage::open(project_id, &stage_input, now);
            let stage_id = stage.id;
            agg.insert_stage(stage);
            for request in stage_input.requests {
                agg.requests
                    .push(CoverageRequest::open(project_id, stage_id, request, now));
            }
            recompute_stage(&mut agg, stage_id, now)?;
        }
        self.store().insert(agg.clone())?;
        info!(
            project = %project_id,
            owner = %actor.id,
            stages = agg.stages.len(),
            requests = agg.requests.len(),
            "project created"
        );
        Ok(agg)
    }

    /// Snapshot of a project's full tree, with observation states derived
    /// at read time.
    pub fn get_project(&self, project_id: ProjectId) -> Result<ProjectAggregate, EngineError> {
        Ok(self.read_project(project_id)?.value)
    }

    /// Like [`Engine::get_project`], also reporting whether the read wrote
    /// back overdue observations.
    pub fn read_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Escalated<ProjectAggregate>, EngineError> {
        let escalated = self.escalate_project(project_id)?;
        let value = self.load(project_id)?;
        Ok(Escalated { value, escalated })
    }

    /// Delete a project and its whole subtree. Owner only.
    pub fn delete_project(&self, project_id: ProjectId, actor: &Actor) -> Result<(), EngineError> {
        let agg = self.load(project_id)?;
        require_owner(&agg.project, actor)?;
        self.store()
            .remove(project_id)
            .ok_or_else(|| EngineError::not_found("project", project_id))?;
        info!(project = %project_id, "project deleted");
        Ok(())
    }

    /// Add a request to a stage that has not started execution.
    pub fn add_request(
        &self,
        stage_id: StageId,
        actor: &Actor,
        input: NewRequest,
    ) -> Result<CoverageRequest, EngineError> {
        input.validate()?;
        let project_id = self.locate("stage", stage_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let stage_state = agg
                .stage(stage_id)
                .map(|s| s.state)
                .ok_or_else(|| EngineError::not_found("stage", stage_id))?;
            require_owner(&agg.project, actor)?;
            if agg.project.state == ProjectState::Finished {
                return Err(EngineError::invalid_state(
                    project_id,
                    format!("{} or {}", ProjectState::Pending, ProjectState::InExecution),
                    agg.project.state,
                ));
            }
            if !matches!(stage_state, StageState::Pending | StageState::Funded) {
                return Err(EngineError::invalid_state(
                    stage_id,
                    format!("{} or {}", StageState::Pending, StageState::Funded),
                    stage_state,
                ));
            }
            let request = CoverageRequest::open(project_id, stage_id, input, now);
            agg.requests.push(request.clone());
            recompute_stage(agg, stage_id, now)?;
            info!(request = %request.id, stage = %stage_id, kind = %request.kind, "request added");
            Ok(request)
        })
    }

    /// Delete a pending request and its offers. Owner only.
    ///
    /// Committed and completed requests carry an accepted offer and are
    /// refused. The stage is recalculated, so removing the last uncovered
    /// request can fund it.
    pub fn delete_request(&self, request_id: RequestId, actor: &Actor) -> Result<Stage, EngineError> {
        let project_id = self.locate("request", request_id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let request = agg
                .request(request_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("request", request_id))?;
            require_owner(&agg.project, actor)?;
            if request.state != RequestState::Pending {
                return Err(EngineError::invalid_state(
                    request_id,
                    RequestState::Pending,
                    request.state,
                ));
            }
            let stage_state = agg
                .stage(request.stage_id)
                .map(|s| s.state)
                .ok_or_else(|| EngineError::not_found("stage", request.stage_id))?;
            if !matches!(stage_state, StageState::Pending | StageState::Funded) {
                return Err(EngineError::invalid_state(
                    request.stage_id,
                    format!("{} or {}", StageState::Pending, StageState::Funded),
                    stage_state,
                ));
            }
            let before = agg.offers.len();
            agg.offers.retain(|o| o.request_id != request_id);
            let offers_removed = before - agg.offers.len();
            agg.requests.retain(|r| r.id != request_id);
            recompute_stage(agg, request.stage_id, now)?;
            let stage = agg
                .stage(request.stage_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("stage", request.stage_id))?;
            info!(
                request = %request_id,
                stage = %stage.id,
                offers_removed,
                stage_state = %stage.state,
                "request deleted"
            );
            Ok(stage)
        })
    }

    /// One request.
    pub fn get_request(&self, request_id: RequestId) -> Result<CoverageRequest, EngineError> {
        let project_id = self.locate("request", request_id.0)?;
        self.load(project_id)?
            .request(request_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("request", request_id))
    }

    /// Stages of a project, ordered by start date.
    pub fn list_stages(&self, project_id: ProjectId) -> Result<Vec<Stage>, EngineError> {
        Ok(self.load(project_id)?.stages)
    }

    /// Requests of a project in stage order, optionally filtered by state.
    pub fn list_requests(
        &self,
        project_id: ProjectId,
        state: Option<RequestState>,
    ) -> Result<Vec<CoverageRequest>, EngineError> {
        let agg = self.load(project_id)?;
        Ok(agg
            .stages
            .iter()
            .flat_map(|s| agg.requests_of(s.id))
            .filter(|r| state.map_or(true, |st| r.state == st))
            .cloned()
            .collect())
    }
}
