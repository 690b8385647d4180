//! # Observation Escalator
//!
//! Council observations move from `Pending` to `Overdue` purely as a
//! function of time. There is no timer: every read derives the current
//! state, and if any observation crossed its deadline since it was last
//! stored, the derived value is written back in one transaction.
//! Resolution escalates first, so it always starts from the current state.

use serde::{Deserialize, Serialize};
use tracing::info;

use cofund_core::{Actor, ObservationId, ProjectId, Timestamp};
use cofund_state::{Observation, ObservationState, ProjectState};

use crate::aggregate::ProjectAggregate;
use crate::engine::{require_owner, Engine};
use crate::error::EngineError;
use crate::store::AggregateStore;

/// A read result, with whether the read escalated stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalated<T> {
    pub value: T,
    /// `true` if at least one observation was written back as overdue.
    pub escalated: bool,
}

fn escalate_all(agg: &mut ProjectAggregate, now: Timestamp) -> usize {
    let mut changed = 0;
    for obs in agg.observations.iter_mut() {
        if obs.escalate(now) {
            info!(observation = %obs.id, state = %obs.state, "observation escalated");
            changed += 1;
        }
    }
    changed
}

impl<S: AggregateStore> Engine<S> {
    /// Raise an observation on a project in execution. Council only.
    pub fn raise_observation(
        &self,
        project_id: ProjectId,
        actor: &Actor,
        body: String,
    ) -> Result<Observation, EngineError> {
        if !actor.role.is_council() {
            return Err(EngineError::Forbidden(
                "only council members may raise observations".into(),
            ));
        }
        let now = self.now();
        self.store().transact(project_id, |agg| {
            if agg.project.state != ProjectState::InExecution {
                return Err(EngineError::invalid_state(
                    project_id,
                    ProjectState::InExecution,
                    agg.project.state,
                ));
            }
            let obs = Observation::raise(project_id, actor.id, body, now)?;
            info!(observation = %obs.id, project = %project_id, deadline = %obs.deadline, "observation raised");
            agg.observations.push(obs.clone());
            Ok(obs)
        })
    }

    /// One observation, with its state derived at read time.
    pub fn get_observation(&self, id: ObservationId) -> Result<Escalated<Observation>, EngineError> {
        let project_id = self.locate("observation", id.0)?;
        let escalated = self.escalate_project(project_id)?;
        let agg = self.load(project_id)?;
        let value = agg
            .observation(id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("observation", id))?;
        Ok(Escalated { value, escalated })
    }

    /// Observations of a project, newest first, optionally filtered by state.
    pub fn list_observations(
        &self,
        project_id: ProjectId,
        state: Option<ObservationState>,
    ) -> Result<Escalated<Vec<Observation>>, EngineError> {
        let escalated = self.escalate_project(project_id)?;
        let agg = self.load(project_id)?;
        let mut value: Vec<Observation> = agg
            .observations
            .into_iter()
            .filter(|o| state.map_or(true, |s| o.state == s))
            .collect();
        value.reverse();
        Ok(Escalated { value, escalated })
    }

    /// Edit an observation's text. Its council author or the project owner
    /// only. The deadline never moves.
    pub fn update_observation(
        &self,
        id: ObservationId,
        actor: &Actor,
        body: String,
    ) -> Result<Observation, EngineError> {
        let project_id = self.locate("observation", id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            let author = agg
                .observation(id)
                .map(|o| o.author)
                .ok_or_else(|| EngineError::not_found("observation", id))?;
            if author != actor.id && !agg.project.is_owned_by(actor.id) {
                return Err(EngineError::Forbidden(format!(
                    "{} is neither the author of {id} nor the project owner",
                    actor.id
                )));
            }
            escalate_all(agg, now);
            let obs = agg
                .observation_mut(id)
                .ok_or_else(|| EngineError::not_found("observation", id))?;
            obs.edit(body)?;
            info!(observation = %id, by = %actor.id, "observation updated");
            Ok(obs.clone())
        })
    }

    /// Answer an observation. Project owner only; allowed from `Pending`
    /// or `Overdue`.
    pub fn resolve_observation(
        &self,
        id: ObservationId,
        actor: &Actor,
        response: String,
    ) -> Result<Observation, EngineError> {
        let project_id = self.locate("observation", id.0)?;
        let now = self.now();
        self.store().transact(project_id, |agg| {
            if agg.observation(id).is_none() {
                return Err(EngineError::not_found("observation", id));
            }
            require_owner(&agg.project, actor)?;
            escalate_all(agg, now);
            let obs = agg
                .observation_mut(id)
                .ok_or_else(|| EngineError::not_found("observation", id))?;
            let from = obs.state;
            obs.resolve(actor.id, response, now)?;
            info!(observation = %id, from = %from, "observation resolved");
            Ok(obs.clone())
        })
    }

    /// Write back derived observation states if any changed.
    ///
    /// Reads a snapshot first and only opens a transaction when the
    /// derivation differs from what is stored.
    pub(crate) fn escalate_project(&self, project_id: ProjectId) -> Result<bool, EngineError> {
        let now = self.now();
        let snapshot = self.load(project_id)?;
        let due = snapshot.observations.iter().any(|o| o.derive(now) != o.state);
        if !due {
            return Ok(false);
        }
        let changed = self
            .store()
            .transact(project_id, |agg| Ok(escalate_all(agg, now)))?;
        Ok(changed > 0)
    }
}
