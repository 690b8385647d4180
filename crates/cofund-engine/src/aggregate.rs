//! # Project Aggregate
//!
//! A project's full subtree held as one value: the project record plus
//! flat, id-addressed collections of its stages, requests, offers and
//! observations. Children point at parents by id; nothing points down.
//! This is the unit the store locks and the unit a transaction replaces.
//!
//! Stages are kept sorted by start date. Requests, offers and observations
//! keep insertion order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cofund_core::{ObservationId, OfferId, RequestId, StageId};
use cofund_state::{CoverageRequest, Observation, Offer, Project, RequestState, Stage};

/// A project and everything beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub project: Project,
    pub stages: Vec<Stage>,
    pub requests: Vec<CoverageRequest>,
    pub offers: Vec<Offer>,
    pub observations: Vec<Observation>,
    /// Incremented on every committed transaction.
    pub version: u64,
}

impl ProjectAggregate {
    /// An aggregate with no children.
    pub fn new(project: Project) -> Self {
        Self {
            project,
            stages: Vec::new(),
            requests: Vec::new(),
            offers: Vec::new(),
            observations: Vec::new(),
            version: 0,
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn stage_mut(&mut self, id: StageId) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.id == id)
    }

    pub fn request(&self, id: RequestId) -> Option<&CoverageRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn request_mut(&mut self, id: RequestId) -> Option<&mut CoverageRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    pub fn offer(&self, id: OfferId) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == id)
    }

    pub fn offer_mut(&mut self, id: OfferId) -> Option<&mut Offer> {
        self.offers.iter_mut().find(|o| o.id == id)
    }

    pub fn observation(&self, id: ObservationId) -> Option<&Observation> {
        self.observations.iter().find(|o| o.id == id)
    }

    pub fn observation_mut(&mut self, id: ObservationId) -> Option<&mut Observation> {
        self.observations.iter_mut().find(|o| o.id == id)
    }

    // ── Children ─────────────────────────────────────────────────────

    /// Requests of one stage, in insertion order.
    pub fn requests_of(&self, stage: StageId) -> impl Iterator<Item = &CoverageRequest> {
        self.requests.iter().filter(move |r| r.stage_id == stage)
    }

    /// Offers on one request, in submission order.
    pub fn offers_of(&self, request: RequestId) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(move |o| o.request_id == request)
    }

    /// Current states of a stage's requests: the recalculator's input.
    pub fn request_states_of(&self, stage: StageId) -> Vec<RequestState> {
        self.requests_of(stage).map(|r| r.state).collect()
    }

    /// Ids of every child record, for reverse lookup indexes.
    pub fn child_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.stages
            .iter()
            .map(|s| s.id.0)
            .chain(self.requests.iter().map(|r| r.id.0))
            .chain(self.offers.iter().map(|o| o.id.0))
            .chain(self.observations.iter().map(|o| o.id.0))
    }

    // ── Insertion ────────────────────────────────────────────────────

    /// Insert a stage, keeping stages ordered by start date.
    ///
    /// Stages with equal start dates keep insertion order.
    pub fn insert_stage(&mut self, stage: Stage) {
        let at = self
            .stages
            .iter()
            .position(|s| s.starts_on > stage.starts_on)
            .unwrap_or(self.stages.len());
        self.stages.insert(at, stage);
    }
}
