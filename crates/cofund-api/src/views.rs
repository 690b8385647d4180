//! # Response Views
//!
//! JSON shapes returned by the HTTP surface. Domain records live in
//! `cofund-state` and `cofund-engine` without OpenAPI derives; these views
//! flatten them into plain UUIDs, RFC 3339 timestamps and upper-case state
//! names (the same spelling blocking reports use).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cofund_core::Timestamp;
use cofund_engine::{AcceptOutcome, Commitment, FulfillmentReceipt, ProjectAggregate};
use cofund_state::{
    CoverageRequest, Observation, Offer, Project, Stage, TransitionRecord, TransitionTrigger,
};

fn at(ts: &Timestamp) -> DateTime<Utc> {
    *ts.as_datetime()
}

fn at_opt(ts: &Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.as_ref().map(at)
}

/// One entry of a stage or project audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionView {
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
    /// `recalculation` or `manual`.
    pub trigger: String,
    pub actor_id: Option<Uuid>,
}

impl<S: std::fmt::Display> From<&TransitionRecord<S>> for TransitionView {
    fn from(record: &TransitionRecord<S>) -> Self {
        Self {
            from: record.from.to_string(),
            to: record.to.to_string(),
            at: at(&record.at),
            trigger: match record.trigger {
                TransitionTrigger::Recalculation => "recalculation",
                TransitionTrigger::Manual => "manual",
            }
            .to_string(),
            actor_id: record.actor.map(|a| a.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub transitions: Vec<TransitionView>,
}

impl From<&Project> for ProjectView {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.0,
            owner_id: p.owner.0,
            title: p.title.clone(),
            description: p.description.clone(),
            state: p.state.to_string(),
            created_at: at(&p.created_at),
            started_at: at_opt(&p.started_at),
            finished_at: at_opt(&p.finished_at),
            transitions: p.transitions.iter().map(TransitionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub transitions: Vec<TransitionView>,
}

impl From<&Stage> for StageView {
    fn from(s: &Stage) -> Self {
        Self {
            id: s.id.0,
            project_id: s.project_id.0,
            name: s.name.clone(),
            description: s.description.clone(),
            starts_on: s.starts_on,
            ends_on: s.ends_on,
            state: s.state.to_string(),
            created_at: at(&s.created_at),
            started_at: at_opt(&s.started_at),
            completed_at: at_opt(&s.completed_at),
            transitions: s.transitions.iter().map(TransitionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub stage_id: Uuid,
    /// economic, materials, labor, transport or equipment.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub committed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&CoverageRequest> for RequestView {
    fn from(r: &CoverageRequest) -> Self {
        Self {
            id: r.id.0,
            project_id: r.project_id.0,
            stage_id: r.stage_id.0,
            kind: r.kind.to_string(),
            description: r.description.clone(),
            amount: r.amount.as_ref().map(|a| a.to_string()),
            currency: r.currency.clone(),
            quantity: r.quantity,
            unit: r.unit.clone(),
            state: r.state.to_string(),
            created_at: at(&r.created_at),
            committed_at: at_opt(&r.committed_at),
            completed_at: at_opt(&r.completed_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OfferView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub stage_id: Uuid,
    pub request_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: Option<String>,
    pub message: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<&Offer> for OfferView {
    fn from(o: &Offer) -> Self {
        Self {
            id: o.id.0,
            project_id: o.project_id.0,
            stage_id: o.stage_id.0,
            request_id: o.request_id.0,
            bidder_id: o.bidder.0,
            amount: o.amount.as_ref().map(|a| a.to_string()),
            message: o.message.clone(),
            state: o.state.to_string(),
            created_at: at(&o.created_at),
            decided_at: at_opt(&o.decided_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObservationView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub response: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<&Observation> for ObservationView {
    fn from(o: &Observation) -> Self {
        Self {
            id: o.id.0,
            project_id: o.project_id.0,
            author_id: o.author.0,
            body: o.body.clone(),
            state: o.state.to_string(),
            created_at: at(&o.created_at),
            deadline: at(&o.deadline),
            response: o.response.clone(),
            resolved_by: o.resolved_by.map(|u| u.0),
            resolved_at: at_opt(&o.resolved_at),
        }
    }
}

/// A project with its stages and requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectTreeView {
    pub project: ProjectView,
    pub stages: Vec<StageView>,
    pub requests: Vec<RequestView>,
    /// Number of committed transactions on this project.
    pub version: u64,
}

impl From<&ProjectAggregate> for ProjectTreeView {
    fn from(agg: &ProjectAggregate) -> Self {
        Self {
            project: ProjectView::from(&agg.project),
            stages: agg.stages.iter().map(StageView::from).collect(),
            requests: agg
                .stages
                .iter()
                .flat_map(|s| agg.requests_of(s.id))
                .map(RequestView::from)
                .collect(),
            version: agg.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AcceptView {
    pub offer: OfferView,
    pub request: RequestView,
    /// Sibling offers rejected by this acceptance.
    pub auto_rejected: Vec<Uuid>,
    pub stage_state: String,
}

impl From<&AcceptOutcome> for AcceptView {
    fn from(o: &AcceptOutcome) -> Self {
        Self {
            offer: OfferView::from(&o.offer),
            request: RequestView::from(&o.request),
            auto_rejected: o.auto_rejected.iter().map(|id| id.0).collect(),
            stage_state: o.stage_state.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptView {
    pub project_id: Uuid,
    pub stage_id: Uuid,
    pub request_id: Uuid,
    pub offer_id: Uuid,
    pub previous_state: String,
    pub new_state: String,
    pub stage_state: String,
    pub confirmed_at: DateTime<Utc>,
}

impl From<&FulfillmentReceipt> for ReceiptView {
    fn from(r: &FulfillmentReceipt) -> Self {
        Self {
            project_id: r.project_id.0,
            stage_id: r.stage_id.0,
            request_id: r.request_id.0,
            offer_id: r.offer_id.0,
            previous_state: r.previous_state.to_string(),
            new_state: r.new_state.to_string(),
            stage_state: r.stage_state.to_string(),
            confirmed_at: at(&r.confirmed_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommitmentView {
    pub project_title: String,
    pub stage_name: String,
    pub offer: OfferView,
    pub request: RequestView,
}

impl From<&Commitment> for CommitmentView {
    fn from(c: &Commitment) -> Self {
        Self {
            project_title: c.project_title.clone(),
            stage_name: c.stage_name.clone(),
            offer: OfferView::from(&c.offer),
            request: RequestView::from(&c.request),
        }
    }
}
