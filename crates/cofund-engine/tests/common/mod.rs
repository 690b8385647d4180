//! Shared fixture for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use cofund_core::{Actor, Amount, OfferId, RequestId, StageId, Timestamp, UserId};
use cofund_engine::{AggregateStore, Engine, ManualClock, MemoryStore, ProjectAggregate};
use cofund_state::{NewOffer, NewProject, NewRequest, NewStage, RequestKind};

pub struct Fixture {
    pub engine: Engine,
    pub clock: Arc<ManualClock>,
    pub owner: Actor,
    pub project: ProjectAggregate,
}

pub fn t0() -> Timestamp {
    Timestamp::parse("2026-03-01T12:00:00Z").unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

pub fn materials(description: &str, quantity: u32) -> NewRequest {
    NewRequest {
        kind: RequestKind::Materials,
        description: description.into(),
        amount: None,
        currency: None,
        quantity: Some(quantity),
        unit: Some("unit".into()),
    }
}

pub fn economic(description: &str, amount: &str) -> NewRequest {
    NewRequest {
        kind: RequestKind::Economic,
        description: description.into(),
        amount: Some(Amount::parse(amount).unwrap()),
        currency: Some("ARS".into()),
        quantity: None,
        unit: None,
    }
}

/// "Community center": Foundations (cement, mason wages), Walls (bricks),
/// Paint (no requests). Stages are given out of date order on purpose.
pub fn community_center() -> NewProject {
    NewProject {
        title: "Community center".into(),
        description: "Rebuild the neighbourhood hall".into(),
        stages: vec![
            NewStage {
                name: "Walls".into(),
                description: "Raise the walls".into(),
                starts_on: date(5, 1),
                ends_on: date(6, 30),
                requests: vec![materials("Bricks", 2000)],
            },
            NewStage {
                name: "Foundations".into(),
                description: "Pour the slab".into(),
                starts_on: date(3, 1),
                ends_on: date(4, 15),
                requests: vec![materials("Cement", 40), economic("Mason wages", "250000.00")],
            },
            NewStage {
                name: "Paint".into(),
                description: String::new(),
                starts_on: date(7, 1),
                ends_on: date(7, 15),
                requests: vec![],
            },
        ],
    }
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = Engine::new(MemoryStore::new(), clock.clone());
        let owner = Actor::member(UserId::new());
        let project = engine.create_project(&owner, community_center()).unwrap();
        Self {
            engine,
            clock,
            owner,
            project,
        }
    }

    /// Stored state, without read-time escalation.
    pub fn snapshot(&self) -> ProjectAggregate {
        self.engine.store().load(self.project.project.id).unwrap()
    }

    pub fn stage(&self, name: &str) -> StageId {
        self.project
            .stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .unwrap()
    }

    pub fn request(&self, description: &str) -> RequestId {
        self.snapshot()
            .requests
            .iter()
            .find(|r| r.description == description)
            .map(|r| r.id)
            .unwrap()
    }

    pub fn bid(&self, request: RequestId, bidder: &Actor) -> OfferId {
        self.engine
            .submit_offer(request, bidder, NewOffer::default())
            .unwrap()
            .id
    }

    /// Bid by a fresh member and accept; returns the bidder and offer.
    pub fn cover(&self, description: &str) -> (Actor, OfferId) {
        let bidder = Actor::member(UserId::new());
        let offer = self.bid(self.request(description), &bidder);
        self.engine.accept(offer, &self.owner).unwrap();
        (bidder, offer)
    }

    /// Cover and confirm a request.
    pub fn fulfil(&self, description: &str) {
        let (bidder, offer) = self.cover(description);
        self.engine.confirm_fulfillment(offer, &bidder).unwrap();
    }
}
