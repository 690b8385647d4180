//! Project gate: manual project and stage transitions.

mod common;

use common::{materials, Fixture};
use cofund_core::{Actor, UserId};
use cofund_engine::{EngineError, ErrorKind};
use cofund_state::{ProjectState, StageState};

fn blocking_ids(err: &EngineError) -> Vec<String> {
    match err {
        EngineError::Blocked(report) => report.blocking.iter().map(|b| b.id.clone()).collect(),
        other => panic!("expected a blocking report, got {other:?}"),
    }
}

#[test]
fn start_lists_every_pending_request_in_stage_order() {
    let fx = Fixture::new();
    fx.cover("Cement");
    let err = fx
        .engine
        .start_project(fx.project.project.id, &fx.owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let EngineError::Blocked(report) = &err else {
        panic!("expected Blocked, got {err:?}");
    };
    assert_eq!(report.blocking.len(), 2);
    assert_eq!(report.blocking[0].context, "Foundations");
    assert_eq!(report.blocking[0].description, "Mason wages");
    assert_eq!(report.blocking[0].item_type, "economic");
    assert_eq!(report.blocking[0].state, "PENDING");
    assert_eq!(report.blocking[1].context, "Walls");
    assert_eq!(report.blocking[1].description, "Bricks");
    assert!(report.message.contains("2 requests are"), "{}", report.message);

    assert_eq!(fx.snapshot().project.state, ProjectState::Pending);
}

#[test]
fn start_succeeds_when_every_request_is_covered() {
    let fx = Fixture::new();
    fx.cover("Cement");
    fx.fulfil("Mason wages");
    fx.cover("Bricks");
    let project = fx
        .engine
        .start_project(fx.project.project.id, &fx.owner)
        .unwrap();
    assert_eq!(project.state, ProjectState::InExecution);
    assert!(project.started_at.is_some());

    let err = fx
        .engine
        .start_project(fx.project.project.id, &fx.owner)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[test]
fn start_is_owner_only() {
    let fx = Fixture::new();
    let err = fx
        .engine
        .start_project(fx.project.project.id, &Actor::member(UserId::new()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn stage_transitions_require_project_in_execution() {
    let fx = Fixture::new();
    let paint = fx.stage("Paint");
    let err = fx.engine.start_stage(paint, &fx.owner).unwrap_err();
    assert!(
        matches!(err, EngineError::InvalidState { ref expected, .. } if expected == "IN_EXECUTION")
    );
    let err = fx.engine.complete_stage(paint, &fx.owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn full_project_lifecycle() {
    let fx = Fixture::new();
    let project_id = fx.project.project.id;
    let foundations = fx.stage("Foundations");
    let walls = fx.stage("Walls");
    let paint = fx.stage("Paint");

    fx.fulfil("Cement");
    fx.fulfil("Mason wages");
    let (bricks_bidder, bricks_offer) = fx.cover("Bricks");
    fx.engine.start_project(project_id, &fx.owner).unwrap();

    // Foundations auto-completed when its last request was fulfilled.
    let err = fx.engine.start_stage(foundations, &fx.owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Walls is funded: start it, and confirmation no longer moves it.
    let stage = fx.engine.start_stage(walls, &fx.owner).unwrap();
    assert_eq!(stage.state, StageState::InExecution);
    fx.engine
        .confirm_fulfillment(bricks_offer, &bricks_bidder)
        .unwrap();
    assert_eq!(fx.snapshot().stage(walls).unwrap().state, StageState::InExecution);

    // Paint has no requests: it can be started and completed by hand.
    fx.engine.start_stage(paint, &fx.owner).unwrap();

    let err = fx.engine.complete_project(project_id, &fx.owner).unwrap_err();
    let blocked = blocking_ids(&err);
    assert_eq!(blocked.len(), 2);
    assert!(blocked.contains(&walls.as_uuid().to_string()));
    assert!(blocked.contains(&paint.as_uuid().to_string()));

    fx.clock.advance_days(1);
    let done = fx.engine.complete_stage(walls, &fx.owner).unwrap();
    assert_eq!(done.state, StageState::Completed);
    assert!(done.completed_at.is_some());
    fx.engine.complete_stage(paint, &fx.owner).unwrap();

    let project = fx.engine.complete_project(project_id, &fx.owner).unwrap();
    assert_eq!(project.state, ProjectState::Finished);
    assert_eq!(project.transitions.len(), 2);
}

#[test]
fn start_stage_reports_pending_requests_of_that_stage_only() {
    let fx = Fixture::new();
    let project_id = fx.project.project.id;
    let walls = fx.stage("Walls");
    fx.cover("Cement");
    fx.cover("Mason wages");
    fx.cover("Bricks");
    fx.engine.start_project(project_id, &fx.owner).unwrap();

    // A new need added to Walls after the project started.
    let scaffold = fx
        .engine
        .add_request(walls, &fx.owner, materials("Scaffolding", 6))
        .unwrap();
    assert_eq!(fx.snapshot().stage(walls).unwrap().state, StageState::Pending);

    let err = fx.engine.start_stage(walls, &fx.owner).unwrap_err();
    assert_eq!(blocking_ids(&err), vec![scaffold.id.as_uuid().to_string()]);
}

#[test]
fn complete_stage_requires_in_execution() {
    let fx = Fixture::new();
    let project_id = fx.project.project.id;
    let walls = fx.stage("Walls");
    fx.cover("Cement");
    fx.cover("Mason wages");
    fx.cover("Bricks");
    fx.engine.start_project(project_id, &fx.owner).unwrap();

    let err = fx.engine.complete_stage(walls, &fx.owner).unwrap_err();
    assert!(
        matches!(err, EngineError::InvalidState { ref actual, .. } if actual == "FUNDED"),
        "{err:?}"
    );
}
