//! Observation escalation: lazy overdue derivation and resolution.

mod common;

use common::Fixture;
use cofund_core::{Actor, ObservationId, UserId};
use cofund_engine::{EngineError, ErrorKind};
use cofund_state::ObservationState;

fn started() -> Fixture {
    let fx = Fixture::new();
    fx.cover("Cement");
    fx.cover("Mason wages");
    fx.cover("Bricks");
    fx.engine
        .start_project(fx.project.project.id, &fx.owner)
        .unwrap();
    fx
}

#[test]
fn only_council_may_raise_and_only_in_execution() {
    let fx = Fixture::new();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());

    let err = fx
        .engine
        .raise_observation(project_id, &fx.owner, "Receipts?".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = fx
        .engine
        .raise_observation(project_id, &council, "Receipts?".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn pending_until_deadline_then_overdue_on_read() {
    let fx = started();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());
    let obs = fx
        .engine
        .raise_observation(project_id, &council, "Upload cement receipts".into())
        .unwrap();
    assert_eq!(obs.deadline, obs.created_at.plus_days(5));

    fx.clock.advance_days(5);
    let read = fx.engine.get_observation(obs.id).unwrap();
    assert_eq!(read.value.state, ObservationState::Pending);
    assert!(!read.escalated);

    fx.clock.advance_secs(1);
    let version_before = fx.snapshot().version;
    let read = fx.engine.get_observation(obs.id).unwrap();
    assert_eq!(read.value.state, ObservationState::Overdue);
    assert!(read.escalated);

    // The derived state was written back.
    let stored = fx.snapshot();
    assert_eq!(stored.observation(obs.id).unwrap().state, ObservationState::Overdue);
    assert_eq!(stored.version, version_before + 1);

    // A second read has nothing left to escalate.
    let read = fx.engine.list_observations(project_id, None).unwrap();
    assert!(!read.escalated);
    assert_eq!(fx.snapshot().version, version_before + 1);
}

#[test]
fn list_filters_by_derived_state() {
    let fx = started();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());
    let old = fx
        .engine
        .raise_observation(project_id, &council, "First".into())
        .unwrap();
    fx.clock.advance_days(3);
    let new = fx
        .engine
        .raise_observation(project_id, &council, "Second".into())
        .unwrap();
    fx.clock.advance_days(3);

    let all = fx.engine.list_observations(project_id, None).unwrap();
    assert_eq!(all.value.iter().map(|o| o.id).collect::<Vec<_>>(), [new.id, old.id]);

    let overdue = fx
        .engine
        .list_observations(project_id, Some(ObservationState::Overdue))
        .unwrap();
    assert_eq!(overdue.value.len(), 1);
    assert_eq!(overdue.value[0].id, old.id);
}

#[test]
fn resolve_from_pending_or_overdue_never_twice() {
    let fx = started();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());
    let a = fx
        .engine
        .raise_observation(project_id, &council, "A".into())
        .unwrap();
    let b = fx
        .engine
        .raise_observation(project_id, &council, "B".into())
        .unwrap();

    let resolved = fx
        .engine
        .resolve_observation(a.id, &fx.owner, "Answered".into())
        .unwrap();
    assert_eq!(resolved.state, ObservationState::Resolved);
    assert_eq!(resolved.response.as_deref(), Some("Answered"));

    fx.clock.advance_days(10);
    let late = fx
        .engine
        .resolve_observation(b.id, &fx.owner, "Late answer".into())
        .unwrap();
    assert_eq!(late.state, ObservationState::Resolved);
    assert_eq!(late.resolved_at, Some(common::t0().plus_days(10)));

    let err = fx
        .engine
        .resolve_observation(a.id, &fx.owner, "Again".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyResolved);

    // Resolved never reverts to overdue, however late the read.
    let read = fx.engine.get_observation(a.id).unwrap();
    assert_eq!(read.value.state, ObservationState::Resolved);
}

#[test]
fn resolve_is_owner_only() {
    let fx = started();
    let council = Actor::council(UserId::new());
    let obs = fx
        .engine
        .raise_observation(fx.project.project.id, &council, "Why the delay?".into())
        .unwrap();
    let err = fx
        .engine
        .resolve_observation(obs.id, &council, "I answer myself".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = fx
        .engine
        .resolve_observation(obs.id, &fx.owner, "  ".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn unknown_observation_is_not_found() {
    let fx = started();
    let err = fx.engine.get_observation(ObservationId::new()).unwrap_err();
    assert!(matches!(err, EngineError::NotFound { entity: "observation", .. }));
}

#[test]
fn project_snapshot_derives_overdue_observations() {
    let fx = started();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());
    let obs = fx
        .engine
        .raise_observation(project_id, &council, "Where are the receipts?".into())
        .unwrap();

    fx.clock.advance_days(6);
    let version_before = fx.snapshot().version;
    let read = fx.engine.read_project(project_id).unwrap();
    assert!(read.escalated);
    assert_eq!(
        read.value.observation(obs.id).unwrap().state,
        ObservationState::Overdue
    );
    assert_eq!(fx.snapshot().version, version_before + 1);

    let again = fx.engine.get_project(project_id).unwrap();
    assert_eq!(again.observation(obs.id).unwrap().state, ObservationState::Overdue);
    assert_eq!(again.version, version_before + 1);
}

#[test]
fn author_or_owner_may_edit_without_moving_the_deadline() {
    let fx = started();
    let project_id = fx.project.project.id;
    let council = Actor::council(UserId::new());
    let obs = fx
        .engine
        .raise_observation(project_id, &council, "Receipts".into())
        .unwrap();

    fx.clock.advance_days(2);
    let edited = fx
        .engine
        .update_observation(obs.id, &council, "Receipts for cement".into())
        .unwrap();
    assert_eq!(edited.body, "Receipts for cement");
    assert_eq!(edited.deadline, obs.deadline);
    assert_eq!(edited.state, ObservationState::Pending);

    let edited = fx
        .engine
        .update_observation(obs.id, &fx.owner, "Receipts for cement and bricks".into())
        .unwrap();
    assert_eq!(edited.deadline, obs.deadline);

    let other_council = Actor::council(UserId::new());
    let err = fx
        .engine
        .update_observation(obs.id, &other_council, "Mine now".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    fx.engine
        .resolve_observation(obs.id, &fx.owner, "Uploaded".into())
        .unwrap();
    let err = fx
        .engine
        .update_observation(obs.id, &council, "One more thing".into())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyResolved);
    assert_eq!(
        fx.snapshot().observation(obs.id).unwrap().body,
        "Receipts for cement and bricks"
    );
}
