//! # cofund-state — Lifecycle State Machines
//!
//! Pure state machines for every record in a project's aggregate tree.
//! Nothing here performs I/O or takes a lock: callers load the records,
//! drive transitions, and persist the result atomically.
//!
//! - [`request`] — coverage requests (`Pending → Committed → Completed`).
//! - [`offer`] — offers (`Pending → Accepted | Rejected`).
//! - [`stage`] — stage recalculation plus the manual start/complete steps.
//! - [`project`] — project lifecycle (`Pending → InExecution → Finished`).
//! - [`observation`] — time-derived escalation of council observations.
//!
//! Every transition validates the current state and returns a typed error
//! carrying the record id and the offending state.

pub mod history;
pub mod observation;
pub mod offer;
pub mod project;
pub mod request;
pub mod stage;

pub use history::{TransitionRecord, TransitionTrigger};
pub use observation::{
    Observation, ObservationError, ObservationState, OBSERVATION_DEADLINE_DAYS,
};
pub use offer::{NewOffer, Offer, OfferError, OfferState};
pub use project::{NewProject, Project, ProjectError, ProjectState};
pub use request::{CoverageRequest, NewRequest, RequestError, RequestKind, RequestState};
pub use stage::{derive_stage_state, NewStage, Stage, StageError, StageState};
