//! # cofund-engine — Lifecycle-Consistency Engine
//!
//! Decides when requests, stages, projects and observations change state,
//! how accepting one offer cascades into its siblings and parents, and how
//! concurrent actions on the same request are arbitrated.
//!
//! - **Offer Arbitration** (`arbitration.rs`): accept/reject offers with a
//!   single winner per request; fulfilment confirmation.
//! - **Request Lifecycle** (`lifecycle.rs`): forward-only request
//!   transitions, reachable only from arbitration.
//! - **Stage Recalculator** (`recalc.rs`): derives stage state from request
//!   states after every request change.
//! - **Project Gate** (`gate.rs`): manual project and stage transitions
//!   validated against the whole aggregate.
//! - **Observation Escalator** (`escalator.rs`): time-derived overdue state,
//!   written back on read.
//!
//! All mutations run inside [`AggregateStore::transact`], which serializes
//! work on one project and commits all-or-nothing. Cascades only travel
//! upward: offer → request → stage. The project is never moved by a cascade.
//!
//! ## Crate Policy
//!
//! - Depends on `cofund-core` and `cofund-state` internally.
//! - No I/O; durability is the store's concern.

pub mod aggregate;
pub mod arbitration;
pub mod clock;
pub mod engine;
pub mod error;
pub mod escalator;
mod gate;
mod lifecycle;
mod projects;
mod recalc;
pub mod report;
pub mod store;

pub use aggregate::ProjectAggregate;
pub use arbitration::{AcceptOutcome, Commitment, FulfillmentReceipt};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Engine;
pub use error::{EngineError, ErrorKind};
pub use escalator::Escalated;
pub use report::{BlockingItem, BlockingReport};
pub use store::{AggregateStore, MemoryStore};
