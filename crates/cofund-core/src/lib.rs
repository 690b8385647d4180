//! # cofund-core — Foundational Types
//!
//! Leaf crate of the cofund workspace. Every other crate depends on
//! `cofund-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `ProjectId`, `StageId`, `RequestId`, `OfferId`,
//!    `ObservationId` and `UserId` are distinct types over a UUID. A stage id
//!    cannot be passed where a request id is expected.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision so
//!    deadlines compare the same way in memory, on the wire and in storage.
//!
//! 3. **No floats for money.** [`Amount`] keeps a validated decimal string.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cofund-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod actor;
pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

pub use actor::{Actor, Role};
pub use amount::Amount;
pub use error::CoreError;
pub use identity::{ObservationId, OfferId, ProjectId, RequestId, StageId, UserId};
pub use temporal::Timestamp;
