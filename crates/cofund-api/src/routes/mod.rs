//! # API Route Modules
//!
//! - `projects` — project creation, retrieval, deletion, the Project Gate
//!   (`start`, `complete`), and stage/request listings.
//! - `stages` — manual stage transitions and adding requests to a stage.
//! - `offers` — offer submission and listing, arbitration (`accept`,
//!   `reject`), fulfilment confirmation, and the caller's commitments.
//! - `observations` — council observations with write-on-read escalation.
//!
//! Every mutating handler calls the engine (which commits in memory under
//! the project's lock) and then [`AppState::persist`](crate::state::AppState::persist)
//! for write-through.

pub mod observations;
pub mod offers;
pub mod projects;
pub mod stages;

use serde::Deserialize;
use utoipa::IntoParams;

/// `?state=` filter shared by list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StateFilter {
    /// Lower-case state name (e.g. `pending`, `committed`).
    pub state: Option<String>,
}
