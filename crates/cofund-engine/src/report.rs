//! # Blocking Reports
//!
//! When an owner-gated bulk check fails (`start`, `complete`, `start_stage`)
//! the engine returns every child record that blocks the transition, not
//! just the first. The serialized shape is consumed by UI and CLI clients:
//!
//! ```text
//! { "message": "...", "blocking": [ { "id", "context", "type", "state", "description" } ] }
//! ```

use serde::{Deserialize, Serialize};

use cofund_state::{CoverageRequest, Stage};

/// One record blocking a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingItem {
    /// Id of the blocking request or stage.
    pub id: String,
    /// Name of the stage the record belongs to (or is).
    pub context: String,
    /// Request kind, or `"stage"`.
    #[serde(rename = "type")]
    pub item_type: String,
    pub state: String,
    pub description: String,
}

impl BlockingItem {
    /// A request that is still waiting for coverage.
    pub fn request(stage_name: &str, request: &CoverageRequest) -> Self {
        Self {
            id: request.id.as_uuid().to_string(),
            context: stage_name.to_string(),
            item_type: request.kind.to_string(),
            state: request.state.to_string(),
            description: request.description.clone(),
        }
    }

    /// A stage that has not been completed.
    pub fn stage(stage: &Stage) -> Self {
        Self {
            id: stage.id.as_uuid().to_string(),
            context: stage.name.clone(),
            item_type: "stage".to_string(),
            state: stage.state.to_string(),
            description: stage.description.clone(),
        }
    }
}

/// Structured failure payload enumerating every blocking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingReport {
    pub message: String,
    pub blocking: Vec<BlockingItem>,
}

impl std::fmt::Display for BlockingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} blocking)", self.message, self.blocking.len())
    }
}
