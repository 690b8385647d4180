//! Transition history shared by stages and projects.

use serde::{Deserialize, Serialize};

use cofund_core::{Timestamp, UserId};

/// What caused a recorded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// Derived from child state by recalculation.
    Recalculation,
    /// Explicit action by an actor.
    Manual,
}

/// Record of one state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// State before the transition.
    pub from: S,
    /// State after the transition.
    pub to: S,
    /// When the transition occurred.
    pub at: Timestamp,
    pub trigger: TransitionTrigger,
    /// Actor behind a manual transition.
    pub actor: Option<UserId>,
}
