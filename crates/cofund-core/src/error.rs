//! # Error Types
//!
//! Validation failures raised while constructing core values from
//! untrusted input (timestamps, amounts, role names).

use thiserror::Error;

/// Errors produced by `cofund-core` constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An amount string was not a non-negative decimal.
    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An unknown role name.
    #[error("unknown role {0:?}")]
    UnknownRole(String),
}
