//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the project hierarchy. The
//! aggregate tree (Project → Stage → Request → Offer, plus Observations)
//! is stored arena-style: parents and children refer to each other by id,
//! never by pointer, so each id type must stay distinct.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a crowd-funded project (the aggregate root).
    ProjectId,
    "project"
);

define_id!(
    /// Unique identifier for a stage within a project.
    StageId,
    "stage"
);

define_id!(
    /// Unique identifier for a coverage request within a stage.
    RequestId,
    "request"
);

define_id!(
    /// Unique identifier for an offer made against a request.
    OfferId,
    "offer"
);

define_id!(
    /// Unique identifier for a council observation on a project.
    ObservationId,
    "observation"
);

define_id!(
    /// Unique identifier for a platform user (project owner, bidder, council member).
    UserId,
    "user"
);
