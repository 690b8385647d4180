//! # Actors and Roles
//!
//! The authenticated caller as seen by the engine. Ownership checks compare
//! [`Actor::id`] against a project's owner; council checks read
//! [`Actor::role`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::UserId;

/// Capability flag attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular platform member: may own projects and make offers.
    Member,
    /// Council member: may additionally raise observations.
    Council,
}

impl Role {
    /// Whether this role carries council capability.
    pub fn is_council(&self) -> bool {
        matches!(self, Self::Council)
    }

    /// Parse a role name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "council" => Ok(Self::Council),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Member => "MEMBER",
            Self::Council => "COUNCIL",
        };
        f.write_str(s)
    }
}

/// An authenticated user acting on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// A regular member.
    pub fn member(id: UserId) -> Self {
        Self {
            id,
            role: Role::Member,
        }
    }

    /// A council member.
    pub fn council(id: UserId) -> Self {
        Self {
            id,
            role: Role::Council,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roles_case_insensitive() {
        assert_eq!(Role::parse("member").unwrap(), Role::Member);
        assert_eq!(Role::parse("COUNCIL").unwrap(), Role::Council);
        assert!(matches!(Role::parse("admin"), Err(CoreError::UnknownRole(_))));
    }

    #[test]
    fn only_council_has_council_capability() {
        assert!(Actor::council(UserId::new()).role.is_council());
        assert!(!Actor::member(UserId::new()).role.is_council());
    }
}
