//! Role hierarchy.
//!
//! A closed set of roles with a fixed total order:
//! `User < Staff < Manager < Support < Admin`.
//! The hierarchy is used for display and expansion only; rule evaluation
//! checks literal membership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// A role a principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
    Manager,
    Support,
    Admin,
}

impl Role {
    /// Every role, lowest rank first.
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::Staff,
        Role::Manager,
        Role::Support,
        Role::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Support => "support",
            Role::Admin => "admin",
        }
    }

    /// Parse a role name; unknown names are rejected.
    pub fn parse(value: &str) -> Result<Role, AuthError> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == value)
            .ok_or_else(|| AuthError::InvalidArgument(format!("invalid role {value:?}")))
    }

    /// This role and every role ranked below it.
    pub fn closure(self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| *r <= self).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

/// Parse a list of role names, failing on the first unknown one.
pub fn parse_many<S: AsRef<str>>(values: &[S]) -> Result<Vec<Role>, AuthError> {
    values.iter().map(|v| Role::parse(v.as_ref())).collect()
}

/// Role names for storage and wire formats.
pub fn to_strings(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

pub fn has_role(roles: &[Role], desired: Role) -> bool {
    roles.contains(&desired)
}

/// Expand an assignment to the full downward closure of its highest role.
///
/// An empty assignment expands as if it held only [`Role::User`].
pub fn effective_roles(assigned: &[Role]) -> Vec<Role> {
    dominant_role(assigned).closure()
}

/// The single highest-ranked role, for presentation. Empty input yields
/// [`Role::User`].
pub fn dominant_role(roles: &[Role]) -> Role {
    roles.iter().copied().max().unwrap_or(Role::User)
}
