#![allow(clippy::match_same_arms)]
//! Role definitions for RBAC.
//!
//! Defines 3 roles with escalating privileges:
//! - Reader: Read containers it owns or was granted (most restrictive)
//! - Manager: Write anywhere, read what it owns or was granted
//! - Admin: Full access, never gated by ownership or grants

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role in the access control system.
///
/// A role is fixed when the identity authenticates and does not change for
/// the lifetime of a session. It is the only source of unconditional
/// capability.
///
/// Roles are ordered from least to most privileged:
/// Reader < Manager < Admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access through ownership or explicit grants.
    ///
    /// **Permissions:**
    /// - Read containers it owns or holds a grant on
    /// - Cannot create containers or items
    /// - Never owns a container
    Reader,

    /// Write access everywhere, gated read access.
    ///
    /// **Permissions:**
    /// - Create containers (becoming their owner)
    /// - Create items inside any container
    /// - Read containers it owns or holds a grant on
    Manager,

    /// Administrator with full access.
    ///
    /// **Permissions:**
    /// - Read and write every container, existing or not
    /// - Bypasses ownership and grant lookups entirely
    Admin,
}

impl Role {
    /// All roles, least privileged first.
    pub const ALL: [Role; 3] = [Role::Reader, Role::Manager, Role::Admin];

    /// Returns whether this role may create containers and items.
    pub fn can_write(&self) -> bool {
        match self {
            Role::Reader => false,
            Role::Manager => true,
            Role::Admin => true,
        }
    }

    /// Returns whether this role reads without consulting ownership or grants.
    pub fn bypasses_facts(&self) -> bool {
        match self {
            Role::Reader => false,
            Role::Manager => false, // Reads are still gated
            Role::Admin => true,
        }
    }

    /// Returns whether this role may own containers.
    pub fn can_own_containers(&self) -> bool {
        self.can_write()
    }

    /// Returns the lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" | "admin" => Ok(Role::Admin),
            "Manager" | "manager" => Ok(Role::Manager),
            "Reader" | "reader" => Ok(Role::Reader),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}
