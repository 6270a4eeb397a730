//! # metis-types: Core types for `Metis`
//!
//! This crate contains shared types used across the `Metis` system:
//! - Entity IDs ([`IdentityId`], [`ContainerId`], [`ItemId`])
//! - Owned resources ([`Container`], [`Item`])
//! - Sharing relations ([`Grant`])
//!
//! Containers are the top-level owned resource ("projects"); items live under
//! exactly one container ("analyses"). There is no deeper nesting.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs - opaque strings assigned by whoever provisions the entity
// ============================================================================

/// Unique identifier for an identity (a user or service account).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier for a container ("project").
///
/// Item-level requests are authorized at container granularity, so this is
/// the id every access decision is made against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier for an item ("analysis").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Top-level owned resource.
///
/// Owned by exactly one identity. Created by an admin or manager, who becomes
/// the owner; containers are never mutated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub owner_id: IdentityId,
}

impl Container {
    pub fn new(
        id: impl Into<ContainerId>,
        name: impl Into<String>,
        owner_id: impl Into<IdentityId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
        }
    }

    /// Returns whether `identity` owns this container.
    pub fn is_owned_by(&self, identity: &IdentityId) -> bool {
        &self.owner_id == identity
    }
}

/// Resource nested under exactly one container.
///
/// `content` is opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub content: String,
    pub container_id: ContainerId,
    pub created_by: IdentityId,
}

impl Item {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        content: impl Into<String>,
        container_id: impl Into<ContainerId>,
        created_by: impl Into<IdentityId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            container_id: container_id.into(),
            created_by: created_by.into(),
        }
    }
}

/// Explicit read-sharing relation between an identity and a container.
///
/// Unique per `(identity, container)` pair. Grants carry no action qualifier
/// and are not transitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub identity_id: IdentityId,
    pub container_id: ContainerId,
}

impl Grant {
    pub fn new(identity_id: impl Into<IdentityId>, container_id: impl Into<ContainerId>) -> Self {
        Self {
            identity_id: identity_id.into(),
            container_id: container_id.into(),
        }
    }
}
