//! The fact source consulted by the evaluator.
//!
//! The evaluator only ever asks two questions: does this identity own the
//! container, and does it hold a grant on it. Anything that can answer them
//! (a SQL database, an in-memory map, a test fake) implements
//! [`ResourceDirectory`].

use std::sync::Arc;

use metis_types::{Container, ContainerId, Grant, IdentityId};
use thiserror::Error;

/// Failure of a directory lookup.
///
/// The evaluator never propagates this; a fact that cannot be confirmed is
/// treated as absent and the request is denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The backing store could not be reached or locked.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The query ran but failed.
    #[error("directory query failed: {0}")]
    Query(String),
}

/// Read-only point lookups over ownership and grant facts.
///
/// Implementations must be safe to call concurrently from many in-flight
/// authorization checks. Both methods are pure reads.
pub trait ResourceDirectory: Send + Sync {
    /// Returns the container if it exists and is owned by `identity_id`.
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError>;

    /// Returns the grant for `(identity_id, container_id)` if one exists.
    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError>;
}

impl<D: ResourceDirectory + ?Sized> ResourceDirectory for &D {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        (**self).find_owned_container(container_id, identity_id)
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        (**self).find_grant(container_id, identity_id)
    }
}

impl<D: ResourceDirectory + ?Sized> ResourceDirectory for Arc<D> {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        (**self).find_owned_container(container_id, identity_id)
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        (**self).find_grant(container_id, identity_id)
    }
}
