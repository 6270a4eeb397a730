//! Storage operations used by the HTTP boundary and the CLI.

use std::sync::Arc;

use metis_rbac::{Identity, ResourceDirectory};
use metis_types::{Container, ContainerId, Grant, IdentityId, Item, ItemId};

use crate::error::DirectoryResult;

/// Read and create operations over identities, containers, grants and items.
///
/// Extends [`ResourceDirectory`] so a single store can both serve the
/// evaluator's point lookups and the boundary's listings. Records are never
/// updated or deleted. Listings are ordered by id.
pub trait ResourceStore: ResourceDirectory {
    /// Inserts an identity. Duplicate ids or names are a conflict.
    fn insert_identity(&self, identity: &Identity) -> DirectoryResult<()>;

    fn find_identity(&self, id: &IdentityId) -> DirectoryResult<Option<Identity>>;

    fn find_identity_by_name(&self, name: &str) -> DirectoryResult<Option<Identity>>;

    fn list_containers(&self) -> DirectoryResult<Vec<Container>>;

    fn get_container(&self, id: &ContainerId) -> DirectoryResult<Option<Container>>;

    /// Creates a container.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::Conflict`](crate::DirectoryError::Conflict) if the id
    /// is taken, [`DirectoryError::MissingReference`](crate::DirectoryError::MissingReference)
    /// if the owner does not exist.
    fn create_container(&self, container: &Container) -> DirectoryResult<()>;

    /// Records a grant. Returns `false` if it already existed.
    fn insert_grant(&self, grant: &Grant) -> DirectoryResult<bool>;

    fn list_items(&self, container_id: &ContainerId) -> DirectoryResult<Vec<Item>>;

    /// Looks an item up by id alone. Item ids are unique across containers.
    fn find_item(&self, id: &ItemId) -> DirectoryResult<Option<Item>>;

    /// Returns the item only if it belongs to `container_id`.
    fn get_item(
        &self,
        container_id: &ContainerId,
        item_id: &ItemId,
    ) -> DirectoryResult<Option<Item>>;

    /// Creates an item. The container and the creator must exist.
    fn create_item(&self, item: &Item) -> DirectoryResult<()>;
}

impl<S: ResourceStore + ?Sized> ResourceStore for Arc<S> {
    fn insert_identity(&self, identity: &Identity) -> DirectoryResult<()> {
        (**self).insert_identity(identity)
    }

    fn find_identity(&self, id: &IdentityId) -> DirectoryResult<Option<Identity>> {
        (**self).find_identity(id)
    }

    fn find_identity_by_name(&self, name: &str) -> DirectoryResult<Option<Identity>> {
        (**self).find_identity_by_name(name)
    }

    fn list_containers(&self) -> DirectoryResult<Vec<Container>> {
        (**self).list_containers()
    }

    fn get_container(&self, id: &ContainerId) -> DirectoryResult<Option<Container>> {
        (**self).get_container(id)
    }

    fn create_container(&self, container: &Container) -> DirectoryResult<()> {
        (**self).create_container(container)
    }

    fn insert_grant(&self, grant: &Grant) -> DirectoryResult<bool> {
        (**self).insert_grant(grant)
    }

    fn list_items(&self, container_id: &ContainerId) -> DirectoryResult<Vec<Item>> {
        (**self).list_items(container_id)
    }

    fn find_item(&self, id: &ItemId) -> DirectoryResult<Option<Item>> {
        (**self).find_item(id)
    }

    fn get_item(
        &self,
        container_id: &ContainerId,
        item_id: &ItemId,
    ) -> DirectoryResult<Option<Item>> {
        (**self).get_item(container_id, item_id)
    }

    fn create_item(&self, item: &Item) -> DirectoryResult<()> {
        (**self).create_item(item)
    }
}
