//! In-memory directory.
//!
//! Used by tests across the workspace. Applies the same referential checks
//! as the SQLite store so both behave the same behind the boundary.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metis_rbac::{Identity, LookupError, ResourceDirectory};
use metis_types::{Container, ContainerId, Grant, IdentityId, Item, ItemId};

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::ResourceStore;

#[derive(Debug, Default)]
struct State {
    identities: BTreeMap<IdentityId, Identity>,
    containers: BTreeMap<ContainerId, Container>,
    grants: BTreeSet<Grant>,
    items: BTreeMap<ItemId, Item>,
}

impl State {
    fn require_identity(&self, id: &IdentityId) -> DirectoryResult<()> {
        if self.identities.contains_key(id) {
            Ok(())
        } else {
            Err(DirectoryError::missing("identity", id))
        }
    }

    fn require_container(&self, id: &ContainerId) -> DirectoryResult<()> {
        if self.containers.contains_key(id) {
            Ok(())
        } else {
            Err(DirectoryError::missing("container", id))
        }
    }
}

/// A [`ResourceStore`] kept entirely in memory behind an `RwLock`.
///
/// The `with_*` builders insert without referential checks and are meant
/// for assembling fixtures; the [`ResourceStore`] methods validate.
///
/// # Example
///
/// ```
/// use metis_directory::{InMemoryDirectory, ResourceStore};
/// use metis_rbac::{Identity, Role};
/// use metis_types::{Container, ContainerId};
///
/// let directory = InMemoryDirectory::new()
///     .with_identity(Identity::new("2", "manager", Role::Manager))
///     .with_container(Container::new("1", "Projet manager", "2"));
///
/// let container = directory.get_container(&ContainerId::new("1")).unwrap();
/// assert_eq!(container.unwrap().name, "Projet manager");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.state_mut()
            .identities
            .insert(identity.id.clone(), identity);
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.state_mut()
            .containers
            .insert(container.id.clone(), container);
        self
    }

    #[must_use]
    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.state_mut().grants.insert(grant);
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.state_mut().items.insert(item.id.clone(), item);
        self
    }

    fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> DirectoryResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| DirectoryError::LockPoisoned)
    }

    fn write(&self) -> DirectoryResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| DirectoryError::LockPoisoned)
    }
}

impl ResourceDirectory for InMemoryDirectory {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        let state = self.read()?;
        Ok(state
            .containers
            .get(container_id)
            .filter(|c| c.is_owned_by(identity_id))
            .cloned())
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        let state = self.read()?;
        let grant = Grant::new(identity_id.clone(), container_id.clone());
        Ok(state.grants.contains(&grant).then_some(grant))
    }
}

impl ResourceStore for InMemoryDirectory {
    fn insert_identity(&self, identity: &Identity) -> DirectoryResult<()> {
        let mut state = self.write()?;
        if state.identities.contains_key(&identity.id) {
            return Err(DirectoryError::conflict("identity", &identity.id));
        }
        if state
            .identities
            .values()
            .any(|existing| existing.display_name == identity.display_name)
        {
            return Err(DirectoryError::conflict(
                "identity name",
                &identity.display_name,
            ));
        }
        state
            .identities
            .insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    fn find_identity(&self, id: &IdentityId) -> DirectoryResult<Option<Identity>> {
        Ok(self.read()?.identities.get(id).cloned())
    }

    fn find_identity_by_name(&self, name: &str) -> DirectoryResult<Option<Identity>> {
        Ok(self
            .read()?
            .identities
            .values()
            .find(|identity| identity.display_name == name)
            .cloned())
    }

    fn list_containers(&self) -> DirectoryResult<Vec<Container>> {
        Ok(self.read()?.containers.values().cloned().collect())
    }

    fn get_container(&self, id: &ContainerId) -> DirectoryResult<Option<Container>> {
        Ok(self.read()?.containers.get(id).cloned())
    }

    fn create_container(&self, container: &Container) -> DirectoryResult<()> {
        let mut state = self.write()?;
        if state.containers.contains_key(&container.id) {
            return Err(DirectoryError::conflict("container", &container.id));
        }
        state.require_identity(&container.owner_id)?;
        state
            .containers
            .insert(container.id.clone(), container.clone());
        Ok(())
    }

    fn insert_grant(&self, grant: &Grant) -> DirectoryResult<bool> {
        let mut state = self.write()?;
        state.require_identity(&grant.identity_id)?;
        state.require_container(&grant.container_id)?;
        Ok(state.grants.insert(grant.clone()))
    }

    fn list_items(&self, container_id: &ContainerId) -> DirectoryResult<Vec<Item>> {
        Ok(self
            .read()?
            .items
            .values()
            .filter(|item| &item.container_id == container_id)
            .cloned()
            .collect())
    }

    fn find_item(&self, id: &ItemId) -> DirectoryResult<Option<Item>> {
        Ok(self.read()?.items.get(id).cloned())
    }

    fn get_item(
        &self,
        container_id: &ContainerId,
        item_id: &ItemId,
    ) -> DirectoryResult<Option<Item>> {
        Ok(self
            .read()?
            .items
            .get(item_id)
            .filter(|item| &item.container_id == container_id)
            .cloned())
    }

    fn create_item(&self, item: &Item) -> DirectoryResult<()> {
        let mut state = self.write()?;
        if state.items.contains_key(&item.id) {
            return Err(DirectoryError::conflict("item", &item.id));
        }
        state.require_container(&item.container_id)?;
        state.require_identity(&item.created_by)?;
        state.items.insert(item.id.clone(), item.clone());
        Ok(())
    }
}
