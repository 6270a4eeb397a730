//! Seed data.
//!
//! A seed lists identities, containers, grants and items to provision. It can
//! be loaded from TOML:
//!
//! ```toml
//! [[identities]]
//! id = "1"
//! name = "admin"
//! role = "admin"
//!
//! [[containers]]
//! id = "1"
//! name = "Projet admin"
//! owner_id = "1"
//!
//! [[grants]]
//! identity_id = "3"
//! container_id = "1"
//! ```
//!
//! Applying a seed is idempotent: rows that already exist are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use metis_rbac::{Identity, Role};
use metis_types::{Container, ContainerId, Grant, IdentityId, Item, ItemId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::ResourceStore;

/// Records to provision into a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub identities: Vec<Identity>,
    pub containers: Vec<Container>,
    pub grants: Vec<Grant>,
    pub items: Vec<Item>,
}

/// Counts of rows a seed actually inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub identities: usize,
    pub containers: usize,
    pub grants: usize,
    pub items: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.identities + self.containers + self.grants + self.items
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} identities, {} containers, {} grants, {} items",
            self.identities, self.containers, self.grants, self.items
        )
    }
}

impl SeedData {
    /// The demo fixture: one identity per role, three projects, one grant
    /// and two analyses.
    pub fn demo() -> Self {
        Self {
            identities: vec![
                Identity::new("1", "admin", Role::Admin),
                Identity::new("2", "manager", Role::Manager),
                Identity::new("3", "reader", Role::Reader),
            ],
            containers: vec![
                Container::new("1", "Projet manager", "2"),
                Container::new("2", "Projet admin", "1"),
                Container::new("3", "Projet partagé", "2"),
            ],
            grants: vec![Grant::new("3", "2")],
            items: vec![
                Item::new("1", "Analyse 1", "Contenu de l’analyse 1", "1", "1"),
                Item::new("2", "Analyse 2", "Contenu de l’analyse 2", "3", "1"),
            ],
        }
    }

    /// Parses seed data from TOML text.
    pub fn from_toml_str(text: &str) -> DirectoryResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads seed data from a TOML file.
    pub fn load(path: &Path) -> DirectoryResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Inserts every record not already present in `store`.
    ///
    /// Every record is checked against the seed and the store before the
    /// first write, so a rejected seed leaves the store untouched. Identities
    /// go first, then containers, grants and items.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::InvalidSeed`] if a container would be owned by a
    ///   reader, a record is listed twice, or a listed identity is already
    ///   stored with a different role.
    /// - [`DirectoryError::MissingReference`] if a record points at an
    ///   identity or container that neither the seed nor the store holds.
    /// - [`DirectoryError::Conflict`] if a new identity reuses a stored name,
    ///   or an item id is already taken in another container.
    pub fn apply<S: ResourceStore + ?Sized>(&self, store: &S) -> DirectoryResult<SeedReport> {
        let plan = self.plan(store)?;
        let mut report = SeedReport::default();

        for identity in plan.identities {
            store.insert_identity(identity)?;
            report.identities += 1;
        }

        for container in plan.containers {
            store.create_container(container)?;
            report.containers += 1;
        }

        for grant in &self.grants {
            if store.insert_grant(grant)? {
                report.grants += 1;
            }
        }

        for item in plan.items {
            store.create_item(item)?;
            report.items += 1;
        }

        info!(
            identities = report.identities,
            containers = report.containers,
            grants = report.grants,
            items = report.items,
            "seed applied"
        );
        Ok(report)
    }

    /// Validates the seed and collects the records `store` still lacks.
    fn plan<'a, S: ResourceStore + ?Sized>(&'a self, store: &S) -> DirectoryResult<SeedPlan<'a>> {
        let mut plan = SeedPlan::default();

        // Stored identities keep their stored role; a seed that disagrees
        // is rejected, so this map is authoritative for listed identities.
        let mut roles: HashMap<&IdentityId, Role> = HashMap::new();
        let mut new_names: HashSet<&str> = HashSet::new();
        for identity in &self.identities {
            if roles.contains_key(&identity.id) {
                return Err(listed_twice("identity", &identity.id));
            }

            match store.find_identity(&identity.id)? {
                Some(stored) if stored.role != identity.role => {
                    return Err(DirectoryError::InvalidSeed(format!(
                        "identity {} is stored as {}, seed lists it as {}",
                        identity.id, stored.role, identity.role
                    )));
                }
                Some(_) => {}
                None => {
                    let name = identity.display_name.as_str();
                    if !new_names.insert(name) || store.find_identity_by_name(name)?.is_some() {
                        return Err(DirectoryError::conflict("identity", name));
                    }
                    plan.identities.push(identity);
                }
            }
            roles.insert(&identity.id, identity.role);
        }

        let mut containers: HashSet<&ContainerId> = HashSet::new();
        for container in &self.containers {
            if !containers.insert(&container.id) {
                return Err(listed_twice("container", &container.id));
            }
            if store.get_container(&container.id)?.is_some() {
                continue;
            }

            match role_of(&roles, store, &container.owner_id)? {
                None => return Err(DirectoryError::missing("identity", &container.owner_id)),
                Some(role) if !role.can_own_containers() => {
                    return Err(DirectoryError::InvalidSeed(format!(
                        "container {} cannot be owned by reader {}",
                        container.id, container.owner_id
                    )));
                }
                Some(_) => plan.containers.push(container),
            }
        }

        let container_known = |id: &ContainerId| -> DirectoryResult<bool> {
            Ok(containers.contains(id) || store.get_container(id)?.is_some())
        };

        for grant in &self.grants {
            if role_of(&roles, store, &grant.identity_id)?.is_none() {
                return Err(DirectoryError::missing("identity", &grant.identity_id));
            }
            if !container_known(&grant.container_id)? {
                return Err(DirectoryError::missing("container", &grant.container_id));
            }
        }

        let mut items: HashSet<&ItemId> = HashSet::new();
        for item in &self.items {
            if !items.insert(&item.id) {
                return Err(listed_twice("item", &item.id));
            }

            match store.find_item(&item.id)? {
                Some(stored) if stored.container_id == item.container_id => continue,
                Some(_) => return Err(DirectoryError::conflict("item", &item.id)),
                None => {}
            }
            if !container_known(&item.container_id)? {
                return Err(DirectoryError::missing("container", &item.container_id));
            }
            if role_of(&roles, store, &item.created_by)?.is_none() {
                return Err(DirectoryError::missing("identity", &item.created_by));
            }
            plan.items.push(item);
        }

        Ok(plan)
    }
}

/// Records a seed will insert.
#[derive(Default)]
struct SeedPlan<'a> {
    identities: Vec<&'a Identity>,
    containers: Vec<&'a Container>,
    items: Vec<&'a Item>,
}

fn role_of<S: ResourceStore + ?Sized>(
    seeded: &HashMap<&IdentityId, Role>,
    store: &S,
    id: &IdentityId,
) -> DirectoryResult<Option<Role>> {
    match seeded.get(id) {
        Some(role) => Ok(Some(*role)),
        None => Ok(store.find_identity(id)?.map(|identity| identity.role)),
    }
}

fn listed_twice(kind: &str, id: impl fmt::Display) -> DirectoryError {
    DirectoryError::InvalidSeed(format!("{kind} {id} is listed twice"))
}
