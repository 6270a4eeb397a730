//! SQLite-backed directory.
//!
//! A single connection is shared behind a `Mutex`; every operation holds the
//! lock for its whole duration, so existence checks and inserts made inside
//! one call cannot interleave with another writer.

pub mod migrations;
mod open;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use metis_rbac::{Identity, LookupError, ResourceDirectory, Role};
use metis_types::{Container, ContainerId, Grant, IdentityId, Item, ItemId};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub use open::{open_db, open_db_in_memory};

use crate::error::{DirectoryError, DirectoryResult};
use crate::store::ResourceStore;

/// A [`ResourceStore`] persisted in SQLite.
#[derive(Debug)]
pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Opens (or creates) the database at `path` and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        open_db(path.as_ref()).map(Self::from_connection)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DirectoryResult<Self> {
        open_db_in_memory().map(Self::from_connection)
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> DirectoryResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DirectoryError::LockPoisoned)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

const IDENTITY_COLUMNS: &str = "id, name, role";
const CONTAINER_COLUMNS: &str = "id, name, owner_id";
const ITEM_COLUMNS: &str = "id, name, content, container_id, created_by";

struct IdentityRow {
    id: String,
    name: String,
    role: String,
}

impl IdentityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            role: row.get(2)?,
        })
    }

    fn into_identity(self) -> DirectoryResult<Identity> {
        let role: Role = self
            .role
            .parse()
            .map_err(|err| DirectoryError::InvalidData(format!("identity {}: {err}", self.id)))?;
        Ok(Identity::new(self.id, self.name, role))
    }
}

fn container_from_row(row: &Row<'_>) -> rusqlite::Result<Container> {
    Ok(Container::new(
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
    ))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item::new(
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
    ))
}

fn exists(conn: &Connection, sql: &str, id: &str) -> DirectoryResult<bool> {
    let found = conn.query_row(sql, [id], |row| row.get::<_, bool>(0))?;
    Ok(found)
}

fn require_identity(conn: &Connection, id: &IdentityId) -> DirectoryResult<()> {
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM identities WHERE id = ?1)",
        id.as_str(),
    )? {
        Ok(())
    } else {
        Err(DirectoryError::missing("identity", id))
    }
}

fn require_container(conn: &Connection, id: &ContainerId) -> DirectoryResult<()> {
    if exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM containers WHERE id = ?1)",
        id.as_str(),
    )? {
        Ok(())
    } else {
        Err(DirectoryError::missing("container", id))
    }
}

/// Maps a uniqueness violation to [`DirectoryError::Conflict`].
fn map_insert_error(err: rusqlite::Error, kind: &'static str, id: &str) -> DirectoryError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return DirectoryError::conflict(kind, id);
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return DirectoryError::missing("reference of", format!("{kind} {id}"));
            }
            _ => {}
        }
    }
    err.into()
}

// ============================================================================
// Trait implementations
// ============================================================================

impl ResourceDirectory for SqliteDirectory {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = ?1 AND owner_id = ?2"),
            params![container_id.as_str(), identity_id.as_str()],
            container_from_row,
        )
        .optional()
        .map_err(|err| DirectoryError::from(err).into())
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT identity_id, container_id FROM grants WHERE container_id = ?1 AND identity_id = ?2",
            params![container_id.as_str(), identity_id.as_str()],
            |row| {
                Ok(Grant::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            },
        )
        .optional()
        .map_err(|err| DirectoryError::from(err).into())
    }
}

impl ResourceStore for SqliteDirectory {
    fn insert_identity(&self, identity: &Identity) -> DirectoryResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO identities (id, name, role) VALUES (?1, ?2, ?3)",
            params![
                identity.id.as_str(),
                identity.display_name,
                identity.role.as_str()
            ],
        )
        .map_err(|err| map_insert_error(err, "identity", identity.id.as_str()))?;
        Ok(())
    }

    fn find_identity(&self, id: &IdentityId) -> DirectoryResult<Option<Identity>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?1"),
            [id.as_str()],
            IdentityRow::from_row,
        )
        .optional()?
        .map(IdentityRow::into_identity)
        .transpose()
    }

    fn find_identity_by_name(&self, name: &str) -> DirectoryResult<Option<Identity>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE name = ?1"),
            [name],
            IdentityRow::from_row,
        )
        .optional()?
        .map(IdentityRow::into_identity)
        .transpose()
    }

    fn list_containers(&self) -> DirectoryResult<Vec<Container>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {CONTAINER_COLUMNS} FROM containers ORDER BY id"))?;
        let rows = stmt.query_map([], container_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_container(&self, id: &ContainerId) -> DirectoryResult<Option<Container>> {
        let conn = self.conn()?;
        let container = conn
            .query_row(
                &format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = ?1"),
                [id.as_str()],
                container_from_row,
            )
            .optional()?;
        Ok(container)
    }

    fn create_container(&self, container: &Container) -> DirectoryResult<()> {
        let conn = self.conn()?;
        if exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM containers WHERE id = ?1)",
            container.id.as_str(),
        )? {
            return Err(DirectoryError::conflict("container", &container.id));
        }
        require_identity(&conn, &container.owner_id)?;

        conn.execute(
            "INSERT INTO containers (id, name, owner_id) VALUES (?1, ?2, ?3)",
            params![
                container.id.as_str(),
                container.name,
                container.owner_id.as_str()
            ],
        )
        .map_err(|err| map_insert_error(err, "container", container.id.as_str()))?;
        Ok(())
    }

    fn insert_grant(&self, grant: &Grant) -> DirectoryResult<bool> {
        let conn = self.conn()?;
        require_identity(&conn, &grant.identity_id)?;
        require_container(&conn, &grant.container_id)?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO grants (identity_id, container_id) VALUES (?1, ?2)",
            params![grant.identity_id.as_str(), grant.container_id.as_str()],
        )?;
        Ok(inserted > 0)
    }

    fn list_items(&self, container_id: &ContainerId) -> DirectoryResult<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE container_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([container_id.as_str()], item_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_item(&self, id: &ItemId) -> DirectoryResult<Option<Item>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id.as_str()],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn get_item(
        &self,
        container_id: &ContainerId,
        item_id: &ItemId,
    ) -> DirectoryResult<Option<Item>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1 AND container_id = ?2"),
                params![item_id.as_str(), container_id.as_str()],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn create_item(&self, item: &Item) -> DirectoryResult<()> {
        let conn = self.conn()?;
        if exists(
            &conn,
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
            item.id.as_str(),
        )? {
            return Err(DirectoryError::conflict("item", &item.id));
        }
        require_container(&conn, &item.container_id)?;
        require_identity(&conn, &item.created_by)?;

        conn.execute(
            "INSERT INTO items (id, name, content, container_id, created_by) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.id.as_str(),
                item.name,
                item.content,
                item.container_id.as_str(),
                item.created_by.as_str()
            ],
        )
        .map_err(|err| map_insert_error(err, "item", item.id.as_str()))?;
        Ok(())
    }
}
