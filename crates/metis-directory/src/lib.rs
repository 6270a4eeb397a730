//! metis-directory: ownership, grant and resource storage for `Metis`
//!
//! The directory answers the two questions the access evaluator asks (does
//! an identity own a container, does it hold a grant on it) and stores the
//! identities, containers and items the HTTP boundary serves.
//!
//! # Stores
//!
//! - [`SqliteDirectory`]: persistent, schema-migrated SQLite database
//! - [`InMemoryDirectory`]: `RwLock`-guarded maps, for tests and dry runs
//!
//! Both implement [`metis_rbac::ResourceDirectory`] and [`ResourceStore`].
//! Any storage failure seen by the evaluator becomes a
//! [`metis_rbac::LookupError`] and therefore a deny.
//!
//! # Example
//!
//! ```
//! use metis_directory::{SeedData, SqliteDirectory, ResourceStore};
//! use metis_rbac::{Action, Role, evaluate};
//! use metis_types::{ContainerId, IdentityId};
//!
//! let directory = SqliteDirectory::open_in_memory().unwrap();
//! SeedData::demo().apply(&directory).unwrap();
//!
//! let reader = directory.find_identity_by_name("reader").unwrap().unwrap();
//! assert_eq!(reader.role, Role::Reader);
//!
//! // The reader was granted project 2 but nothing else.
//! assert!(evaluate(&directory, &reader, &ContainerId::new("2"), Action::Read).allow);
//! assert!(!evaluate(&directory, &reader, &ContainerId::new("1"), Action::Read).allow);
//! ```

mod error;
mod memory;
mod seed;
pub mod sqlite;
mod store;

#[cfg(test)]
mod tests;

pub use error::{DirectoryError, DirectoryResult};
pub use memory::InMemoryDirectory;
pub use seed::{SeedData, SeedReport};
pub use sqlite::SqliteDirectory;
pub use store::ResourceStore;
