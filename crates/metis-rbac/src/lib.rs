//! # metis-rbac: Role-Based Access Control
//!
//! Decides whether an identity, holding a role, may perform an action on a
//! container. Decisions combine:
//! - **Role capability** (3 roles: Admin, Manager, Reader)
//! - **Ownership** of the container
//! - **Explicit grants** on the container
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Request (identity, container, action)       │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  evaluate()                                  │
//! │  ├─ Role rules (no lookups)                  │
//! │  ├─ Ownership lookup ──┐                     │
//! │  └─ Grant lookup ──────┤ ResourceDirectory   │
//! └─────────────────┬──────┴────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision { allow, rule }                    │
//! │  - lookup failure → deny (fail-closed)       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Roles
//!
//! | Role    | Read                  | Write | Gated by ownership/grants |
//! |---------|-----------------------|-------|---------------------------|
//! | Reader  | owned or granted only | ✗     | read only                 |
//! | Manager | owned or granted only | ✓     | read only                 |
//! | Admin   | ✓                     | ✓     | never                     |
//!
//! ## Examples
//!
//! ```
//! use metis_rbac::{Action, Identity, ResourceDirectory, LookupError, Role, Rule, evaluate};
//! use metis_types::{Container, ContainerId, Grant, IdentityId};
//!
//! struct Shared;
//!
//! impl ResourceDirectory for Shared {
//!     fn find_owned_container(
//!         &self,
//!         _container: &ContainerId,
//!         _identity: &IdentityId,
//!     ) -> Result<Option<Container>, LookupError> {
//!         Ok(None)
//!     }
//!
//!     fn find_grant(
//!         &self,
//!         container: &ContainerId,
//!         identity: &IdentityId,
//!     ) -> Result<Option<Grant>, LookupError> {
//!         Ok(Some(Grant::new(identity.clone(), container.clone())))
//!     }
//! }
//!
//! let reader = Identity::new("u3", "Jean", Role::Reader);
//! let container = ContainerId::new("c1");
//!
//! let read = evaluate(&Shared, &reader, &container, Action::Read);
//! assert!(read.allow);
//! assert_eq!(read.rule, Rule::Grant);
//!
//! // A grant never confers write access.
//! let write = evaluate(&Shared, &reader, &container, Action::Write);
//! assert!(!write.allow);
//! assert_eq!(write.rule, Rule::ReaderWriteDenied);
//! ```

pub mod actions;
pub mod directory;
pub mod evaluator;
pub mod identity;
pub mod policy;
pub mod roles;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use actions::{Action, ParseActionError};
pub use directory::{LookupError, ResourceDirectory};
pub use evaluator::{AccessEvaluator, Decision, authorize_creation, evaluate, role_rule};
pub use identity::Identity;
pub use policy::{Effect, Rule};
pub use roles::{ParseRoleError, Role};

// Kani proofs for bounded model checking
#[cfg(kani)]
mod kani_proofs;
