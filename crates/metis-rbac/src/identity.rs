//! Authenticated identities as seen by the evaluator.

use metis_types::IdentityId;
use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// An authenticated identity.
///
/// Identities are provisioned out-of-band and are read-only here. The role
/// is fixed at authentication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(alias = "name")]
    pub display_name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }
}
