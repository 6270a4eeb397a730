//! The fixed access policy.
//!
//! The policy is a short, ordered list of rules. Rules are evaluated in
//! [`Rule::ORDER`]; the first one that applies decides and nothing after it
//! is consulted. The first three rules look only at the role and the action,
//! so they never trigger a directory lookup.
//!
//! | # | Rule              | Applies when                       | Effect |
//! |---|-------------------|------------------------------------|--------|
//! | 1 | `AdminBypass`     | role is admin                      | allow  |
//! | 2 | `ManagerWrite`    | role is manager, action is write   | allow  |
//! | 3 | `ReaderWriteDenied` | role is reader, action is write  | deny   |
//! | 4a| `Ownership`       | identity owns the container        | allow  |
//! | 4b| `Grant`           | identity holds a grant on it       | allow  |
//! | 4c| `DefaultDeny`     | nothing above applied              | deny   |
//!
//! `LookupFailed` is not part of the ordering: it replaces 4a-4c when a
//! directory lookup errors, and always denies.

use serde::{Deserialize, Serialize};

/// Effect of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A rule of the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Admins are allowed everything, without any lookup.
    AdminBypass,

    /// Managers may write anywhere, without owning the container.
    ManagerWrite,

    /// Readers never write, even on containers they own or were granted.
    ReaderWriteDenied,

    /// The identity owns the container.
    Ownership,

    /// The identity holds an explicit grant on the container.
    Grant,

    /// No permitting fact was found.
    DefaultDeny,

    /// A directory lookup failed; the permitting fact could not be confirmed.
    LookupFailed,
}

impl Rule {
    /// Evaluation order. First match wins.
    pub const ORDER: [Rule; 6] = [
        Rule::AdminBypass,
        Rule::ManagerWrite,
        Rule::ReaderWriteDenied,
        Rule::Ownership,
        Rule::Grant,
        Rule::DefaultDeny,
    ];

    /// Returns the effect this rule produces when it matches.
    pub fn effect(&self) -> Effect {
        match self {
            Rule::AdminBypass | Rule::ManagerWrite | Rule::Ownership | Rule::Grant => {
                Effect::Allow
            }
            Rule::ReaderWriteDenied | Rule::DefaultDeny | Rule::LookupFailed => Effect::Deny,
        }
    }

    /// Returns whether this rule is decided from the role and action alone.
    pub fn is_role_rule(&self) -> bool {
        matches!(
            self,
            Rule::AdminBypass | Rule::ManagerWrite | Rule::ReaderWriteDenied
        )
    }

    /// Returns a stable snake_case name, used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::AdminBypass => "admin_bypass",
            Rule::ManagerWrite => "manager_write",
            Rule::ReaderWriteDenied => "reader_write_denied",
            Rule::Ownership => "ownership",
            Rule::Grant => "grant",
            Rule::DefaultDeny => "default_deny",
            Rule::LookupFailed => "lookup_failed",
        }
    }

    /// Human-readable explanation of the rule.
    pub fn description(&self) -> &'static str {
        match self {
            Rule::AdminBypass => "admin role bypasses ownership and grants",
            Rule::ManagerWrite => "manager role may write to any container",
            Rule::ReaderWriteDenied => "reader role never writes",
            Rule::Ownership => "identity owns the container",
            Rule::Grant => "identity holds a grant on the container",
            Rule::DefaultDeny => "no ownership or grant found",
            Rule::LookupFailed => "ownership or grant could not be confirmed",
        }
    }
}
