//! Access decision engine.
//!
//! Maps `(identity, container, action)` to allow or deny. Rules are checked
//! in [`Rule::ORDER`]; the first one that applies decides. Directory lookups
//! are only issued once the role rules have all passed, and a failed lookup
//! is folded into a deny instead of being returned to the caller.

use metis_types::{ContainerId, IdentityId};
use tracing::{debug, warn};

use crate::actions::Action;
use crate::directory::{LookupError, ResourceDirectory};
use crate::identity::Identity;
use crate::policy::{Effect, Rule};
use crate::roles::Role;

// ============================================================================
// Decision
// ============================================================================

/// The result of evaluating an access request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether access is allowed.
    pub allow: bool,
    /// The rule that decided.
    pub rule: Rule,
    /// The lookup failure behind a [`Rule::LookupFailed`] denial, kept so the
    /// caller can report it. It never changes the outcome.
    pub lookup_error: Option<LookupError>,
}

impl Decision {
    fn from_rule(rule: Rule) -> Self {
        Self {
            allow: rule.effect() == Effect::Allow,
            rule,
            lookup_error: None,
        }
    }

    fn lookup_failed(error: LookupError) -> Self {
        Self {
            allow: false,
            rule: Rule::LookupFailed,
            lookup_error: Some(error),
        }
    }

    /// Returns the decision's effect.
    pub fn effect(&self) -> Effect {
        if self.allow { Effect::Allow } else { Effect::Deny }
    }

    /// Human-readable explanation of why this decision was made.
    pub fn reason(&self) -> String {
        match &self.lookup_error {
            Some(err) => format!("{}: {err}", self.rule.description()),
            None => self.rule.description().to_string(),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Decides from the role and action alone (rules 1-3).
///
/// Returns `None` when the decision depends on ownership or grant facts,
/// which is exactly the manager-read and reader-read cases.
pub fn role_rule(role: Role, action: Action) -> Option<Rule> {
    match (role, action) {
        (Role::Admin, _) => Some(Rule::AdminBypass),
        (Role::Manager, Action::Write) => Some(Rule::ManagerWrite),
        (Role::Reader, Action::Write) => Some(Rule::ReaderWriteDenied),
        (Role::Manager | Role::Reader, Action::Read) => None,
    }
}

/// Authorizes creating a container or an item.
///
/// Creation is a write gated by role only; there is no ownership check (a
/// new container has no owner yet). Admins and managers are allowed,
/// readers never are.
pub fn authorize_creation(identity: &Identity) -> Decision {
    let rule = match identity.role {
        Role::Admin => Rule::AdminBypass,
        Role::Manager => Rule::ManagerWrite,
        Role::Reader => Rule::ReaderWriteDenied,
    };

    let decision = Decision::from_rule(rule);
    log_decision(identity, None, Action::Write, &decision);
    decision
}

/// Evaluates an access request.
///
/// # Postcondition
///
/// Always returns a `Decision` -- lookup failures become a deny with
/// [`Rule::LookupFailed`].
pub fn evaluate<D: ResourceDirectory + ?Sized>(
    directory: &D,
    identity: &Identity,
    container_id: &ContainerId,
    action: Action,
) -> Decision {
    let decision = match role_rule(identity.role, action) {
        Some(rule) => Decision::from_rule(rule),
        None => evaluate_facts(directory, &identity.id, container_id),
    };

    log_decision(identity, Some(container_id), action, &decision);
    decision
}

/// Stateless evaluator bound to a directory.
///
/// Cheap to share: all state lives in the directory, which is only read.
#[derive(Debug, Clone)]
pub struct AccessEvaluator<D> {
    directory: D,
}

impl<D: ResourceDirectory> AccessEvaluator<D> {
    /// Creates an evaluator over the given directory.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Evaluates an access request against this evaluator's directory.
    pub fn evaluate(
        &self,
        identity: &Identity,
        container_id: &ContainerId,
        action: Action,
    ) -> Decision {
        evaluate(&self.directory, identity, container_id, action)
    }

    /// Authorizes a container or item creation.
    pub fn authorize_creation(&self, identity: &Identity) -> Decision {
        authorize_creation(identity)
    }

    /// Returns the underlying directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }
}

// ============================================================================
// Fact Evaluation
// ============================================================================

/// Rules 4a-4c: ownership, then grant, then default deny.
///
/// The grant lookup is only issued when the ownership lookup found nothing.
fn evaluate_facts<D: ResourceDirectory + ?Sized>(
    directory: &D,
    identity_id: &IdentityId,
    container_id: &ContainerId,
) -> Decision {
    let owned = directory
        .find_owned_container(container_id, identity_id)
        .map(|found| {
            found.is_some_and(|c| &c.id == container_id && c.is_owned_by(identity_id))
        });

    owned
        .and_then(|owned| {
            if owned {
                return Ok(Rule::Ownership);
            }

            directory
                .find_grant(container_id, identity_id)
                .map(|found| {
                    found.is_some_and(|g| {
                        &g.container_id == container_id && &g.identity_id == identity_id
                    })
                })
                .map(|granted| if granted { Rule::Grant } else { Rule::DefaultDeny })
        })
        .map_or_else(Decision::lookup_failed, Decision::from_rule)
}

fn log_decision(
    identity: &Identity,
    container_id: Option<&ContainerId>,
    action: Action,
    decision: &Decision,
) {
    let container = container_id.map_or("<new>", ContainerId::as_str);

    if let Some(err) = &decision.lookup_error {
        warn!(
            identity = %identity.id,
            role = %identity.role,
            container = %container,
            action = %action,
            error = %err,
            "Access denied: directory lookup failed"
        );
        return;
    }

    debug!(
        identity = %identity.id,
        role = %identity.role,
        container = %container,
        action = %action,
        rule = decision.rule.as_str(),
        allow = decision.allow,
        "Access decision"
    );
}
