//! Kani bounded model checking proofs for the access policy.
//!
//! These proofs cover the role rules, which must hold for every input:
//! - Admin bypass: admins are allowed every action
//! - Reader write denial: readers are never allowed to write
//! - Role rules issue no directory lookups
//! - Fact rules deny unless ownership or a grant was confirmed

use metis_types::{Container, ContainerId, Grant, IdentityId};

use crate::{
    actions::Action,
    directory::{LookupError, ResourceDirectory},
    evaluator::{evaluate, role_rule},
    identity::Identity,
    policy::{Effect, Rule},
    roles::Role,
};

fn any_role() -> Role {
    match kani::any::<u8>() % 3 {
        0 => Role::Reader,
        1 => Role::Manager,
        _ => Role::Admin,
    }
}

fn any_action() -> Action {
    if kani::any() { Action::Read } else { Action::Write }
}

/// Directory whose answers are chosen by the model checker.
struct SymbolicDirectory {
    owns: bool,
    granted: bool,
    ownership_fails: bool,
    grant_fails: bool,
}

impl SymbolicDirectory {
    fn any() -> Self {
        Self {
            owns: kani::any(),
            granted: kani::any(),
            ownership_fails: kani::any(),
            grant_fails: kani::any(),
        }
    }
}

impl ResourceDirectory for SymbolicDirectory {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        if self.ownership_fails {
            return Err(LookupError::Unavailable(String::new()));
        }
        Ok(self
            .owns
            .then(|| Container::new(container_id.clone(), "c", identity_id.clone())))
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        if self.grant_fails {
            return Err(LookupError::Query(String::new()));
        }
        Ok(self
            .granted
            .then(|| Grant::new(identity_id.clone(), container_id.clone())))
    }
}

/// Panics on any lookup. Used to prove role rules never reach the directory.
struct UnreachableDirectory;

impl ResourceDirectory for UnreachableDirectory {
    fn find_owned_container(
        &self,
        _container_id: &ContainerId,
        _identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        panic!("ownership lookup issued")
    }

    fn find_grant(
        &self,
        _container_id: &ContainerId,
        _identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        panic!("grant lookup issued")
    }
}

#[kani::proof]
#[kani::unwind(4)]
fn verify_admin_bypass() {
    let action = any_action();
    let directory = SymbolicDirectory::any();
    let admin = Identity::new("u1", "admin", Role::Admin);

    let decision = evaluate(&directory, &admin, &ContainerId::new("c"), action);

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::AdminBypass);
}

#[kani::proof]
#[kani::unwind(4)]
fn verify_reader_never_writes() {
    let directory = SymbolicDirectory::any();
    let reader = Identity::new("u3", "reader", Role::Reader);

    let decision = evaluate(&directory, &reader, &ContainerId::new("c"), Action::Write);

    assert!(!decision.allow);
}

#[kani::proof]
#[kani::unwind(4)]
fn verify_role_rules_skip_lookups() {
    let role = any_role();
    let action = any_action();
    kani::assume(role_rule(role, action).is_some());

    let who = Identity::new("u", "someone", role);
    let decision = evaluate(&UnreachableDirectory, &who, &ContainerId::new("c"), action);

    assert!(decision.rule.is_role_rule());
}

#[kani::proof]
#[kani::unwind(4)]
fn verify_fact_rules_fail_closed() {
    let role = any_role();
    kani::assume(role != Role::Admin);
    let directory = SymbolicDirectory::any();
    let who = Identity::new("u", "someone", role);

    let decision = evaluate(&directory, &who, &ContainerId::new("c"), Action::Read);

    let confirmed = (!directory.ownership_fails && directory.owns)
        || (!directory.ownership_fails && !directory.grant_fails && directory.granted);
    assert_eq!(decision.allow, confirmed);
    assert_eq!(decision.effect() == Effect::Allow, decision.allow);
}
