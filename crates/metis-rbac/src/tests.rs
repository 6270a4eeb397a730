//! Contract tests for the access evaluator.
//!
//! Everything here runs against an in-memory fake directory that counts
//! lookups and can be told to fail.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use metis_types::{Container, ContainerId, Grant, IdentityId};

use crate::{
    AccessEvaluator, Action, Identity, LookupError, ResourceDirectory, Role, Rule, evaluate,
};

// ============================================================================
// Fake directory
// ============================================================================

#[derive(Debug, Default)]
struct FakeDirectory {
    owners: HashMap<ContainerId, IdentityId>,
    grants: HashSet<Grant>,
    fail_ownership: bool,
    fail_grants: bool,
    ownership_calls: AtomicUsize,
    grant_calls: AtomicUsize,
}

impl FakeDirectory {
    fn new() -> Self {
        Self::default()
    }

    fn with_owner(mut self, container: &str, identity: &str) -> Self {
        self.owners
            .insert(ContainerId::new(container), IdentityId::new(identity));
        self
    }

    fn with_grant(mut self, identity: &str, container: &str) -> Self {
        self.grants.insert(Grant::new(identity, container));
        self
    }

    fn failing_ownership(mut self) -> Self {
        self.fail_ownership = true;
        self
    }

    fn failing_grants(mut self) -> Self {
        self.fail_grants = true;
        self
    }

    fn ownership_lookups(&self) -> usize {
        self.ownership_calls.load(Ordering::SeqCst)
    }

    fn grant_lookups(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> usize {
        self.ownership_lookups() + self.grant_lookups()
    }
}

impl ResourceDirectory for FakeDirectory {
    fn find_owned_container(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        self.ownership_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ownership {
            return Err(LookupError::Unavailable("ownership store offline".to_string()));
        }

        Ok(self
            .owners
            .get(container_id)
            .filter(|owner| *owner == identity_id)
            .map(|owner| Container::new(container_id.clone(), "container", owner.clone())))
    }

    fn find_grant(
        &self,
        container_id: &ContainerId,
        identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_grants {
            return Err(LookupError::Query("grant table locked".to_string()));
        }

        let grant = Grant::new(identity_id.clone(), container_id.clone());
        Ok(self.grants.contains(&grant).then_some(grant))
    }
}

/// A directory that answers with facts about the wrong container or identity.
struct MisroutedDirectory;

impl ResourceDirectory for MisroutedDirectory {
    fn find_owned_container(
        &self,
        _container_id: &ContainerId,
        _identity_id: &IdentityId,
    ) -> Result<Option<Container>, LookupError> {
        Ok(Some(Container::new("elsewhere", "other", "someone-else")))
    }

    fn find_grant(
        &self,
        _container_id: &ContainerId,
        _identity_id: &IdentityId,
    ) -> Result<Option<Grant>, LookupError> {
        Ok(Some(Grant::new("someone-else", "elsewhere")))
    }
}

fn identity(id: &str, role: Role) -> Identity {
    Identity::new(id, format!("{role}-{id}"), role)
}

fn container(id: &str) -> ContainerId {
    ContainerId::new(id)
}

// ============================================================================
// Core decisions
// ============================================================================

#[test]
fn reader_reads_through_grant() {
    let directory = FakeDirectory::new()
        .with_owner("c1", "u1")
        .with_grant("u3", "c1");

    let decision = evaluate(&directory, &identity("u3", Role::Reader), &container("c1"), Action::Read);

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::Grant);
}

#[test]
fn reader_without_grant_is_denied() {
    let directory = FakeDirectory::new()
        .with_owner("c2", "u2")
        .with_grant("u3", "c1");

    let decision = evaluate(&directory, &identity("u3", Role::Reader), &container("c2"), Action::Read);

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::DefaultDeny);
    assert!(decision.lookup_error.is_none());
}

#[test]
fn manager_writes_to_foreign_container() {
    let directory = FakeDirectory::new().with_owner("c1", "u1");

    let decision = evaluate(&directory, &identity("u2", Role::Manager), &container("c1"), Action::Write);

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::ManagerWrite);
    assert_eq!(directory.lookups(), 0);
}

#[test]
fn reader_never_creates_containers() {
    let reader = identity("u3", Role::Reader);

    let decision = crate::authorize_creation(&reader);

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::ReaderWriteDenied);
}

#[test]
fn admin_reads_missing_container() {
    // Empty directory: the container does not exist at all.
    let directory = FakeDirectory::new();

    let decision = evaluate(
        &directory,
        &identity("u1", Role::Admin),
        &container("does-not-exist"),
        Action::Read,
    );

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::AdminBypass);
    assert_eq!(directory.lookups(), 0);
}

// ============================================================================
// Ordering and short-circuit
// ============================================================================

#[test]
fn role_rules_issue_no_lookups_even_when_directory_is_down() {
    let directory = FakeDirectory::new().failing_ownership().failing_grants();

    let cases = [
        (Role::Admin, Action::Read, true),
        (Role::Admin, Action::Write, true),
        (Role::Manager, Action::Write, true),
        (Role::Reader, Action::Write, false),
    ];

    for (role, action, expected) in cases {
        let decision = evaluate(&directory, &identity("u9", role), &container("c1"), action);
        assert_eq!(decision.allow, expected, "{role} {action}");
        assert!(decision.rule.is_role_rule());
    }

    assert_eq!(directory.lookups(), 0);
}

#[test]
fn reader_owning_container_still_cannot_write() {
    let directory = FakeDirectory::new()
        .with_owner("c1", "u3")
        .with_grant("u3", "c1");

    let decision = evaluate(&directory, &identity("u3", Role::Reader), &container("c1"), Action::Write);

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::ReaderWriteDenied);
    assert_eq!(directory.lookups(), 0);
}

#[test]
fn ownership_match_skips_grant_lookup() {
    let directory = FakeDirectory::new().with_owner("c2", "u2");

    let decision = evaluate(&directory, &identity("u2", Role::Manager), &container("c2"), Action::Read);

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::Ownership);
    assert_eq!(directory.ownership_lookups(), 1);
    assert_eq!(directory.grant_lookups(), 0);
}

#[test]
fn grant_lookup_follows_missing_ownership() {
    let directory = FakeDirectory::new().with_owner("c1", "u1");

    let decision = evaluate(&directory, &identity("u2", Role::Manager), &container("c1"), Action::Read);

    assert!(!decision.allow);
    assert_eq!(directory.ownership_lookups(), 1);
    assert_eq!(directory.grant_lookups(), 1);
}

#[test]
fn grants_are_not_shared_between_containers() {
    let directory = FakeDirectory::new().with_grant("u3", "c1");

    let decision = evaluate(&directory, &identity("u3", Role::Reader), &container("c2"), Action::Read);

    assert!(!decision.allow);
}

#[test]
fn facts_about_other_resources_are_ignored() {
    let decision = evaluate(
        &MisroutedDirectory,
        &identity("u3", Role::Reader),
        &container("c1"),
        Action::Read,
    );

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::DefaultDeny);
}

// ============================================================================
// Fail-closed
// ============================================================================

#[test]
fn failed_ownership_lookup_denies_without_grant_lookup() {
    let directory = FakeDirectory::new()
        .with_grant("u3", "c1")
        .failing_ownership();

    let decision = evaluate(&directory, &identity("u3", Role::Reader), &container("c1"), Action::Read);

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::LookupFailed);
    assert_eq!(
        decision.lookup_error,
        Some(LookupError::Unavailable("ownership store offline".to_string()))
    );
    assert_eq!(directory.grant_lookups(), 0);
}

#[test]
fn failed_grant_lookup_denies() {
    let directory = FakeDirectory::new()
        .with_grant("u2", "c1")
        .failing_grants();

    let decision = evaluate(&directory, &identity("u2", Role::Manager), &container("c1"), Action::Read);

    assert!(!decision.allow);
    assert_eq!(decision.rule, Rule::LookupFailed);
    assert!(decision.reason().contains("grant table locked"));
}

#[test]
fn failing_grants_do_not_affect_owners() {
    let directory = FakeDirectory::new()
        .with_owner("c1", "u2")
        .failing_grants();

    let decision = evaluate(&directory, &identity("u2", Role::Manager), &container("c1"), Action::Read);

    assert!(decision.allow);
    assert_eq!(decision.rule, Rule::Ownership);
}

// ============================================================================
// Evaluator wrapper and concurrency
// ============================================================================

#[test]
fn evaluator_shares_directory_across_threads() {
    let directory = Arc::new(
        FakeDirectory::new()
            .with_owner("c1", "u1")
            .with_owner("c2", "u2")
            .with_grant("u3", "c1"),
    );
    let evaluator = AccessEvaluator::new(Arc::clone(&directory));

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let reader = identity("u3", Role::Reader);
                    assert!(evaluator.evaluate(&reader, &container("c1"), Action::Read).allow);
                    assert!(!evaluator.evaluate(&reader, &container("c2"), Action::Read).allow);
                }
            });
        }
    });

    // Two reads per iteration, each at least one ownership lookup.
    assert_eq!(directory.ownership_lookups(), 8 * 50 * 2);
}

#[test]
fn evaluator_creation_ignores_directory() {
    let evaluator = AccessEvaluator::new(FakeDirectory::new().failing_ownership());

    assert!(evaluator.authorize_creation(&identity("u2", Role::Manager)).allow);
    assert!(!evaluator.authorize_creation(&identity("u3", Role::Reader)).allow);
    assert_eq!(evaluator.directory().lookups(), 0);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

use proptest::prelude::*;

fn any_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::Reader)]
}

fn gated_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Manager), Just(Role::Reader)]
}

fn any_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Read), Just(Action::Write)]
}

/// Builds a directory holding the requested facts about `(identity, container)`.
fn directory_with(
    container_id: &str,
    identity_id: &str,
    owns: bool,
    granted: bool,
) -> FakeDirectory {
    let mut directory = FakeDirectory::new();
    if owns {
        directory = directory.with_owner(container_id, identity_id);
    } else {
        directory = directory.with_owner(container_id, "another-owner");
    }
    if granted {
        directory = directory.with_grant(identity_id, container_id);
    }
    directory
}

proptest! {
    /// Admins are allowed everything, whatever the facts.
    #[test]
    fn prop_admin_bypass(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        action in any_action(),
        owns in any::<bool>(),
        granted in any::<bool>(),
        broken in any::<bool>(),
    ) {
        let mut directory = directory_with(&container_id, &identity_id, owns, granted);
        if broken {
            directory = directory.failing_ownership().failing_grants();
        }

        let decision = evaluate(
            &directory,
            &identity(&identity_id, Role::Admin),
            &container(&container_id),
            action,
        );

        prop_assert!(decision.allow);
        prop_assert_eq!(directory.lookups(), 0);
    }

    /// Managers may write anywhere.
    #[test]
    fn prop_manager_write_bypass(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        owns in any::<bool>(),
        granted in any::<bool>(),
    ) {
        let directory = directory_with(&container_id, &identity_id, owns, granted).failing_ownership();

        let decision = evaluate(
            &directory,
            &identity(&identity_id, Role::Manager),
            &container(&container_id),
            Action::Write,
        );

        prop_assert!(decision.allow);
        prop_assert_eq!(decision.rule, Rule::ManagerWrite);
    }

    /// Readers never write, even with ownership or a grant.
    #[test]
    fn prop_reader_write_deny(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        owns in any::<bool>(),
        granted in any::<bool>(),
    ) {
        let directory = directory_with(&container_id, &identity_id, owns, granted);

        let decision = evaluate(
            &directory,
            &identity(&identity_id, Role::Reader),
            &container(&container_id),
            Action::Write,
        );

        prop_assert!(!decision.allow);
        prop_assert_eq!(directory.lookups(), 0);
    }

    /// Ownership confers read.
    #[test]
    fn prop_ownership_grants_read(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        role in gated_role(),
        granted in any::<bool>(),
    ) {
        let directory = directory_with(&container_id, &identity_id, true, granted);

        let decision = evaluate(
            &directory,
            &identity(&identity_id, role),
            &container(&container_id),
            Action::Read,
        );

        prop_assert!(decision.allow);
        prop_assert_eq!(decision.rule, Rule::Ownership);
    }

    /// A grant confers read when there is no ownership.
    #[test]
    fn prop_grant_grants_read(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        role in gated_role(),
    ) {
        prop_assume!(identity_id != "another-owner");
        let directory = directory_with(&container_id, &identity_id, false, true);

        let decision = evaluate(
            &directory,
            &identity(&identity_id, role),
            &container(&container_id),
            Action::Read,
        );

        prop_assert!(decision.allow);
        prop_assert_eq!(decision.rule, Rule::Grant);
    }

    /// No ownership and no grant means deny.
    #[test]
    fn prop_default_deny(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        role in gated_role(),
    ) {
        prop_assume!(identity_id != "another-owner");
        let directory = directory_with(&container_id, &identity_id, false, false);

        let decision = evaluate(
            &directory,
            &identity(&identity_id, role),
            &container(&container_id),
            Action::Read,
        );

        prop_assert!(!decision.allow);
        prop_assert_eq!(decision.rule, Rule::DefaultDeny);
    }

    /// A lookup failure on the path to the decision always denies.
    #[test]
    fn prop_fail_closed(
        container_id in "[a-z0-9]{1,8}",
        identity_id in "[a-z0-9]{1,8}",
        role in gated_role(),
        granted in any::<bool>(),
        fail_ownership in any::<bool>(),
    ) {
        prop_assume!(identity_id != "another-owner");
        let directory = directory_with(&container_id, &identity_id, false, granted);
        let directory = if fail_ownership {
            directory.failing_ownership()
        } else {
            directory.failing_grants()
        };

        let decision = evaluate(
            &directory,
            &identity(&identity_id, role),
            &container(&container_id),
            Action::Read,
        );

        prop_assert!(!decision.allow);
        prop_assert_eq!(decision.rule, Rule::LookupFailed);
        prop_assert!(decision.lookup_error.is_some());
    }

    /// Decisions are a pure function of the inputs.
    #[test]
    fn prop_decisions_are_repeatable(
        role in any_role(),
        action in any_action(),
        owns in any::<bool>(),
        granted in any::<bool>(),
    ) {
        let directory = directory_with("c1", "u1", owns, granted);
        let who = identity("u1", role);

        let first = evaluate(&directory, &who, &container("c1"), action);
        let second = evaluate(&directory, &who, &container("c1"), action);

        prop_assert_eq!(first, second);
    }
}
