//! Unit tests for metis-directory
//!
//! Storage behavior is checked against both stores through the
//! `ResourceStore` trait so they cannot drift apart.

use std::sync::Arc;
use std::thread;

use metis_rbac::{Action, Identity, Role, Rule, evaluate};
use metis_types::{Container, ContainerId, Grant, IdentityId, Item, ItemId};
use test_case::test_case;

use crate::{DirectoryError, InMemoryDirectory, ResourceStore, SeedData, SqliteDirectory};

type Factory = fn() -> Box<dyn ResourceStore>;

fn memory() -> Box<dyn ResourceStore> {
    Box::new(InMemoryDirectory::new())
}

fn sqlite() -> Box<dyn ResourceStore> {
    Box::new(SqliteDirectory::open_in_memory().unwrap())
}

fn seeded(make: Factory) -> Box<dyn ResourceStore> {
    let store = make();
    SeedData::demo().apply(store.as_ref()).unwrap();
    store
}

// ============================================================================
// Seed
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn demo_seed_inserts_fixture(make: Factory) {
    let store = make();

    let report = SeedData::demo().apply(store.as_ref()).unwrap();

    assert_eq!(report.identities, 3);
    assert_eq!(report.containers, 3);
    assert_eq!(report.grants, 1);
    assert_eq!(report.items, 2);
    assert_eq!(report.total(), 9);
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn seed_is_idempotent(make: Factory) {
    let store = seeded(make);

    let second = SeedData::demo().apply(store.as_ref()).unwrap();

    assert!(second.is_empty());
    assert_eq!(store.list_containers().unwrap().len(), 3);
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn seed_rejects_reader_owned_container(make: Factory) {
    let store = make();
    let seed = SeedData {
        identities: vec![Identity::new("3", "reader", Role::Reader)],
        containers: vec![Container::new("9", "Projet reader", "3")],
        ..SeedData::default()
    };

    let err = seed.apply(store.as_ref()).unwrap_err();

    assert!(matches!(err, DirectoryError::InvalidSeed(_)));
    // Nothing was written.
    assert!(store.find_identity(&IdentityId::new("3")).unwrap().is_none());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn seed_cannot_promote_a_stored_reader(make: Factory) {
    let store = make();
    store
        .insert_identity(&Identity::new("5", "eve", Role::Reader))
        .unwrap();

    let relisted = SeedData {
        identities: vec![Identity::new("5", "eve", Role::Manager)],
        containers: vec![Container::new("9", "Projet eve", "5")],
        ..SeedData::default()
    };
    let err = relisted.apply(store.as_ref()).unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidSeed(_)));

    // An owner known only to the store is judged by its stored role.
    let unlisted = SeedData {
        containers: vec![Container::new("9", "Projet eve", "5")],
        ..SeedData::default()
    };
    let err = unlisted.apply(store.as_ref()).unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidSeed(_)));

    assert!(store.get_container(&ContainerId::new("9")).unwrap().is_none());
    assert_eq!(
        store.find_identity(&IdentityId::new("5")).unwrap().unwrap().role,
        Role::Reader
    );
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn failed_seed_writes_nothing(make: Factory) {
    let store = make();
    let dangling_item = SeedData {
        identities: vec![Identity::new("7", "mgr", Role::Manager)],
        containers: vec![Container::new("70", "Projet mgr", "7")],
        items: vec![Item::new("700", "Analyse", "", "missing", "7")],
        ..SeedData::default()
    };

    let err = dangling_item.apply(store.as_ref()).unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::MissingReference { kind: "container", .. }
    ));
    assert!(store.find_identity(&IdentityId::new("7")).unwrap().is_none());
    assert!(store.list_containers().unwrap().is_empty());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn seed_checks_grant_and_item_references(make: Factory) {
    let store = seeded(make);

    let unknown_grantee = SeedData {
        identities: vec![Identity::new("8", "newcomer", Role::Reader)],
        grants: vec![Grant::new("404", "1")],
        ..SeedData::default()
    };
    let err = unknown_grantee.apply(store.as_ref()).unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::MissingReference { kind: "identity", .. }
    ));

    // Item 2 already lives in project 3.
    let moved_item = SeedData {
        identities: vec![Identity::new("8", "newcomer", Role::Reader)],
        items: vec![Item::new("2", "Analyse 2", "", "1", "1")],
        ..SeedData::default()
    };
    let err = moved_item.apply(store.as_ref()).unwrap_err();
    assert!(matches!(err, DirectoryError::Conflict { kind: "item", .. }));

    let taken_name = SeedData {
        identities: vec![Identity::new("8", "manager", Role::Manager)],
        ..SeedData::default()
    };
    let err = taken_name.apply(store.as_ref()).unwrap_err();
    assert!(matches!(err, DirectoryError::Conflict { kind: "identity", .. }));

    assert!(store.find_identity(&IdentityId::new("8")).unwrap().is_none());
}

#[test]
fn seed_rejects_duplicate_records() {
    let store = InMemoryDirectory::new();
    let seed = SeedData {
        identities: vec![
            Identity::new("1", "admin", Role::Admin),
            Identity::new("1", "admin", Role::Admin),
        ],
        ..SeedData::default()
    };

    let err = seed.apply(&store).unwrap_err();

    assert!(matches!(err, DirectoryError::InvalidSeed(_)));
    assert!(store.find_identity(&IdentityId::new("1")).unwrap().is_none());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn find_item_ignores_container(make: Factory) {
    let store = seeded(make);

    let item = store.find_item(&ItemId::new("2")).unwrap().unwrap();

    assert_eq!(item.container_id.as_str(), "3");
    assert!(store.find_item(&ItemId::new("404")).unwrap().is_none());
}

#[test]
fn seed_parses_from_toml() {
    let seed = SeedData::from_toml_str(
        r#"
        [[identities]]
        id = "10"
        name = "alice"
        role = "manager"

        [[containers]]
        id = "20"
        name = "Alice's project"
        owner_id = "10"

        [[items]]
        id = "30"
        name = "Notes"
        content = "..."
        container_id = "20"
        created_by = "10"
        "#,
    )
    .unwrap();

    assert_eq!(seed.identities[0].display_name, "alice");
    assert_eq!(seed.identities[0].role, Role::Manager);
    assert!(seed.grants.is_empty());

    let store = InMemoryDirectory::new();
    let report = seed.apply(&store).unwrap();
    assert_eq!(report.to_string(), "1 identities, 1 containers, 0 grants, 1 items");
}

#[test]
fn seed_rejects_unknown_role() {
    let err = SeedData::from_toml_str(
        r#"
        [[identities]]
        id = "1"
        name = "root"
        role = "superuser"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, DirectoryError::SeedFormat(_)));
}

// ============================================================================
// Identities
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn identities_are_found_by_id_and_name(make: Factory) {
    let store = seeded(make);

    let by_name = store.find_identity_by_name("manager").unwrap().unwrap();
    let by_id = store.find_identity(&IdentityId::new("2")).unwrap().unwrap();

    assert_eq!(by_name, by_id);
    assert_eq!(by_id.role, Role::Manager);
    assert!(store.find_identity_by_name("nobody").unwrap().is_none());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn identity_names_are_unique(make: Factory) {
    let store = seeded(make);

    let err = store
        .insert_identity(&Identity::new("99", "admin", Role::Reader))
        .unwrap_err();

    assert!(matches!(err, DirectoryError::Conflict { .. }));
}

// ============================================================================
// Containers
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn containers_are_listed_by_id(make: Factory) {
    let store = seeded(make);

    let ids: Vec<_> = store
        .list_containers()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(
        ids,
        vec![ContainerId::new("1"), ContainerId::new("2"), ContainerId::new("3")]
    );
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn duplicate_container_is_a_conflict(make: Factory) {
    let store = seeded(make);

    let err = store
        .create_container(&Container::new("1", "Again", "1"))
        .unwrap_err();

    assert!(matches!(err, DirectoryError::Conflict { kind: "container", .. }));
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn container_owner_must_exist(make: Factory) {
    let store = seeded(make);

    let err = store
        .create_container(&Container::new("7", "Orphan", "404"))
        .unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::MissingReference { kind: "identity", .. }
    ));
    assert!(store.get_container(&ContainerId::new("7")).unwrap().is_none());
}

// ============================================================================
// Grants
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn grant_insert_reports_novelty(make: Factory) {
    let store = seeded(make);

    assert!(store.insert_grant(&Grant::new("3", "1")).unwrap());
    assert!(!store.insert_grant(&Grant::new("3", "1")).unwrap());
    assert!(!store.insert_grant(&Grant::new("3", "2")).unwrap());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn grant_requires_existing_container(make: Factory) {
    let store = seeded(make);

    let err = store.insert_grant(&Grant::new("3", "404")).unwrap_err();

    assert!(matches!(
        err,
        DirectoryError::MissingReference { kind: "container", .. }
    ));
}

// ============================================================================
// Items
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn items_belong_to_their_container(make: Factory) {
    let store = seeded(make);

    let found = store
        .get_item(&ContainerId::new("3"), &ItemId::new("2"))
        .unwrap();
    let misplaced = store
        .get_item(&ContainerId::new("1"), &ItemId::new("2"))
        .unwrap();

    assert_eq!(found.unwrap().name, "Analyse 2");
    assert!(misplaced.is_none());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn items_are_created_and_listed(make: Factory) {
    let store = seeded(make);
    let item = Item::new("5", "Analyse 5", "body", "1", "2");

    store.create_item(&item).unwrap();
    let listed = store.list_items(&ContainerId::new("1")).unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1], item);
    assert!(store.list_items(&ContainerId::new("2")).unwrap().is_empty());
}

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn item_creation_checks_references(make: Factory) {
    let store = seeded(make);

    let duplicate = store
        .create_item(&Item::new("1", "Again", "", "1", "1"))
        .unwrap_err();
    let orphan = store
        .create_item(&Item::new("6", "Orphan", "", "404", "1"))
        .unwrap_err();

    assert!(matches!(duplicate, DirectoryError::Conflict { kind: "item", .. }));
    assert!(matches!(
        orphan,
        DirectoryError::MissingReference { kind: "container", .. }
    ));
}

// ============================================================================
// Evaluator integration
// ============================================================================

#[test_case(memory ; "memory")]
#[test_case(sqlite ; "sqlite")]
fn point_lookups_match_seeded_facts(make: Factory) {
    let store = seeded(make);
    let c2 = ContainerId::new("2");

    assert!(
        store
            .find_owned_container(&c2, &IdentityId::new("1"))
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .find_owned_container(&c2, &IdentityId::new("2"))
            .unwrap()
            .is_none()
    );
    assert!(store.find_grant(&c2, &IdentityId::new("3")).unwrap().is_some());
    assert!(store.find_grant(&c2, &IdentityId::new("2")).unwrap().is_none());
}

#[test_case(memory, "3", "2", Rule::Grant ; "memory reader granted")]
#[test_case(sqlite, "3", "2", Rule::Grant ; "sqlite reader granted")]
#[test_case(sqlite, "3", "1", Rule::DefaultDeny ; "sqlite reader not granted")]
#[test_case(sqlite, "2", "3", Rule::Ownership ; "sqlite manager owns")]
#[test_case(sqlite, "2", "2", Rule::DefaultDeny ; "sqlite manager foreign project")]
#[test_case(sqlite, "1", "404", Rule::AdminBypass ; "sqlite admin missing project")]
fn seeded_reads(make: Factory, identity: &str, container: &str, expected: Rule) {
    let store = seeded(make);
    let who = store.find_identity(&IdentityId::new(identity)).unwrap().unwrap();

    let decision = evaluate(store.as_ref(), &who, &ContainerId::new(container), Action::Read);

    assert_eq!(decision.rule, expected);
}

#[test]
fn sqlite_store_is_shared_across_threads() {
    let store = Arc::new(SqliteDirectory::open_in_memory().unwrap());
    SeedData::demo().apply(store.as_ref()).unwrap();

    thread::scope(|scope| {
        for n in 0..4 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                let reader = Identity::new("3", "reader", Role::Reader);
                for _ in 0..25 {
                    assert!(evaluate(&store, &reader, &ContainerId::new("2"), Action::Read).allow);
                }
                store
                    .create_item(&Item::new(format!("t{n}"), "x", "y", "3", "2"))
                    .unwrap();
            });
        }
    });

    assert_eq!(store.list_items(&ContainerId::new("3")).unwrap().len(), 5);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

use proptest::prelude::*;

proptest! {
    /// Both stores list containers in the same id order, whatever the
    /// insertion order.
    #[test]
    fn prop_stores_agree_on_listing(ids in proptest::collection::hash_set("[a-z0-9]{1,6}", 1..12)) {
        let memory = InMemoryDirectory::new();
        let sqlite = SqliteDirectory::open_in_memory().unwrap();
        let owner = Identity::new("owner", "owner", Role::Manager);

        for store in [&memory as &dyn ResourceStore, &sqlite] {
            store.insert_identity(&owner).unwrap();
            for id in &ids {
                store.create_container(&Container::new(id.as_str(), "c", "owner")).unwrap();
            }
        }

        let from_memory = memory.list_containers().unwrap();
        let from_sqlite = sqlite.list_containers().unwrap();

        prop_assert_eq!(&from_memory, &from_sqlite);
        prop_assert!(from_memory.windows(2).all(|w| w[0].id < w[1].id));
    }
}
