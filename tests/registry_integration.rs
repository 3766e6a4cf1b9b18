//! Integration tests for registry persistence and optimistic concurrency.
//!
//! These tests exercise RegistryStore against real files created with
//! tempfile.

use std::fs;
use std::net::IpAddr;

use tempfile::TempDir;

use nodereg::core::registry::{EntityKind, Precondition, Registry, RegistryError, RegistryStore};

// =============================================================================
// Test Helpers
// =============================================================================

const FIXTURE: &str = "\
nodeprofiles:
  default:
    comment: base settings
    cluster name: rack1
    image name: rocky-9
    kernel:
      args: quiet crashkernel=no
    system overlay: [wwinit]
    runtime overlay: [generic]
  gpu:
    profiles: [default]
    runtime overlay: [nvidia]
nodes:
  n001:
    profiles: [default]
    network devices:
      eth0:
        hwaddr: AA-BB-CC-DD-EE-01
        ipaddr: 10.0.0.1
  n002:
    profiles: [gpu]
    discoverable: 'true'
    network devices:
      eth0:
        ipaddr: 10.0.0.2
";

struct TestStore {
    dir: TempDir,
    store: RegistryStore,
}

impl TestStore {
    fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let store = RegistryStore::new(dir.path().join("nodes.conf"));
        Self { dir, store }
    }

    fn with_fixture() -> Self {
        let test = Self::new();
        fs::write(test.store.path(), FIXTURE).expect("write fixture");
        test
    }

    fn contents(&self) -> String {
        fs::read_to_string(self.store.path()).expect("read registry")
    }
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn persist_then_load_preserves_hash() {
    let test = TestStore::with_fixture();
    let mut registry = test.store.load().unwrap();
    let before = registry.hash().unwrap();

    test.store.persist(&mut registry).unwrap();
    let reloaded = test.store.load().unwrap();

    assert_eq!(reloaded, registry);
    assert_eq!(reloaded.hash().unwrap(), before);
}

#[test]
fn persisted_document_is_canonical() {
    let test = TestStore::with_fixture();
    let mut registry = test.store.load().unwrap();
    test.store.persist(&mut registry).unwrap();
    let first = test.contents();

    let mut again = test.store.load().unwrap();
    test.store.persist(&mut again).unwrap();
    assert_eq!(test.contents(), first);

    assert!(first.starts_with("nodeprofiles:"));
    let hwaddr = again.node("n001").unwrap().profile.net_devs["eth0"]
        .hwaddr
        .clone()
        .unwrap();
    assert_eq!(hwaddr.as_str(), "aa:bb:cc:dd:ee:01");
    assert!(!test.dir.path().join("nodes.conf.tmp").exists());
}

#[test]
fn key_order_does_not_change_hash() {
    let a = Registry::parse(
        b"nodes:\n  n1: {comment: x, profiles: [default]}\nnodeprofiles:\n  default: {}\n",
    )
    .unwrap();
    let b = Registry::parse(
        b"nodeprofiles:\n  default: {}\nnodes:\n  n1: {profiles: [default], comment: x}\n",
    )
    .unwrap();
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
}

#[test]
fn empty_optionals_are_flattened_on_write() {
    let test = TestStore::new();
    fs::write(
        test.store.path(),
        "nodes:\n  n1:\n    kernel: {}\n    ipmi: {}\n",
    )
    .unwrap();
    let mut registry = test.store.load().unwrap();
    test.store.persist(&mut registry).unwrap();

    let contents = test.contents();
    assert!(!contents.contains("kernel"));
    assert!(!contents.contains("ipmi"));
}

#[test]
fn legacy_fields_upgraded_on_write() {
    let test = TestStore::new();
    fs::write(
        test.store.path(),
        "nodeprofiles:\n  default:\n    container name: rocky-8\n    keys: {site: lab}\n",
    )
    .unwrap();
    let mut registry = test.store.load().unwrap();
    assert_eq!(registry.profile("default").unwrap().image_name, "rocky-8");

    test.store.persist(&mut registry).unwrap();
    let contents = test.contents();
    assert!(contents.contains("image name: rocky-8"));
    assert!(contents.contains("site: lab"));
    assert!(!contents.contains("container name"));
    assert!(!contents.contains("keys"));
}

#[test]
fn unquoted_numbers_survive_round_trip() {
    let test = TestStore::new();
    fs::write(
        test.store.path(),
        "nodeprofiles:\n  default:\n    ipmi: {port: 623}\n    tags: {vlan: 10}\nnodes:\n  n1: {profiles: [default]}\n",
    )
    .unwrap();
    let mut registry = test.store.load().unwrap();
    let (node, _) = registry.merge_node("n1").unwrap();
    assert_eq!(node.profile.ipmi.as_ref().unwrap().port, "623");
    assert_eq!(node.profile.tags["vlan"], "10");

    let before = registry.hash().unwrap();
    test.store.persist(&mut registry).unwrap();
    let reloaded = test.store.load().unwrap();
    assert_eq!(reloaded, registry);
    assert_eq!(reloaded.hash().unwrap(), before);
}

#[test]
fn malformed_document_rejected() {
    let test = TestStore::new();
    fs::write(
        test.store.path(),
        "nodes:\n  n1:\n    network devices:\n      eth0: {ipaddr: not-an-ip}\n",
    )
    .unwrap();
    assert!(matches!(
        test.store.load(),
        Err(RegistryError::Malformed(_))
    ));

    fs::write(test.store.path(), "- just\n- a list\n").unwrap();
    assert!(matches!(
        test.store.load(),
        Err(RegistryError::Malformed(_))
    ));
}

// =============================================================================
// Optimistic Concurrency
// =============================================================================

#[test]
fn stale_writer_is_refused() {
    let test = TestStore::with_fixture();

    // Two callers read the same snapshot.
    let seen_by_a = test.store.load().unwrap().hash().unwrap();
    let seen_by_b = test.store.load().unwrap().hash().unwrap();
    assert_eq!(seen_by_a, seen_by_b);

    // A writes first.
    test.store
        .update(&Precondition::Hash(seen_by_a), |registry| {
            registry.add_node("n003").map(|_| ())
        })
        .unwrap();

    // B's precondition is now stale.
    let err = test
        .store
        .delete_nodes(&["n001".to_string()], &Precondition::Hash(seen_by_b))
        .unwrap_err();
    match err {
        RegistryError::Conflict { expected, actual } => {
            assert_eq!(expected, seen_by_b);
            assert_eq!(actual, test.store.load().unwrap().hash().unwrap());
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert!(test.store.load().unwrap().node("n001").is_ok());

    // Re-reading gives a fresh fingerprint that is accepted.
    let fresh = test.store.load().unwrap().hash().unwrap();
    test.store
        .delete_nodes(&["n001".to_string()], &Precondition::Hash(fresh))
        .unwrap();

    let registry = test.store.load().unwrap();
    assert!(registry.node("n001").unwrap_err().is_not_found());
    assert_eq!(registry.list_all_nodes(), vec!["n002", "n003"]);
}

#[test]
fn force_bypasses_fingerprint() {
    let test = TestStore::with_fixture();
    let stale = Registry::default().hash().unwrap();
    test.store
        .delete_profiles(&["gpu".to_string()], &Precondition::Force)
        .unwrap();
    assert!(matches!(
        test.store
            .delete_profiles(&["default".to_string()], &Precondition::Hash(stale)),
        Err(RegistryError::Conflict { .. })
    ));
    assert_eq!(test.store.load().unwrap().list_all_profiles(), vec!["default"]);
}

#[test]
fn conflict_is_distinct_from_lookup_errors() {
    let test = TestStore::with_fixture();
    let seen = test.store.load().unwrap().hash().unwrap();

    let err = test
        .store
        .delete_nodes(&["ghost".to_string()], &Precondition::Hash(seen))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::NotFound {
            kind: EntityKind::Node,
            ..
        }
    ));

    let err = test
        .store
        .update(&Precondition::Hash(seen), |registry| {
            registry.add_profile("default").map(|_| ())
        })
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }));
    assert_eq!(test.store.load().unwrap().hash().unwrap(), seen);
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn usage_queries() {
    let registry = Registry::parse(FIXTURE.as_bytes()).unwrap();
    assert_eq!(registry.list_nodes_using_profile("default"), vec!["n001"]);
    assert_eq!(registry.list_profiles_using_profile("default"), vec!["gpu"]);
    assert_eq!(registry.list_profiles_using_image("rocky-9"), vec!["default"]);
    assert!(registry.list_nodes_using_image("rocky-9").is_empty());
    assert_eq!(registry.list_profiles_using_overlay("nvidia"), vec!["gpu"]);
    assert_eq!(registry.list_profiles_using_overlay("wwinit"), vec!["default"]);
}

#[test]
fn lookup_by_address() {
    let registry = Registry::parse(FIXTURE.as_bytes()).unwrap();

    let (id, node) = registry.find_by_hwaddr("aa:bb:cc:dd:ee:01").unwrap();
    assert_eq!(id, "n001");
    assert_eq!(node.profile.image_name, "rocky-9");

    let (id, _) = registry
        .find_by_ipaddr("10.0.0.2".parse::<IpAddr>().unwrap())
        .unwrap();
    assert_eq!(id, "n002");

    assert!(registry
        .find_by_hwaddr("aa:bb:cc:dd:ee:ff")
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        registry.find_by_hwaddr("nonsense"),
        Err(RegistryError::Malformed(_))
    ));
}

#[test]
fn discoverable_node_claims_unassigned_interface() {
    let registry = Registry::parse(FIXTURE.as_bytes()).unwrap();
    let (id, node, netdev) = registry.find_discoverable_node().unwrap();
    assert_eq!(id, "n002");
    assert_eq!(netdev, "eth0");
    assert_eq!(node.profile.runtime_overlay, vec!["nvidia", "generic"]);

    let registry = Registry::parse(b"nodes:\n  n1: {discoverable: false}\n").unwrap();
    assert!(matches!(
        registry.find_discoverable_node(),
        Err(RegistryError::NoDiscoverable)
    ));
}

#[test]
fn find_all_sorted_by_cluster() {
    let registry = Registry::parse(
        b"nodes:\n  a1: {cluster name: zeta}\n  b1: {cluster name: alpha}\n  c1: {cluster name: alpha}\n",
    )
    .unwrap();
    let ids: Vec<String> = registry
        .find_all_nodes(&[])
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec!["b1", "c1", "a1"]);

    assert!(registry
        .find_all_nodes(&["ghost".to_string()])
        .unwrap_err()
        .is_not_found());
}
