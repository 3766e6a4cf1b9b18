//! Integration tests for profile resolution, merging, and field provenance.
//!
//! Each test parses a registry document and inspects the effective node
//! through the same path API the CLI uses.

use nodereg::core::fields::{get_field_string, list_fields, FieldError, SUPERSEDED};
use nodereg::core::registry::Registry;

const SITE: &str = "\
nodeprofiles:
  default:
    comment: site default
    kernel:
      version: '6.1'
      args: [quiet]
    ipmi:
      username: admin
      netmask: 255.255.255.0
    system overlay: [wwinit]
    tags: {site: lab}
  compute:
    profiles: [default]
    cluster name: hpc
    system overlay: [compute]
    network devices:
      eth0: {type: ethernet, netmask: 255.255.0.0, mtu: '9000'}
  gpu:
    profiles: [compute]
    runtime overlay: [nvidia]
  legacy:
    comment: should not apply
nodes:
  n001:
    profiles: [gpu, ~legacy, legacy]
    comment: rack 4
    ipmi:
      ipaddr: 10.1.0.1
    network devices:
      eth0: {hwaddr: 'aa:bb:cc:dd:ee:01', ipaddr: 10.0.0.1}
  n002:
    profiles: [~default, compute]
";

fn site() -> Registry {
    Registry::parse(SITE.as_bytes()).expect("parse fixture")
}

#[test]
fn closure_follows_parents_and_negations() {
    let registry = site();
    assert_eq!(
        registry.resolve_profiles("n001").unwrap(),
        vec!["gpu", "compute", "default"]
    );
    assert_eq!(registry.resolve_profiles("n002").unwrap(), vec!["compute"]);
}

#[test]
fn scalar_provenance() {
    let (node, fields) = site().merge_node("n001").unwrap();

    assert_eq!(node.profile.comment, "rack 4");
    assert_eq!(fields.source("Comment"), SUPERSEDED);
    assert_eq!(fields.value("Comment"), "rack 4");

    assert_eq!(fields.source("ClusterName"), "compute");
    assert_eq!(fields.value("ClusterName"), "hpc");

    assert_eq!(fields.source("Kernel.Version"), "default");
    assert_eq!(fields.value("Kernel.Version"), "6.1");
}

#[test]
fn list_provenance_accumulates() {
    let (node, fields) = site().merge_node("n001").unwrap();

    assert_eq!(node.profile.system_overlay, vec!["compute", "wwinit"]);
    assert_eq!(fields.source("SystemOverlay"), "compute,default");
    assert_eq!(fields.value("SystemOverlay"), "compute,wwinit");
    assert_eq!(fields.source("RuntimeOverlay"), "gpu");
}

#[test]
fn nested_record_provenance() {
    let (node, fields) = site().merge_node("n001").unwrap();

    assert_eq!(fields.source("Ipmi.UserName"), "default");
    assert_eq!(fields.source("Ipmi.Netmask"), "default");
    assert_eq!(fields.source("Ipmi.Ipaddr"), "");
    assert_eq!(fields.value("Ipmi.Ipaddr"), "10.1.0.1");

    assert_eq!(fields.source("NetDevs[eth0].Type"), "compute");
    assert_eq!(fields.source("NetDevs[eth0].MTU"), "compute");
    assert_eq!(fields.value("NetDevs[eth0].MTU"), "9000");
    assert_eq!(fields.source("NetDevs[eth0].Ipaddr"), "");
    assert_eq!(
        get_field_string(&node, "NetDevs[eth0].Hwaddr").unwrap(),
        "aa:bb:cc:dd:ee:01"
    );
    assert_eq!(fields.source("Tags[site]"), "default");
}

#[test]
fn profile_list_restored() {
    let (node, fields) = site().merge_node("n001").unwrap();
    assert_eq!(node.profile.profiles, vec!["gpu", "~legacy", "legacy"]);
    assert_eq!(fields.source("Profiles"), "");
    assert_eq!(fields.value("Profiles"), "gpu,~legacy,legacy");
}

#[test]
fn negated_profile_never_contributes() {
    let registry = site();
    let (node, fields) = registry.merge_node("n002").unwrap();
    assert_eq!(node.profile.comment, "");
    assert!(fields.get("Comment").is_none());
    assert_eq!(node.profile.system_overlay, vec!["compute"]);

    let (node, _) = registry.merge_node("n001").unwrap();
    assert_ne!(node.profile.comment, "should not apply");
}

#[test]
fn primary_device_derived() {
    let (node, fields) = site().merge_node("n001").unwrap();
    assert_eq!(node.profile.primary_net_dev, "eth0");
    assert!(fields.get("PrimaryNetDev").is_none());
}

#[test]
fn recorded_fields_follow_display_order() {
    let (node, fields) = site().merge_node("n001").unwrap();
    let names: Vec<&str> = fields
        .list(&node)
        .into_iter()
        .map(|f| f.field.as_str())
        .collect();
    assert_eq!(
        &names[..5],
        &[
            "Profiles",
            "Comment",
            "ClusterName",
            "RuntimeOverlay",
            "SystemOverlay"
        ]
    );
    assert_eq!(names.len(), fields.len());

    let all = list_fields(&node);
    assert_eq!(&all[..2], &["Discoverable", "AssetKey"]);
}

#[test]
fn composite_paths_render_as_json() {
    let (node, _) = site().merge_node("n001").unwrap();
    let kernel: serde_json::Value =
        serde_json::from_str(&get_field_string(&node, "Kernel").unwrap()).unwrap();
    assert_eq!(kernel["version"], "6.1");
    assert_eq!(kernel["args"], serde_json::json!(["quiet"]));

    assert_eq!(
        get_field_string(&node, "Kernel.Nope"),
        Err(FieldError::NotFound("Kernel.Nope".to_string()))
    );
    assert!(get_field_string(&node, "").is_err());
}

#[test]
fn merge_leaves_registry_untouched() {
    let registry = site();
    let before = registry.clone();
    let hash = registry.hash().unwrap();

    let first = registry.merge_node("n001").unwrap();
    let second = registry.merge_node("n001").unwrap();

    assert_eq!(first, second);
    assert_eq!(registry, before);
    assert_eq!(registry.hash().unwrap(), hash);
    assert!(registry.node("n001").unwrap().profile.kernel.is_none());
}

#[test]
fn resource_sequences_append() {
    let registry = Registry::parse(
        b"nodeprofiles:
  default:
    resources:
      fstab: [{spec: a}]
nodes:
  n1:
    profiles: [default]
    resources:
      fstab: [{spec: b}]
      motd: hello
",
    )
    .unwrap();
    let (node, fields) = registry.merge_node("n1").unwrap();

    assert_eq!(
        get_field_string(&node, "Resources[fstab]").unwrap(),
        r#"[{"spec":"a"},{"spec":"b"}]"#
    );
    assert_eq!(fields.source("Resources[fstab]"), "default,n1");
    assert_eq!(fields.source("Resources[motd]"), "");
    assert_eq!(fields.value("Resources[motd]"), "\"hello\"");
}

#[test]
fn dangling_profile_after_delete() {
    let mut registry = site();
    registry.del_profile("compute").unwrap();

    assert_eq!(registry.resolve_profiles("n001").unwrap(), vec!["gpu"]);
    let (node, _) = registry.merge_node("n001").unwrap();
    assert_eq!(node.profile.runtime_overlay, vec!["nvidia"]);
    assert!(node.profile.system_overlay.is_empty());
}
