//! core::merge::policy
//!
//! Field-merge policy by kind:
//! - Scalars: a set value replaces (empty strings and `None` are unset)
//! - Lists: appended
//! - String maps: merged per key
//! - Record maps: deep-merged per key
//! - Optional records: deep-merged when both sides are present
//! - Resources: sequences append, anything else replaces

use std::collections::BTreeMap;

use crate::core::entity::{
    Disk, FileSystem, IpmiConf, KernelConf, NetDev, Node, Partition, Profile, Resource,
};

/// Fold a higher-precedence value into `self`.
pub trait Merge {
    fn merge_from(&mut self, other: &Self);
}

fn text(dst: &mut String, src: &str) {
    if !src.is_empty() {
        *dst = src.to_string();
    }
}

fn scalar<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if src.is_some() {
        dst.clone_from(src);
    }
}

fn list(dst: &mut Vec<String>, src: &[String]) {
    dst.extend_from_slice(src);
}

fn string_map(dst: &mut BTreeMap<String, String>, src: &BTreeMap<String, String>) {
    for (key, value) in src {
        match dst.get_mut(key) {
            Some(existing) => text(existing, value),
            None => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

fn record_map<T: Merge + Clone>(dst: &mut BTreeMap<String, T>, src: &BTreeMap<String, T>) {
    for (key, value) in src {
        match dst.get_mut(key) {
            Some(existing) => existing.merge_from(value),
            None => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

fn optional<T: Merge + Clone>(dst: &mut Option<T>, src: &Option<T>) {
    match (dst.as_mut(), src) {
        (Some(existing), Some(value)) => existing.merge_from(value),
        (None, Some(value)) => *dst = Some(value.clone()),
        (_, None) => {}
    }
}

fn resource_map(dst: &mut BTreeMap<String, Resource>, src: &BTreeMap<String, Resource>) {
    for (key, value) in src {
        match dst.get_mut(key) {
            Some(Resource::Sequence(existing)) if value.is_sequence() => {
                if let Resource::Sequence(more) = value {
                    existing.extend(more.iter().cloned());
                }
            }
            Some(existing) => {
                if !value.is_null() {
                    *existing = value.clone();
                }
            }
            None => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

impl Merge for Node {
    fn merge_from(&mut self, other: &Self) {
        scalar(&mut self.discoverable, &other.discoverable);
        text(&mut self.asset_key, &other.asset_key);
        self.profile.merge_from(&other.profile);
    }
}

impl Merge for Profile {
    fn merge_from(&mut self, other: &Self) {
        list(&mut self.profiles, &other.profiles);
        text(&mut self.comment, &other.comment);
        text(&mut self.cluster_name, &other.cluster_name);
        text(&mut self.image_name, &other.image_name);
        text(&mut self.ipxe, &other.ipxe);
        list(&mut self.runtime_overlay, &other.runtime_overlay);
        list(&mut self.system_overlay, &other.system_overlay);
        optional(&mut self.kernel, &other.kernel);
        optional(&mut self.ipmi, &other.ipmi);
        text(&mut self.init, &other.init);
        text(&mut self.root, &other.root);
        record_map(&mut self.net_devs, &other.net_devs);
        string_map(&mut self.tags, &other.tags);
        text(&mut self.primary_net_dev, &other.primary_net_dev);
        record_map(&mut self.disks, &other.disks);
        record_map(&mut self.file_systems, &other.file_systems);
        resource_map(&mut self.resources, &other.resources);
    }
}

impl Merge for KernelConf {
    fn merge_from(&mut self, other: &Self) {
        text(&mut self.version, &other.version);
        list(&mut self.args, &other.args);
    }
}

impl Merge for IpmiConf {
    fn merge_from(&mut self, other: &Self) {
        text(&mut self.username, &other.username);
        text(&mut self.password, &other.password);
        scalar(&mut self.ipaddr, &other.ipaddr);
        scalar(&mut self.gateway, &other.gateway);
        scalar(&mut self.netmask, &other.netmask);
        text(&mut self.port, &other.port);
        text(&mut self.interface, &other.interface);
        text(&mut self.escapechar, &other.escapechar);
        scalar(&mut self.write, &other.write);
        text(&mut self.template, &other.template);
        string_map(&mut self.tags, &other.tags);
    }
}

impl Merge for NetDev {
    fn merge_from(&mut self, other: &Self) {
        text(&mut self.kind, &other.kind);
        scalar(&mut self.onboot, &other.onboot);
        text(&mut self.device, &other.device);
        scalar(&mut self.hwaddr, &other.hwaddr);
        scalar(&mut self.ipaddr, &other.ipaddr);
        scalar(&mut self.ip6addr, &other.ip6addr);
        scalar(&mut self.netmask, &other.netmask);
        scalar(&mut self.gateway, &other.gateway);
        scalar(&mut self.mtu, &other.mtu);
        scalar(&mut self.primary, &other.primary);
        string_map(&mut self.tags, &other.tags);
    }
}

impl Merge for Disk {
    fn merge_from(&mut self, other: &Self) {
        scalar(&mut self.wipe_table, &other.wipe_table);
        record_map(&mut self.partitions, &other.partitions);
    }
}

impl Merge for Partition {
    fn merge_from(&mut self, other: &Self) {
        scalar(&mut self.number, &other.number);
        scalar(&mut self.size_mib, &other.size_mib);
        scalar(&mut self.start_mib, &other.start_mib);
        text(&mut self.type_guid, &other.type_guid);
        text(&mut self.guid, &other.guid);
        scalar(&mut self.wipe_partition_entry, &other.wipe_partition_entry);
        scalar(&mut self.should_exist, &other.should_exist);
        scalar(&mut self.resize, &other.resize);
    }
}

impl Merge for FileSystem {
    fn merge_from(&mut self, other: &Self) {
        text(&mut self.format, &other.format);
        text(&mut self.path, &other.path);
        scalar(&mut self.wipe_filesystem, &other.wipe_filesystem);
        text(&mut self.label, &other.label);
        text(&mut self.uuid, &other.uuid);
        list(&mut self.options, &other.options);
        text(&mut self.mount_options, &other.mount_options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(yaml: &str) -> Profile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn scalar_replace() {
        let mut base = profile("comment: A\ncluster name: c1");
        base.merge_from(&profile("comment: B"));
        assert_eq!(base.comment, "B");
        assert_eq!(base.cluster_name, "c1");
    }

    #[test]
    fn empty_does_not_clear() {
        let mut base = profile("comment: A");
        base.merge_from(&Profile::default());
        assert_eq!(base.comment, "A");
    }

    #[test]
    fn false_flag_replaces() {
        let mut base = profile("network devices: {eth0: {onboot: true}}");
        base.merge_from(&profile("network devices: {eth0: {onboot: false}}"));
        assert_eq!(base.net_devs["eth0"].onboot, Some(false));
    }

    #[test]
    fn lists_append() {
        let mut base = profile("system overlay: [o1, o2]");
        base.merge_from(&profile("system overlay: [o3]"));
        assert_eq!(base.system_overlay, vec!["o1", "o2", "o3"]);
    }

    #[test]
    fn maps_merge_per_key() {
        let mut base = profile("tags: {a: '1', b: '2'}");
        base.merge_from(&profile("tags: {b: three, c: '4'}"));
        assert_eq!(base.tags["a"], "1");
        assert_eq!(base.tags["b"], "three");
        assert_eq!(base.tags["c"], "4");
    }

    #[test]
    fn net_devs_deep_merge() {
        let mut base = profile(
            "network devices: {default: {device: eth0, netmask: 255.255.0.0, tags: {x: '1'}}}",
        );
        base.merge_from(&profile(
            "network devices: {default: {ipaddr: 10.0.0.1, tags: {y: '2'}}, ib0: {type: infiniband}}",
        ));
        let dev = &base.net_devs["default"];
        assert_eq!(dev.device, "eth0");
        assert_eq!(dev.netmask, Some("255.255.0.0".parse().unwrap()));
        assert_eq!(dev.ipaddr, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(dev.tags.len(), 2);
        assert_eq!(base.net_devs["ib0"].kind, "infiniband");
    }

    #[test]
    fn optional_records() {
        let mut base = Profile::default();
        base.merge_from(&profile("kernel: {version: '6.1', args: [quiet]}"));
        base.merge_from(&profile("kernel: {args: [nosplash]}"));
        let kernel = base.kernel.unwrap();
        assert_eq!(kernel.version, "6.1");
        assert_eq!(kernel.args, vec!["quiet", "nosplash"]);
    }

    #[test]
    fn partitions_deep_merge() {
        let mut base = profile("disks: {/dev/vda: {partitions: {scratch: {number: 1}}}}");
        base.merge_from(&profile(
            "disks: {/dev/vda: {wipe_table: true, partitions: {scratch: {size_mib: 512}}}}",
        ));
        let disk = &base.disks["/dev/vda"];
        assert_eq!(disk.wipe_table, Some(true));
        assert_eq!(disk.partitions["scratch"].number, Some(1));
        assert_eq!(disk.partitions["scratch"].size_mib, Some(512));
    }

    #[test]
    fn resources() {
        let mut base = profile("resources: {fstab: [a], motd: hello}");
        base.merge_from(&profile("resources: {fstab: [b], motd: {text: bye}}"));
        assert_eq!(base.resources["fstab"], profile("resources: {x: [a, b]}").resources["x"]);
        assert!(base.resources["motd"].is_mapping());
    }

    #[test]
    fn node_fields() {
        let mut base = Node::default();
        let other: Node = serde_yaml::from_str("discoverable: true\nasset key: A1\ncomment: c").unwrap();
        base.merge_from(&other);
        assert_eq!(base, other);
    }
}
