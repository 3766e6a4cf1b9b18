//! core::fields::descriptors
//!
//! Descriptor tables for every entity type.
//!
//! Table order is display order. Path segment names are the stable,
//! user-facing field names (`NetDevs[eth0].Ipaddr`), independent of the
//! YAML keys used on disk.

use std::collections::BTreeMap;
use std::net::IpAddr;

use super::{FieldDesc, FieldValue, Record, Schema, Slot};
use crate::core::entity::{
    Disk, FileSystem, IpmiConf, KernelConf, NetDev, Node, Partition, Profile, Resource,
};
use crate::core::types::HwAddr;

static EMPTY_KERNEL: KernelConf = KernelConf {
    version: String::new(),
    args: Vec::new(),
};

static EMPTY_IPMI: IpmiConf = IpmiConf {
    username: String::new(),
    password: String::new(),
    ipaddr: None,
    gateway: None,
    netmask: None,
    port: String::new(),
    interface: String::new(),
    escapechar: String::new(),
    write: None,
    template: String::new(),
    tags: BTreeMap::new(),
};

fn text(s: &str) -> Slot<'_> {
    Slot::Value(FieldValue::Text(s))
}

fn list(v: &[String]) -> Slot<'_> {
    Slot::Value(FieldValue::List(v))
}

fn flag<'a>(v: Option<bool>) -> Slot<'a> {
    Slot::Value(FieldValue::Flag(v))
}

fn addr<'a>(v: Option<IpAddr>) -> Slot<'a> {
    Slot::Value(FieldValue::Addr(v))
}

fn number<'a>(v: Option<u32>) -> Slot<'a> {
    Slot::Value(FieldValue::Number(v))
}

fn hwaddr(v: &Option<HwAddr>) -> Slot<'_> {
    Slot::Value(FieldValue::HwAddr(v.as_ref()))
}

fn optional<'a, R: Record>(v: &'a Option<R>, shape: &'static dyn Record) -> Slot<'a> {
    Slot::Optional(v.as_ref().map(|r| r as &dyn Record), shape)
}

fn strings(m: &BTreeMap<String, String>) -> Slot<'_> {
    Slot::Map(m.iter().map(|(k, v)| (k.as_str(), text(v))).collect())
}

fn records<R: Record>(m: &BTreeMap<String, R>) -> Slot<'_> {
    Slot::Map(
        m.iter()
            .map(|(k, v)| (k.as_str(), Slot::Record(v as &dyn Record)))
            .collect(),
    )
}

fn resources(m: &BTreeMap<String, Resource>) -> Slot<'_> {
    Slot::Map(
        m.iter()
            .map(|(k, v)| (k.as_str(), Slot::Value(FieldValue::Opaque(v))))
            .collect(),
    )
}

impl Schema for Node {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Discoverable", get: |n| flag(n.discoverable) },
        FieldDesc { name: "AssetKey", get: |n| text(&n.asset_key) },
        FieldDesc { name: "Profile", get: |n| Slot::Inline(&n.profile) },
    ];
}

impl Schema for Profile {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Profiles", get: |p| list(&p.profiles) },
        FieldDesc { name: "Comment", get: |p| text(&p.comment) },
        FieldDesc { name: "ClusterName", get: |p| text(&p.cluster_name) },
        FieldDesc { name: "ImageName", get: |p| text(&p.image_name) },
        FieldDesc { name: "Ipxe", get: |p| text(&p.ipxe) },
        FieldDesc { name: "RuntimeOverlay", get: |p| list(&p.runtime_overlay) },
        FieldDesc { name: "SystemOverlay", get: |p| list(&p.system_overlay) },
        FieldDesc { name: "Kernel", get: |p| optional(&p.kernel, &EMPTY_KERNEL) },
        FieldDesc { name: "Ipmi", get: |p| optional(&p.ipmi, &EMPTY_IPMI) },
        FieldDesc { name: "Init", get: |p| text(&p.init) },
        FieldDesc { name: "Root", get: |p| text(&p.root) },
        FieldDesc { name: "NetDevs", get: |p| records(&p.net_devs) },
        FieldDesc { name: "Tags", get: |p| strings(&p.tags) },
        FieldDesc { name: "PrimaryNetDev", get: |p| text(&p.primary_net_dev) },
        FieldDesc { name: "Disks", get: |p| records(&p.disks) },
        FieldDesc { name: "FileSystems", get: |p| records(&p.file_systems) },
        FieldDesc { name: "Resources", get: |p| resources(&p.resources) },
    ];
}

impl Schema for KernelConf {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Version", get: |k| text(&k.version) },
        FieldDesc { name: "Args", get: |k| list(&k.args) },
    ];
}

impl Schema for IpmiConf {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "UserName", get: |i| text(&i.username) },
        FieldDesc { name: "Password", get: |i| text(&i.password) },
        FieldDesc { name: "Ipaddr", get: |i| addr(i.ipaddr) },
        FieldDesc { name: "Gateway", get: |i| addr(i.gateway) },
        FieldDesc { name: "Netmask", get: |i| addr(i.netmask) },
        FieldDesc { name: "Port", get: |i| text(&i.port) },
        FieldDesc { name: "Interface", get: |i| text(&i.interface) },
        FieldDesc { name: "EscapeChar", get: |i| text(&i.escapechar) },
        FieldDesc { name: "Write", get: |i| flag(i.write) },
        FieldDesc { name: "Template", get: |i| text(&i.template) },
        FieldDesc { name: "Tags", get: |i| strings(&i.tags) },
    ];
}

impl Schema for NetDev {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Type", get: |d| text(&d.kind) },
        FieldDesc { name: "OnBoot", get: |d| flag(d.onboot) },
        FieldDesc { name: "Device", get: |d| text(&d.device) },
        FieldDesc { name: "Hwaddr", get: |d| hwaddr(&d.hwaddr) },
        FieldDesc { name: "Ipaddr", get: |d| addr(d.ipaddr) },
        FieldDesc { name: "Ipaddr6", get: |d| addr(d.ip6addr) },
        FieldDesc { name: "Netmask", get: |d| addr(d.netmask) },
        FieldDesc { name: "Gateway", get: |d| addr(d.gateway) },
        FieldDesc { name: "MTU", get: |d| number(d.mtu) },
        FieldDesc { name: "Primary", get: |d| flag(d.primary) },
        FieldDesc { name: "Tags", get: |d| strings(&d.tags) },
    ];
}

impl Schema for Disk {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "WipeTable", get: |d| flag(d.wipe_table) },
        FieldDesc { name: "Partitions", get: |d| records(&d.partitions) },
    ];
}

impl Schema for Partition {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Number", get: |p| number(p.number) },
        FieldDesc { name: "SizeMiB", get: |p| number(p.size_mib) },
        FieldDesc { name: "StartMiB", get: |p| number(p.start_mib) },
        FieldDesc { name: "TypeGuid", get: |p| text(&p.type_guid) },
        FieldDesc { name: "Guid", get: |p| text(&p.guid) },
        FieldDesc { name: "WipePartitionEntry", get: |p| flag(p.wipe_partition_entry) },
        FieldDesc { name: "ShouldExist", get: |p| flag(p.should_exist) },
        FieldDesc { name: "Resize", get: |p| flag(p.resize) },
    ];
}

impl Schema for FileSystem {
    const FIELDS: &'static [FieldDesc<Self>] = &[
        FieldDesc { name: "Format", get: |f| text(&f.format) },
        FieldDesc { name: "Path", get: |f| text(&f.path) },
        FieldDesc { name: "WipeFileSystem", get: |f| flag(f.wipe_filesystem) },
        FieldDesc { name: "Label", get: |f| text(&f.label) },
        FieldDesc { name: "Uuid", get: |f| text(&f.uuid) },
        FieldDesc { name: "Options", get: |f| list(&f.options) },
        FieldDesc { name: "MountOptions", get: |f| text(&f.mount_options) },
    ];
}
