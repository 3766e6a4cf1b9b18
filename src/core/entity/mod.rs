//! core::entity
//!
//! The registry's data model: nodes, profiles and their substructures.
//!
//! # Schema Design
//!
//! - A [`Node`] is a [`Profile`] plus a discoverability flag and an asset
//!   key. The embedded profile is flattened, so both documents share one
//!   field vocabulary on disk.
//! - Typed fields (addresses, flags, numbers) are validated at load time
//!   through [`codec`]; a bad value fails the load, never the merge.
//! - Every field is omitted from output when empty, and optional
//!   substructures are cleared by [`Profile::flatten`], so persisted
//!   documents carry no empty placeholders.
//! - Maps are `BTreeMap`, so anything that iterates them is sorted.
//!
//! # Example
//!
//! ```
//! use nodereg::core::entity::Node;
//!
//! let node: Node = serde_yaml::from_str(r#"
//! discoverable: true
//! profiles: [default]
//! network devices:
//!   eth0:
//!     hwaddr: AA:BB:CC:DD:EE:FF
//!     ipaddr: 10.0.0.5
//! "#).unwrap();
//!
//! assert_eq!(node.discoverable, Some(true));
//! assert_eq!(node.profile.profiles, vec!["default"]);
//! assert_eq!(node.profile.net_devs["eth0"].hwaddr.as_ref().unwrap().as_str(), "aa:bb:cc:dd:ee:ff");
//! ```

pub mod codec;
pub mod legacy;

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::core::types::HwAddr;

/// An opaque resource payload.
///
/// Resources are consumed by overlay templates; the registry only stores
/// and merges them.
pub type Resource = serde_yaml::Value;

/// A managed machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Whether the node may claim an unknown hardware address.
    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub discoverable: Option<bool>,

    #[serde(rename = "asset key", default, skip_serializing_if = "String::is_empty")]
    pub asset_key: String,

    /// Profile-shaped settings; applies identically to nodes.
    #[serde(flatten)]
    pub profile: Profile,
}

impl Node {
    /// A node that belongs to the given profiles and nothing else.
    pub fn with_profiles<I, S>(profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            profile: Profile {
                profiles: profiles.into_iter().map(Into::into).collect(),
                ..Profile::default()
            },
            ..Self::default()
        }
    }

    /// Whether the discoverable flag is set and true.
    pub fn is_discoverable(&self) -> bool {
        self.discoverable.unwrap_or(false)
    }

    /// Clear empty optional substructures.
    pub fn flatten(&mut self) {
        self.profile.flatten();
    }
}

/// A reusable, inheritable settings bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Parent profiles; `~name` entries are negations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    #[serde(rename = "cluster name", default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,

    #[serde(rename = "image name", default, skip_serializing_if = "String::is_empty")]
    pub image_name: String,

    #[serde(rename = "ipxe template", default, skip_serializing_if = "String::is_empty")]
    pub ipxe: String,

    #[serde(
        rename = "runtime overlay",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub runtime_overlay: Vec<String>,

    #[serde(
        rename = "system overlay",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub system_overlay: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelConf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipmi: Option<IpmiConf>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub init: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root: String,

    #[serde(
        rename = "network devices",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub net_devs: BTreeMap<String, NetDev>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(
        rename = "primary network",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub primary_net_dev: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub disks: BTreeMap<String, Disk>,

    #[serde(
        rename = "filesystems",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub file_systems: BTreeMap<String, FileSystem>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, Resource>,
}

impl Profile {
    /// Clear optional substructures whose every field is empty.
    ///
    /// Map entries (a network device with no settings, say) are left
    /// alone; removing those is the caller's decision.
    pub fn flatten(&mut self) {
        if self.kernel.as_ref().is_some_and(KernelConf::is_empty) {
            self.kernel = None;
        }
        if self.ipmi.as_ref().is_some_and(IpmiConf::is_empty) {
            self.ipmi = None;
        }
    }

    /// System overlays with `~` negations applied.
    pub fn effective_system_overlay(&self) -> Vec<String> {
        clean_list(&self.system_overlay)
    }

    /// Runtime overlays with `~` negations applied.
    pub fn effective_runtime_overlay(&self) -> Vec<String> {
        clean_list(&self.runtime_overlay)
    }

    /// Kernel arguments with `~` negations applied.
    pub fn effective_kernel_args(&self) -> Vec<String> {
        self.kernel
            .as_ref()
            .map(|k| clean_list(&k.args))
            .unwrap_or_default()
    }

    /// The selected primary network device, if it exists.
    pub fn primary_device(&self) -> Option<(&str, &NetDev)> {
        self.net_devs
            .get_key_value(&self.primary_net_dev)
            .map(|(name, dev)| (name.as_str(), dev))
    }
}

/// Kernel selection and command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConf {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(
        default,
        deserialize_with = "codec::words",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub args: Vec<String>,
}

impl KernelConf {
    pub fn is_empty(&self) -> bool {
        self.version.is_empty() && self.args.is_empty()
    }
}

/// Baseboard management controller access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpmiConf {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub ipaddr: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub netmask: Option<IpAddr>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interface: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub escapechar: String,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub write: Option<bool>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl IpmiConf {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One network interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetDev {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub onboot: Option<bool>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,

    #[serde(
        default,
        deserialize_with = "codec::hwaddr",
        skip_serializing_if = "Option::is_none"
    )]
    pub hwaddr: Option<HwAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub ipaddr: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip6addr: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub netmask: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::addr",
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway: Option<IpAddr>,

    #[serde(
        default,
        deserialize_with = "codec::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub mtu: Option<u32>,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl NetDev {
    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }
}

/// A block device and its partition table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub wipe_table: Option<bool>,

    /// Keyed by partition label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub partitions: BTreeMap<String, Partition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    #[serde(
        default,
        deserialize_with = "codec::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<u32>,

    #[serde(
        default,
        deserialize_with = "codec::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_mib: Option<u32>,

    #[serde(
        default,
        deserialize_with = "codec::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_mib: Option<u32>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_guid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guid: String,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub wipe_partition_entry: Option<bool>,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub should_exist: Option<bool>,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub resize: Option<bool>,
}

/// A filesystem, keyed by the device it lives on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSystem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(
        default,
        deserialize_with = "codec::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub wipe_filesystem: Option<bool>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_options: String,
}

/// Apply `~item` negations to a list.
///
/// Each `~x` removes every earlier occurrence of `x` and is itself
/// dropped. Later plain `x` entries are kept.
///
/// ```
/// use nodereg::core::entity::clean_list;
///
/// let raw = vec!["a".into(), "b".into(), "~a".into(), "c".into()];
/// assert_eq!(clean_list(&raw), vec!["b", "c"]);
/// ```
pub fn clean_list(list: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for item in list {
        match item.strip_prefix('~') {
            Some(negated) => out.retain(|kept| kept != negated),
            None => out.push(item.clone()),
        }
    }
    out
}
