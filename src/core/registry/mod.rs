//! core::registry
//!
//! The node/profile document and everything that operates on it.
//!
//! # Document Format
//!
//! ```yaml
//! nodeprofiles:
//!   default:
//!     comment: base settings
//! nodes:
//!   n001:
//!     profiles: [default]
//! ```
//!
//! Both top-level keys are optional on input and always written on
//! output. Maps are sorted and empty fields omitted, so the serialized
//! form is canonical: two registries with the same content produce the
//! same bytes and therefore the same [`Fingerprint`].
//!
//! # Optimistic Concurrency
//!
//! Mutating callers present a [`Precondition`]: either the fingerprint
//! they observed when they read the registry, or an explicit force. A
//! stale fingerprint is refused with [`RegistryError::Conflict`], which is
//! never conflated with `NotFound` or `AlreadyExists`.
//!
//! # Example
//!
//! ```
//! use nodereg::core::registry::{Precondition, Registry};
//!
//! let mut registry = Registry::default();
//! registry.add_profile("default").unwrap();
//! registry.add_node("n001").unwrap();
//!
//! let seen = registry.hash().unwrap();
//! registry.check(&Precondition::Hash(seen)).unwrap();
//!
//! let reparsed = Registry::parse(registry.to_document().unwrap().as_bytes()).unwrap();
//! assert_eq!(reparsed.hash().unwrap(), seen);
//! ```

pub mod store;

pub use store::RegistryStore;

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::entity::{codec, legacy, Node, Profile};
use crate::core::fields::FieldError;
use crate::core::merge::{self, FieldMap};
use crate::core::resolve::ProfileResolver;
use crate::core::types::{EntityName, Fingerprint, HwAddr};

/// Which map a name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Profile,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Profile => write!(f, "profile"),
        }
    }
}

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    /// No discoverable node has an interface left to claim.
    #[error("no unconfigured discoverable node found")]
    NoDiscoverable,

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: EntityKind, name: String },

    /// The registry changed since the caller read it.
    #[error("registry changed since it was read: expected {expected}, found {actual}")]
    Conflict {
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error("malformed registry: {0}")]
    Malformed(String),

    #[error("failed to serialize registry: {0}")]
    Serialize(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl RegistryError {
    /// Whether this is one of the "does not exist" conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound { .. }
                | RegistryError::NoDiscoverable
                | RegistryError::Field(FieldError::NotFound(_))
        )
    }

    fn not_found(kind: EntityKind, name: &str) -> Self {
        RegistryError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

/// Guard for a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Apply only if the registry still has this fingerprint.
    Hash(Fingerprint),
    /// Apply unconditionally.
    Force,
}

/// The full node/profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(rename = "nodeprofiles", default)]
    profiles: BTreeMap<String, Profile>,

    #[serde(default)]
    nodes: BTreeMap<String, Node>,
}

impl Registry {
    /// Parse a registry document.
    ///
    /// An empty document is an empty registry. Scalars in text fields are
    /// read as their literal text, and legacy field names are upgraded
    /// before typed parsing.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Malformed`] on invalid YAML or any invalid typed
    /// field (address, hardware address, flag, number).
    pub fn parse(bytes: &[u8]) -> Result<Self, RegistryError> {
        let mut doc: Value =
            serde_yaml::from_slice(bytes).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        if doc.is_null() {
            return Ok(Self::default());
        }
        if !doc.is_mapping() {
            return Err(RegistryError::Malformed(
                "top level must be a mapping".to_string(),
            ));
        }

        for (section, kind) in [("nodeprofiles", "profile"), ("nodes", "node")] {
            normalize_section(&mut doc, section);
            legacy::upgrade_section(&mut doc, section, kind);
        }

        let registry: Registry =
            serde_yaml::from_value(doc).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        debug!(
            "parsed registry: {} profiles, {} nodes",
            registry.profiles.len(),
            registry.nodes.len()
        );
        Ok(registry)
    }

    /// Serialize a flattened copy of the registry.
    pub fn to_document(&self) -> Result<String, RegistryError> {
        let mut flat = self.clone();
        flat.flatten();
        serde_yaml::to_string(&flat).map_err(|e| RegistryError::Serialize(e.to_string()))
    }

    /// Fingerprint of the canonical document.
    pub fn hash(&self) -> Result<Fingerprint, RegistryError> {
        Ok(Fingerprint::compute(self.to_document()?.as_bytes()))
    }

    /// Verify a precondition against the current content.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Conflict`] if the fingerprint does not match.
    pub fn check(&self, precondition: &Precondition) -> Result<(), RegistryError> {
        match precondition {
            Precondition::Force => Ok(()),
            Precondition::Hash(expected) => {
                let actual = self.hash()?;
                if *expected == actual {
                    Ok(())
                } else {
                    Err(RegistryError::Conflict {
                        expected: *expected,
                        actual,
                    })
                }
            }
        }
    }

    /// Clear empty optional substructures on every entity.
    pub fn flatten(&mut self) {
        self.profiles.values_mut().for_each(Profile::flatten);
        self.nodes.values_mut().for_each(Node::flatten);
    }

    // =========================================================================
    // Lookup and CRUD
    // =========================================================================

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    pub fn profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    /// The raw (unmerged) node.
    pub fn node(&self, id: &str) -> Result<&Node, RegistryError> {
        self.nodes
            .get(id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Node, id))
    }

    pub fn node_mut(&mut self, id: &str) -> Result<&mut Node, RegistryError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Node, id))
    }

    pub fn profile(&self, id: &str) -> Result<&Profile, RegistryError> {
        self.profiles
            .get(id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Profile, id))
    }

    pub fn profile_mut(&mut self, id: &str) -> Result<&mut Profile, RegistryError> {
        self.profiles
            .get_mut(id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Profile, id))
    }

    /// Add a node belonging to the `default` profile.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Malformed`] if the name is not a valid [`EntityName`]
    /// - [`RegistryError::AlreadyExists`] if the name is taken
    pub fn add_node(&mut self, name: &str) -> Result<&mut Node, RegistryError> {
        let name = validate_name(name)?;
        if self.nodes.contains_key(name.as_str()) {
            return Err(RegistryError::AlreadyExists {
                kind: EntityKind::Node,
                name: name.into(),
            });
        }
        info!("adding node {name}");
        Ok(self
            .nodes
            .entry(name.into())
            .or_insert_with(|| Node::with_profiles(["default"])))
    }

    /// Add an empty profile.
    pub fn add_profile(&mut self, name: &str) -> Result<&mut Profile, RegistryError> {
        let name = validate_name(name)?;
        if self.profiles.contains_key(name.as_str()) {
            return Err(RegistryError::AlreadyExists {
                kind: EntityKind::Profile,
                name: name.into(),
            });
        }
        info!("adding profile {name}");
        Ok(self.profiles.entry(name.into()).or_default())
    }

    pub fn del_node(&mut self, name: &str) -> Result<Node, RegistryError> {
        let node = self
            .nodes
            .remove(name)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Node, name))?;
        info!("deleted node {name}");
        Ok(node)
    }

    pub fn del_profile(&mut self, name: &str) -> Result<Profile, RegistryError> {
        let profile = self
            .profiles
            .remove(name)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Profile, name))?;
        info!("deleted profile {name}");
        Ok(profile)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// The profile closure of a node.
    pub fn resolve_profiles(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        let node = self.node(id)?;
        Ok(ProfileResolver::new(&self.profiles).closure(id, &node.profile.profiles))
    }

    /// The effective node and its field provenance.
    pub fn merge_node(&self, id: &str) -> Result<(Node, FieldMap), RegistryError> {
        merge::merge_node(self, id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All node names, sorted.
    pub fn list_all_nodes(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// All profile names, sorted.
    pub fn list_all_profiles(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Nodes listing `profile` directly.
    pub fn list_nodes_using_profile(&self, profile: &str) -> Vec<String> {
        select(&self.nodes, |n| n.profile.profiles.iter().any(|p| p == profile))
    }

    /// Profiles listing `profile` directly.
    pub fn list_profiles_using_profile(&self, profile: &str) -> Vec<String> {
        select(&self.profiles, |p| p.profiles.iter().any(|p| p == profile))
    }

    pub fn list_nodes_using_image(&self, image: &str) -> Vec<String> {
        select(&self.nodes, |n| n.profile.image_name == image)
    }

    pub fn list_profiles_using_image(&self, image: &str) -> Vec<String> {
        select(&self.profiles, |p| p.image_name == image)
    }

    /// Nodes naming `overlay` in either overlay list.
    pub fn list_nodes_using_overlay(&self, overlay: &str) -> Vec<String> {
        select(&self.nodes, |n| uses_overlay(&n.profile, overlay))
    }

    pub fn list_profiles_using_overlay(&self, overlay: &str) -> Vec<String> {
        select(&self.profiles, |p| uses_overlay(p, overlay))
    }

    /// Merged nodes, sorted by cluster name and then id.
    ///
    /// An empty `names` selects every node.
    pub fn find_all_nodes(&self, names: &[String]) -> Result<Vec<(String, Node)>, RegistryError> {
        let ids = if names.is_empty() {
            self.list_all_nodes()
        } else {
            names.to_vec()
        };
        let mut merged = ids
            .into_iter()
            .map(|id| {
                let (node, _) = self.merge_node(&id)?;
                Ok((id, node))
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        merged.sort_by(|(a_id, a), (b_id, b)| {
            (&a.profile.cluster_name, a_id).cmp(&(&b.profile.cluster_name, b_id))
        });
        Ok(merged)
    }

    /// Raw profiles, sorted by cluster name and then id.
    ///
    /// An empty `names` selects every profile.
    pub fn find_all_profiles(
        &self,
        names: &[String],
    ) -> Result<Vec<(String, Profile)>, RegistryError> {
        let ids = if names.is_empty() {
            self.list_all_profiles()
        } else {
            names.to_vec()
        };
        let mut profiles = ids
            .into_iter()
            .map(|id| {
                let profile = self.profile(&id)?.clone();
                Ok((id, profile))
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        profiles.sort_by(|(a_id, a), (b_id, b)| {
            (&a.cluster_name, a_id).cmp(&(&b.cluster_name, b_id))
        });
        Ok(profiles)
    }

    /// The merged node owning a hardware address.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Malformed`] if `hwaddr` is not a MAC address
    /// - [`RegistryError::NotFound`] if no node has it
    pub fn find_by_hwaddr(&self, hwaddr: &str) -> Result<(String, Node), RegistryError> {
        let wanted = HwAddr::new(hwaddr).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        self.find_node(hwaddr, |node| {
            node.profile
                .net_devs
                .values()
                .any(|dev| dev.hwaddr.as_ref() == Some(&wanted))
        })
    }

    /// The merged node owning an IP address.
    pub fn find_by_ipaddr(&self, ipaddr: IpAddr) -> Result<(String, Node), RegistryError> {
        self.find_node(&ipaddr.to_string(), |node| {
            node.profile
                .net_devs
                .values()
                .any(|dev| dev.ipaddr == Some(ipaddr) || dev.ip6addr == Some(ipaddr))
        })
    }

    /// The first discoverable node with an interface to claim.
    ///
    /// Returns the node id, the merged node, and the interface to claim:
    /// the primary device if it has no hardware address yet, else the
    /// first device without one. Nodes with every device claimed are
    /// skipped.
    pub fn find_discoverable_node(&self) -> Result<(String, Node, String), RegistryError> {
        for (id, node) in self.find_all_nodes(&[])? {
            if !node.is_discoverable() {
                continue;
            }
            let primary = node
                .profile
                .primary_device()
                .filter(|(_, dev)| dev.hwaddr.is_none())
                .map(|(name, _)| name.to_string());
            let unclaimed = primary.or_else(|| {
                node.profile
                    .net_devs
                    .iter()
                    .find(|(_, dev)| dev.hwaddr.is_none())
                    .map(|(name, _)| name.clone())
            });
            if let Some(netdev) = unclaimed {
                return Ok((id, node, netdev));
            }
        }
        Err(RegistryError::NoDiscoverable)
    }

    fn find_node(
        &self,
        what: &str,
        matches: impl Fn(&Node) -> bool,
    ) -> Result<(String, Node), RegistryError> {
        self.find_all_nodes(&[])?
            .into_iter()
            .find(|(_, node)| matches(node))
            .ok_or_else(|| RegistryError::not_found(EntityKind::Node, what))
    }
}

fn validate_name(name: &str) -> Result<EntityName, RegistryError> {
    EntityName::new(name).map_err(|e| RegistryError::Malformed(e.to_string()))
}

fn select<T>(entities: &BTreeMap<String, T>, pred: impl Fn(&T) -> bool) -> Vec<String> {
    entities
        .iter()
        .filter(|(_, entity)| pred(entity))
        .map(|(name, _)| name.clone())
        .collect()
}

fn uses_overlay(profile: &Profile, overlay: &str) -> bool {
    profile
        .runtime_overlay
        .iter()
        .chain(&profile.system_overlay)
        .any(|o| o == overlay)
}

/// Make a null section, and null entities inside it, empty mappings.
fn normalize_section(doc: &mut Value, section: &str) {
    let Some(value) = doc.get_mut(section) else {
        return;
    };
    if value.is_null() {
        *value = Value::Mapping(Mapping::new());
    }
    if let Some(entities) = value.as_mapping_mut() {
        for (_, entity) in entities.iter_mut() {
            if entity.is_null() {
                *entity = Value::Mapping(Mapping::new());
            }
            codec::stringify_scalars(entity);
        }
    }
}
