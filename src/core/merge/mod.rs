//! core::merge
//!
//! Effective node computation with per-field provenance.
//!
//! # Algorithm
//!
//! 1. Look up the raw node (`NotFound` if absent).
//! 2. Start from an empty node.
//! 3. Fold in each profile of the node's closure, in order, using the
//!    [`policy`]. After each profile, every field that profile sets is
//!    recorded with the profile as its source; list fields accumulate a
//!    comma-joined source list.
//! 4. Fold in the node's own values. A node-local scalar over a
//!    profile-supplied one is marked [`SUPERSEDED`](crate::core::fields::SUPERSEDED);
//!    a node-local list appends the node's name to the source list.
//! 5. Restore the node's literal profile list with an empty source.
//! 6. Select the primary network device.
//!
//! The result depends only on the registry snapshot, so merging the same
//! node twice yields identical output.
//!
//! # Example
//!
//! ```
//! use nodereg::core::registry::Registry;
//!
//! let registry = Registry::parse(br#"
//! nodeprofiles:
//!   p1: {comment: A}
//! nodes:
//!   n1: {profiles: [p1]}
//! "#).unwrap();
//!
//! let (node, fields) = registry.merge_node("n1").unwrap();
//! assert_eq!(node.profile.comment, "A");
//! assert_eq!(fields.source("Comment"), "p1");
//! ```

pub mod policy;
pub mod provenance;

pub use policy::Merge;
pub use provenance::FieldMap;

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::entity::{NetDev, Node};
use crate::core::fields::{get_field_string, get_field_value, list_fields, FieldValue, Record};
use crate::core::registry::{Registry, RegistryError};

const PROFILES_FIELD: &str = "Profiles";

/// Compute the effective node `id` and its field provenance.
///
/// # Errors
///
/// [`RegistryError::NotFound`] if the node does not exist.
pub fn merge_node(registry: &Registry, id: &str) -> Result<(Node, FieldMap), RegistryError> {
    let original = registry.node(id)?;
    let closure = registry.resolve_profiles(id)?;

    let mut node = Node::default();
    let mut fields = FieldMap::new();

    for name in &closure {
        let Ok(profile) = registry.profile(name) else {
            continue;
        };
        let before = node.clone();
        node.profile.merge_from(profile);
        record(&mut fields, &before, &node, profile, name, false);
    }

    let before = node.clone();
    node.merge_from(original);
    record(&mut fields, &before, &node, original, id, true);

    node.profile.profiles.clone_from(&original.profile.profiles);
    fields.remove(PROFILES_FIELD);
    fields.set(PROFILES_FIELD, "", &original.profile.profiles.join(","));

    if let Some(primary) = select_primary(&node.profile.net_devs, &node.profile.primary_net_dev) {
        if primary != node.profile.primary_net_dev {
            debug!("{id}: primary network device is {primary}");
            node.profile.primary_net_dev = primary;
        }
    }

    Ok((node, fields))
}

/// Record every non-empty field of `contributor` against the merged node.
///
/// `before` is the merged node as it was before `contributor` was folded
/// in. `node_local` contributions carry an empty source (so they supersede
/// a profile's scalar), except on lists that appended, where `name` is
/// appended to the source list.
fn record(
    fields: &mut FieldMap,
    before: &Node,
    merged: &Node,
    contributor: &dyn Record,
    name: &str,
    node_local: bool,
) {
    for path in list_fields(contributor) {
        let Ok(slot) = get_field_value(contributor, &path) else {
            continue;
        };
        let Some(value) = slot.value() else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let previous = fields.source(&path);
        let accumulates = value.is_list() && appended(before, &path, &value);
        let source = if accumulates && !previous.is_empty() {
            format!("{previous},{name}")
        } else if node_local {
            String::new()
        } else {
            name.to_string()
        };

        if let Ok(merged_value) = get_field_string(merged, &path) {
            fields.set(&path, &source, &merged_value);
        }
    }
}

/// Whether a list value was appended to what `before` held at `path`.
///
/// Typed lists always append. A resource sequence appends only onto an
/// existing sequence; over anything else it replaced the earlier value.
fn appended(before: &Node, path: &str, value: &FieldValue) -> bool {
    match value {
        FieldValue::Opaque(_) => get_field_value(before, path)
            .ok()
            .and_then(|slot| slot.value().map(|prior| prior.is_list()))
            .unwrap_or(false),
        _ => true,
    }
}

/// Choose the primary network device.
///
/// The explicit selection wins if it names a device; otherwise the first
/// device (in name order) flagged primary; otherwise the first device.
pub fn select_primary(net_devs: &BTreeMap<String, NetDev>, explicit: &str) -> Option<String> {
    if net_devs.contains_key(explicit) {
        return Some(explicit.to_string());
    }
    net_devs
        .iter()
        .find(|(_, dev)| dev.is_primary())
        .or_else(|| net_devs.iter().next())
        .map(|(name, _)| name.clone())
}
