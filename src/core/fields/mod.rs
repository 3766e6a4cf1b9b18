//! core::fields
//!
//! Path-addressed access to nested entity fields.
//!
//! # Overview
//!
//! Every entity type declares a static, ordered descriptor table (see
//! [`Schema`] and the tables in [`descriptors`]). Each descriptor pairs a
//! path segment with an accessor returning a [`Slot`], so walking an
//! entity is plain static dispatch over those tables.
//!
//! # Path Grammar
//!
//! ```text
//! Field
//! Field.Nested
//! Field[key]
//! Field[key].Nested[key2]
//! ```
//!
//! A `.` inside brackets is part of the key: `NetDevs[eth0.100].Ipaddr`
//! addresses device `eth0.100`.
//!
//! # Example
//!
//! ```
//! use nodereg::core::entity::Node;
//! use nodereg::core::fields::{get_field_string, list_fields};
//!
//! let node: Node = serde_yaml::from_str(r#"
//! network devices:
//!   default:
//!     tags: {email: x}
//! "#).unwrap();
//!
//! let paths = list_fields(&node);
//! assert!(paths.contains(&"NetDevs[default].Tags[email]".to_string()));
//! assert_eq!(get_field_string(&node, "NetDevs[default].Tags[email]").unwrap(), "x");
//! ```

pub mod descriptors;

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::entity::Resource;
use crate::core::types::HwAddr;

/// Provenance marker for a profile value hidden by a node-local value.
pub const SUPERSEDED: &str = "SUPERSEDED";

/// Errors from field addressing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// A path segment did not resolve.
    #[error("no value: {0}")]
    NotFound(String),

    /// The path itself is unusable.
    #[error("invalid field path: '{0}'")]
    InvalidPath(String),
}

/// A leaf value, borrowed from the entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    Flag(Option<bool>),
    Addr(Option<IpAddr>),
    HwAddr(Option<&'a HwAddr>),
    Number(Option<u32>),
    Opaque(&'a Resource),
}

impl FieldValue<'_> {
    /// Whether the value is unset.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(v) => v.is_empty(),
            FieldValue::Flag(v) => v.is_none(),
            FieldValue::Addr(v) => v.is_none(),
            FieldValue::HwAddr(v) => v.is_none(),
            FieldValue::Number(v) => v.is_none(),
            FieldValue::Opaque(v) => v.is_null(),
        }
    }

    /// Whether the value accumulates across merges.
    pub fn is_list(&self) -> bool {
        match self {
            FieldValue::List(_) => true,
            FieldValue::Opaque(v) => v.is_sequence(),
            _ => false,
        }
    }

    /// Canonical string form.
    ///
    /// Lists are comma-joined, flags are `true`/`false`, resources are
    /// compact JSON, unset values are `""`.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => s.to_string(),
            FieldValue::List(v) => v.join(","),
            FieldValue::Flag(v) => v.map(|b| b.to_string()).unwrap_or_default(),
            FieldValue::Addr(v) => v.map(|a| a.to_string()).unwrap_or_default(),
            FieldValue::HwAddr(v) => v.map(|h| h.to_string()).unwrap_or_default(),
            FieldValue::Number(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            FieldValue::Opaque(v) if v.is_null() => String::new(),
            FieldValue::Opaque(v) => serde_json::to_string(v).unwrap_or_else(|e| {
                debug!("resource does not render as JSON: {e}");
                String::new()
            }),
        }
    }

    fn to_json(self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            FieldValue::Text(s) => Json::from(s),
            FieldValue::List(v) => Json::from(v.to_vec()),
            FieldValue::Flag(v) => v.map(Json::from).unwrap_or(Json::Null),
            FieldValue::Addr(v) => v.map(|a| Json::from(a.to_string())).unwrap_or(Json::Null),
            FieldValue::HwAddr(v) => v.map(|h| Json::from(h.as_str())).unwrap_or(Json::Null),
            FieldValue::Number(v) => v.map(Json::from).unwrap_or(Json::Null),
            FieldValue::Opaque(v) => serde_json::to_value(v).unwrap_or_else(|e| {
                debug!("resource does not convert to JSON: {e}");
                Json::Null
            }),
        }
    }
}

/// What a descriptor's accessor hands back.
pub enum Slot<'a> {
    /// A leaf.
    Value(FieldValue<'a>),
    /// A nested record that is always present.
    Record(&'a dyn Record),
    /// An optional nested record, with an empty instance describing its shape.
    Optional(Option<&'a dyn Record>, &'static dyn Record),
    /// A record whose members are promoted into the parent's namespace.
    Inline(&'a dyn Record),
    /// A string-keyed mapping, in sorted key order.
    Map(Vec<(&'a str, Slot<'a>)>),
}

impl Slot<'_> {
    /// The leaf value, if this slot is one.
    pub fn value(&self) -> Option<FieldValue<'_>> {
        match self {
            Slot::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical string form; composites render as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Slot::Value(v) => v.render(),
            Slot::Optional(None, _) => String::new(),
            other => other.to_json().to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Slot::Value(v) => v.to_json(),
            Slot::Record(r) | Slot::Inline(r) | Slot::Optional(Some(r), _) => r.to_json(),
            Slot::Optional(None, _) => serde_json::Value::Null,
            Slot::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, slot)| (key.to_string(), slot.to_json()))
                    .collect(),
            ),
        }
    }
}

/// One row of an entity's descriptor table.
pub struct FieldDesc<T: 'static> {
    /// Path segment.
    pub name: &'static str,
    /// Accessor.
    pub get: for<'a> fn(&'a T) -> Slot<'a>,
}

/// A type with a static descriptor table.
pub trait Schema: Serialize + Sized + 'static {
    /// Members in display order.
    const FIELDS: &'static [FieldDesc<Self>];
}

/// Object-safe view over any [`Schema`] type.
pub trait Record {
    /// Every member with its current slot, in display order.
    fn members(&self) -> Vec<(&'static str, Slot<'_>)>;

    /// Canonical serialized form.
    fn to_json(&self) -> serde_json::Value;
}

impl<T: Schema> Record for T {
    fn members(&self) -> Vec<(&'static str, Slot<'_>)> {
        T::FIELDS.iter().map(|d| (d.name, (d.get)(self))).collect()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            debug!("record does not convert to JSON: {e}");
            serde_json::Value::Null
        })
    }
}

/// A field path with its rendered value and the source that supplied it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub field: String,
    pub source: String,
    pub value: String,
}

impl Field {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Record a contribution.
    ///
    /// An empty value is ignored. An empty source arriving over an
    /// existing one marks the field [`SUPERSEDED`].
    pub fn set(&mut self, source: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.value = value.to_string();
        if !self.source.is_empty() && source.is_empty() {
            self.source = SUPERSEDED.to_string();
        } else {
            self.source = source.to_string();
        }
    }
}

/// Split a path on `.` outside brackets. Empty segments are dropped.
///
/// ```
/// use nodereg::core::fields::split_path;
///
/// assert_eq!(split_path("NetDevs[eth0.100].Ipaddr"), vec!["NetDevs[eth0.100]", "Ipaddr"]);
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments.retain(|s| !s.is_empty());
    segments
}

/// Split `Name[key]` into its name and key.
///
/// Anything that is not exactly that shape is returned whole as a name,
/// which then fails to resolve.
pub fn parse_segment(segment: &str) -> (&str, Option<&str>) {
    if let Some(body) = segment.strip_suffix(']') {
        if let Some((name, key)) = body.split_once('[') {
            if !name.is_empty() && !key.is_empty() && !key.contains(']') {
                return (name, Some(key));
            }
        }
    }
    (segment, None)
}

/// Every leaf path of an entity, depth-first in display order.
///
/// Optional records are listed from their shape even when absent; map
/// entries are listed in sorted key order.
pub fn list_fields(entity: &dyn Record) -> Vec<String> {
    let mut out = Vec::new();
    walk(entity, "", &mut out);
    out
}

fn walk(record: &dyn Record, prefix: &str, out: &mut Vec<String>) {
    for (name, slot) in record.members() {
        match slot {
            Slot::Inline(inner) => walk(inner, prefix, out),
            slot => walk_slot(slot, &format!("{prefix}{name}"), out),
        }
    }
}

fn walk_slot(slot: Slot<'_>, path: &str, out: &mut Vec<String>) {
    match slot {
        Slot::Value(_) => out.push(path.to_string()),
        Slot::Record(r) | Slot::Inline(r) | Slot::Optional(Some(r), _) => {
            walk(r, &format!("{path}."), out)
        }
        Slot::Optional(None, shape) => walk(shape, &format!("{path}."), out),
        Slot::Map(entries) => {
            for (key, entry) in entries {
                walk_slot(entry, &format!("{path}[{key}]"), out);
            }
        }
    }
}

/// Resolve a path to the slot it names.
///
/// # Errors
///
/// - [`FieldError::InvalidPath`] for an empty path
/// - [`FieldError::NotFound`] if any segment is unknown, names an absent
///   map key, or passes through an absent optional record
pub fn get_field_value<'a>(entity: &'a dyn Record, path: &str) -> Result<Slot<'a>, FieldError> {
    let segments = split_path(path);
    if segments.is_empty() {
        return Err(FieldError::InvalidPath(path.to_string()));
    }

    let not_found = || FieldError::NotFound(path.to_string());
    let mut current = Slot::Inline(entity);
    for segment in segments {
        let record = match current {
            Slot::Record(r) | Slot::Inline(r) | Slot::Optional(Some(r), _) => r,
            _ => return Err(not_found()),
        };
        let (name, key) = parse_segment(segment);
        let slot = member(record, name).ok_or_else(not_found)?;
        current = match key {
            None => slot,
            Some(key) => match slot {
                Slot::Map(entries) => entries
                    .into_iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, s)| s)
                    .ok_or_else(not_found)?,
                _ => return Err(not_found()),
            },
        };
    }
    Ok(current)
}

/// Resolve a path and render it canonically.
pub fn get_field_string(entity: &dyn Record, path: &str) -> Result<String, FieldError> {
    get_field_value(entity, path).map(|slot| slot.render())
}

/// Every listed path with its rendered value, no source.
pub fn field_list(entity: &dyn Record) -> Vec<Field> {
    list_fields(entity)
        .into_iter()
        .filter_map(|path| {
            let value = get_field_string(entity, &path).ok()?;
            Some(Field {
                field: path,
                source: String::new(),
                value,
            })
        })
        .collect()
}

fn member<'a>(record: &'a dyn Record, name: &str) -> Option<Slot<'a>> {
    for (field, slot) in record.members() {
        match slot {
            Slot::Inline(inner) if field != name => {
                if let Some(found) = member(inner, name) {
                    return Some(found);
                }
            }
            slot if field == name => return Some(slot),
            _ => {}
        }
    }
    None
}
