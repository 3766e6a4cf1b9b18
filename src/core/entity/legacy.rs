//! core::entity::legacy
//!
//! Best-effort upgrade of renamed entity fields.
//!
//! Older registry documents used different keys for a few fields. The
//! upgrade runs on the untyped YAML tree before typed parsing so that the
//! entity structs only ever know the current vocabulary:
//!
//! - `container name` becomes `image name` (an existing `image name` wins)
//! - `keys` is folded into `tags` (existing `tags` entries win)
//!
//! Kernel arguments stored as one string are handled by
//! [`codec::words`](super::codec::words) during typed parsing.

use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Upgrade one node or profile document in place.
///
/// `kind` and `name` only feed the log message.
pub fn upgrade(kind: &str, name: &str, entity: &mut Value) {
    let Some(map) = entity.as_mapping_mut() else {
        return;
    };

    if let Some(image) = map.remove("container name") {
        warn!("{kind} {name}: upgrading 'container name' to 'image name'");
        if !map.contains_key("image name") {
            map.insert(Value::from("image name"), image);
        }
    }

    if let Some(keys) = map.remove("keys") {
        warn!("{kind} {name}: folding legacy 'keys' into 'tags'");
        if let Value::Mapping(keys) = keys {
            let tags = map
                .entry(Value::from("tags"))
                .or_insert(Value::Mapping(Mapping::new()));
            if tags.is_null() {
                *tags = Value::Mapping(Mapping::new());
            }
            if let Some(tags) = tags.as_mapping_mut() {
                for (key, value) in keys {
                    if !tags.contains_key(&key) {
                        tags.insert(key, value);
                    }
                }
            }
        }
    }
}

/// Upgrade every entity under `section` (`nodes` or `nodeprofiles`).
pub fn upgrade_section(doc: &mut Value, section: &str, kind: &str) {
    let Some(entities) = doc.get_mut(section).and_then(Value::as_mapping_mut) else {
        return;
    };
    for (name, entity) in entities.iter_mut() {
        let name = name.as_str().unwrap_or("?");
        upgrade(kind, name, entity);
    }
}
