//! core::merge::provenance
//!
//! Per-resolution record of which source supplied each merged field.

use std::collections::BTreeMap;

use crate::core::fields::{list_fields, Field, Record};

/// Merged value and source per field path.
///
/// Built fresh by every merge; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<String, Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contribution to `name`. See [`Field::set`].
    pub fn set(&mut self, name: &str, source: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.fields
            .entry(name.to_string())
            .or_insert_with(|| Field::new(name))
            .set(source, value);
    }

    /// Source of `name`, or `""` if it has none.
    pub fn source(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |f| f.source.as_str())
    }

    /// Merged value of `name`, or `""` if it has none.
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |f| f.value.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    /// Recorded fields in the display order of `entity`.
    pub fn list(&self, entity: &dyn Record) -> Vec<&Field> {
        list_fields(entity)
            .iter()
            .filter_map(|name| self.fields.get(name))
            .collect()
    }

    /// Recorded fields in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Node;
    use crate::core::fields::SUPERSEDED;

    #[test]
    fn absent_fields_are_blank() {
        let map = FieldMap::new();
        assert_eq!(map.source("Comment"), "");
        assert_eq!(map.value("Comment"), "");
        assert!(map.get("Comment").is_none());
    }

    #[test]
    fn empty_values_not_recorded() {
        let mut map = FieldMap::new();
        map.set("Comment", "p1", "");
        assert!(map.is_empty());
    }

    #[test]
    fn supersede() {
        let mut map = FieldMap::new();
        map.set("Comment", "p1", "A");
        map.set("Comment", "", "B");
        assert_eq!(map.source("Comment"), SUPERSEDED);
        assert_eq!(map.value("Comment"), "B");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn list_follows_display_order() {
        let mut map = FieldMap::new();
        map.set("Tags[a]", "p1", "x");
        map.set("Comment", "p1", "c");
        map.set("Discoverable", "", "true");
        let mut node = Node::default();
        node.profile.tags.insert("a".into(), "x".into());

        let order: Vec<&str> = map.list(&node).iter().map(|f| f.field.as_str()).collect();
        assert_eq!(order, vec!["Discoverable", "Comment", "Tags[a]"]);

        let sorted: Vec<&str> = map.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(sorted, vec!["Comment", "Discoverable", "Tags[a]"]);
    }

    #[test]
    fn list_skips_paths_missing_from_entity() {
        let mut map = FieldMap::new();
        map.set("Tags[gone]", "p1", "x");
        assert!(map.list(&Node::default()).is_empty());
    }
}
