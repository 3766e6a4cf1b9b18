//! core::resolve
//!
//! Profile closure computation.
//!
//! # Architecture
//!
//! Profiles form a directed graph where each profile lists its parents.
//! A node's closure is a depth-first walk of that graph starting from the
//! node's own profile list:
//!
//! - Entries are visited in list order; each newly added profile is
//!   followed immediately by its own parents
//! - A name already in the closure is never visited again, which also
//!   breaks cycles
//! - A `~name` entry suppresses later additions of `name` for the rest of
//!   the walk; it never removes a profile that is already in the closure
//! - Every list is scanned for negations before its includes are processed
//! - Undefined profiles are skipped with a warning
//!
//! Later positions in the closure take merge precedence.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use nodereg::core::entity::Profile;
//! use nodereg::core::resolve::ProfileResolver;
//!
//! let mut profiles = BTreeMap::new();
//! profiles.insert("p1".to_string(), Profile { profiles: vec!["p2".into()], ..Profile::default() });
//! profiles.insert("p2".to_string(), Profile::default());
//!
//! let closure = ProfileResolver::new(&profiles).closure("n1", &["p1".to_string()]);
//! assert_eq!(closure, vec!["p1", "p2"]);
//! ```

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use super::entity::Profile;
use super::types::ProfileRef;

/// Computes profile closures against a fixed set of profiles.
#[derive(Debug, Clone, Copy)]
pub struct ProfileResolver<'a> {
    profiles: &'a BTreeMap<String, Profile>,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(profiles: &'a BTreeMap<String, Profile>) -> Self {
        Self { profiles }
    }

    /// Resolve the closure of a direct profile list.
    ///
    /// `owner` names the node (or profile) the list belongs to and is used
    /// only for diagnostics.
    pub fn closure(&self, owner: &str, direct: &[String]) -> Vec<String> {
        let mut walk = Walk {
            resolver: *self,
            owner,
            closure: Vec::new(),
            negated: HashSet::new(),
        };
        walk.visit(direct);
        debug!("{owner}: profile closure {:?}", walk.closure);
        walk.closure
    }
}

struct Walk<'a, 'o> {
    resolver: ProfileResolver<'a>,
    owner: &'o str,
    closure: Vec<String>,
    negated: HashSet<String>,
}

impl Walk<'_, '_> {
    fn visit(&mut self, list: &[String]) {
        let entries: Vec<ProfileRef> = list.iter().filter_map(|e| ProfileRef::parse(e)).collect();

        for entry in &entries {
            if let ProfileRef::Exclude(name) = entry {
                self.negated.insert(name.clone());
            }
        }

        for entry in entries {
            let ProfileRef::Include(name) = entry else {
                continue;
            };
            if self.closure.contains(&name) || self.negated.contains(&name) {
                continue;
            }
            match self.resolver.profiles.get(&name) {
                Some(profile) => {
                    self.closure.push(name);
                    self.visit(&profile.profiles);
                }
                None => warn!("{}: profile not found: {name}", self.owner),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(parents: &[&str]) -> Profile {
        Profile {
            profiles: parents.iter().map(|s| s.to_string()).collect(),
            ..Profile::default()
        }
    }

    fn registry(entries: &[(&str, &[&str])]) -> BTreeMap<String, Profile> {
        entries
            .iter()
            .map(|(name, parents)| (name.to_string(), profile(parents)))
            .collect()
    }

    fn resolve(profiles: &BTreeMap<String, Profile>, direct: &[&str]) -> Vec<String> {
        let direct: Vec<String> = direct.iter().map(|s| s.to_string()).collect();
        ProfileResolver::new(profiles).closure("n1", &direct)
    }

    #[test]
    fn empty_list() {
        let profiles = registry(&[("default", &[])]);
        assert!(resolve(&profiles, &[]).is_empty());
    }

    #[test]
    fn transitive_chain() {
        let profiles = registry(&[("p1", &["p2"]), ("p2", &["p3"]), ("p3", &[])]);
        assert_eq!(resolve(&profiles, &["p1"]), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn depth_first_order() {
        let profiles = registry(&[
            ("a", &["a1"]),
            ("a1", &[]),
            ("b", &["b1"]),
            ("b1", &[]),
        ]);
        assert_eq!(resolve(&profiles, &["a", "b"]), vec!["a", "a1", "b", "b1"]);
    }

    #[test]
    fn later_negation_does_not_remove() {
        let profiles = registry(&[("p1", &[]), ("p2", &["~p1"])]);
        assert_eq!(resolve(&profiles, &["p1", "p2"]), vec!["p1", "p2"]);
    }

    #[test]
    fn negation_suppresses_later_additions() {
        let profiles = registry(&[("p1", &["~p3"]), ("p2", &["p3"]), ("p3", &[])]);
        assert_eq!(resolve(&profiles, &["p1", "p2"]), vec!["p1", "p2"]);
    }

    #[test]
    fn negation_in_same_list_applies_first() {
        let profiles = registry(&[("p1", &[]), ("p2", &[])]);
        assert_eq!(resolve(&profiles, &["p1", "p2", "~p1"]), vec!["p2"]);
    }

    #[test]
    fn duplicates_collapsed() {
        let profiles = registry(&[("p1", &["common"]), ("p2", &["common"]), ("common", &[])]);
        assert_eq!(
            resolve(&profiles, &["p1", "p2", "p1"]),
            vec!["p1", "common", "p2"]
        );
    }

    #[test]
    fn cycles_terminate() {
        let profiles = registry(&[("p1", &["p2"]), ("p2", &["p1"])]);
        assert_eq!(resolve(&profiles, &["p1"]), vec!["p1", "p2"]);

        let profiles = registry(&[("self", &["self"])]);
        assert_eq!(resolve(&profiles, &["self"]), vec!["self"]);
    }

    #[test]
    fn undefined_profiles_skipped() {
        let profiles = registry(&[("p1", &["ghost"]), ("p2", &[])]);
        assert_eq!(resolve(&profiles, &["missing", "p1", "p2"]), vec!["p1", "p2"]);
    }

    #[test]
    fn blank_entries_ignored() {
        let profiles = registry(&[("p1", &[])]);
        assert_eq!(resolve(&profiles, &["", " p1 ", "~"]), vec!["p1"]);
    }
}
