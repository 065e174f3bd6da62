//! Identifiers for containers, parts and documents
#![allow(clippy::must_use_candidate)] // Small value constructors read clearly without #[must_use].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::PartContainer;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);
static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one container instance.
///
/// Never persisted. Survives reconciliation for parts whose persisted id is
/// unchanged, which makes it the key for validation caching and message
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate the next instance id.
    pub fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique identity of a document scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey(u64);

impl DocumentKey {
    /// Allocate the next document key.
    pub fn next() -> Self {
        Self(NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// Persisted id of a model part, unique among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(String);

impl PartId {
    /// Wrap an id read from persisted state. Surrounding whitespace is dropped.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PartId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Lookup table over one container tree.
///
/// Part ids are only unique among siblings, so parts are addressed either by
/// their [`InstanceId`] or by the path of part ids from the root.
pub struct IdMap<'a> {
    by_instance: HashMap<InstanceId, &'a dyn PartContainer>,
    by_path: HashMap<Vec<PartId>, InstanceId>,
}

impl<'a> IdMap<'a> {
    /// Index every container below (and including) `root`.
    pub fn build(root: &'a dyn PartContainer) -> Self {
        let mut map = Self {
            by_instance: HashMap::new(),
            by_path: HashMap::new(),
        };
        map.index(root, &mut Vec::new());
        map
    }

    fn index(&mut self, container: &'a dyn PartContainer, path: &mut Vec<PartId>) {
        self.by_instance.insert(container.instance(), container);
        self.by_path.insert(path.clone(), container.instance());
        for child in container.core().children() {
            path.push(child.id().clone());
            self.index(child, path);
            path.pop();
        }
    }

    /// Resolve a container by instance identity.
    pub fn get(&self, instance: InstanceId) -> Option<&'a dyn PartContainer> {
        self.by_instance.get(&instance).copied()
    }

    /// Resolve a part by its id path from the root. The empty path is the root.
    pub fn resolve(&self, path: &[PartId]) -> Option<&'a dyn PartContainer> {
        self.by_path
            .get(path)
            .and_then(|instance| self.get(*instance))
    }

    /// Id path of the given instance, if it is part of the tree.
    pub fn path_of(&self, instance: InstanceId) -> Option<&[PartId]> {
        self.by_path
            .iter()
            .find(|(_, candidate)| **candidate == instance)
            .map(|(path, _)| path.as_slice())
    }

    /// Number of indexed containers.
    pub fn len(&self) -> usize {
        self.by_instance.len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_instance.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ids_are_unique() {
        let a = InstanceId::next();
        let b = InstanceId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_part_id_is_trimmed() {
        assert_eq!(PartId::new("  abc \n").as_str(), "abc");
        assert_eq!(PartId::from("x"), PartId::new("x"));
    }

    #[test]
    fn test_generated_part_ids_differ() {
        assert_ne!(PartId::generate(), PartId::generate());
    }
}
