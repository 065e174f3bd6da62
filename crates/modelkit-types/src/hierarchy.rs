//! Cycle-safe type hierarchy resolver
//!
//! A hierarchy is built once from a root type and then queried. Every walk,
//! both while building and while querying, keeps a visited set keyed by
//! qualified name, so cyclic supertype references terminate.

use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::lookup::{HierarchyType, TypeLookup};

#[derive(Debug)]
struct Node<'a, T> {
    ty: &'a T,
    supertype: Option<String>,
    subtypes: Vec<String>,
}

/// Resolved supertype or subtype graph around a root type
#[derive(Debug)]
pub struct TypeHierarchy<'a, T> {
    root: String,
    nodes: IndexMap<String, Node<'a, T>>,
    contains_cycle: bool,
}

impl<'a, T: HierarchyType> TypeHierarchy<'a, T> {
    fn with_root(root: &'a T) -> Self {
        let name = root.qualified_name().to_string();
        let mut nodes = IndexMap::new();
        nodes.insert(
            name.clone(),
            Node {
                ty: root,
                supertype: None,
                subtypes: Vec::new(),
            },
        );
        Self {
            root: name,
            nodes,
            contains_cycle: false,
        }
    }

    fn link(&mut self, subtype: &str, supertype: &'a T) {
        let super_name = supertype.qualified_name().to_string();
        self.nodes
            .entry(super_name.clone())
            .or_insert_with(|| Node {
                ty: supertype,
                supertype: None,
                subtypes: Vec::new(),
            })
            .subtypes
            .push(subtype.to_string());
        if let Some(node) = self.nodes.get_mut(subtype) {
            node.supertype = Some(super_name);
        }
    }

    /// The root and all of its direct and indirect supertypes
    pub fn supertype_hierarchy(root: &'a T, lookup: &impl TypeLookup<'a, T>) -> Self {
        let mut hierarchy = Self::with_root(root);
        let mut current = root;

        while let Some(reference) = current.supertype_ref() {
            let Some(supertype) = lookup.find_type(reference) else {
                debug!(ty = current.qualified_name(), supertype = reference, "Supertype not resolved");
                break;
            };
            let seen = hierarchy.nodes.contains_key(supertype.qualified_name());
            hierarchy.link(current.qualified_name(), supertype);
            if seen {
                debug!(ty = current.qualified_name(), supertype = reference, "Supertype cycle detected");
                hierarchy.contains_cycle = true;
                break;
            }
            current = supertype;
        }
        hierarchy
    }

    /// The root and every candidate whose supertype chain reaches the root
    pub fn subtype_hierarchy(root: &'a T, lookup: &impl TypeLookup<'a, T>) -> Self {
        let mut hierarchy = Self::with_root(root);
        let candidates: Vec<(&'a T, String)> = lookup
            .subtype_candidates()
            .into_iter()
            .filter_map(|candidate| {
                let reference = candidate.supertype_ref()?;
                // Candidates of dependent projects may reference types the
                // lookup cannot see; the reference is the qualified name then.
                let supertype = lookup
                    .find_type(reference)
                    .map_or(reference, HierarchyType::qualified_name);
                Some((candidate, supertype.to_string()))
            })
            .collect();

        let mut visited: HashSet<String> = HashSet::from([hierarchy.root.clone()]);
        let mut linked: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([hierarchy.root.clone()]);

        while let Some(name) = queue.pop_front() {
            for (candidate, _) in candidates.iter().filter(|(_, supertype)| *supertype == name) {
                let candidate_name = candidate.qualified_name().to_string();
                if !linked.insert(candidate_name.clone()) {
                    continue;
                }
                if !hierarchy.nodes.contains_key(&candidate_name) {
                    hierarchy.nodes.insert(
                        candidate_name.clone(),
                        Node {
                            ty: *candidate,
                            supertype: None,
                            subtypes: Vec::new(),
                        },
                    );
                }
                let supertype = hierarchy.nodes[&name].ty;
                hierarchy.link(&candidate_name, supertype);

                if visited.insert(candidate_name.clone()) {
                    queue.push_back(candidate_name);
                } else {
                    debug!(ty = %candidate_name, "Subtype cycle detected");
                    hierarchy.contains_cycle = true;
                }
            }
        }
        hierarchy
    }

    /// The type the hierarchy was built from
    #[must_use]
    pub fn root(&self) -> &'a T {
        self.nodes[&self.root].ty
    }

    /// Whether a supertype reference cycle was found while building
    #[must_use]
    pub fn contains_cycle(&self) -> bool {
        self.contains_cycle
    }

    /// Every type in the hierarchy
    pub fn types(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.nodes.values().map(|node| node.ty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn is_part_of_hierarchy(&self, qualified_name: &str) -> bool {
        self.nodes.contains_key(qualified_name)
    }

    /// The hierarchy's own instance of `ty`
    pub(crate) fn resolve(&self, ty: &T) -> Option<&'a T> {
        self.nodes.get(ty.qualified_name()).map(|node| node.ty)
    }

    /// Direct supertype, none for the top type or an unresolved reference
    #[must_use]
    pub fn supertype_of(&self, ty: &T) -> Option<&'a T> {
        self.nodes
            .get(ty.qualified_name())
            .and_then(|node| node.supertype.as_deref())
            .and_then(|name| self.nodes.get(name))
            .map(|node| node.ty)
    }

    /// Walk of supertypes, nearest first, stopping at the first revisit
    pub fn supertypes(&self, ty: &T) -> SupertypeChain<'_, 'a, T> {
        SupertypeChain {
            hierarchy: self,
            current: ty.qualified_name().to_string(),
            visited: HashSet::from([ty.qualified_name().to_string()]),
        }
    }

    /// All supertypes, nearest first, excluding `ty`
    #[must_use]
    pub fn all_supertypes(&self, ty: &T) -> Vec<&'a T> {
        self.supertypes(ty).collect()
    }

    /// `ty` followed by all of its supertypes
    #[must_use]
    pub fn all_supertypes_incl_self(&self, ty: &T) -> Vec<&'a T> {
        self.resolve(ty)
            .into_iter()
            .chain(self.supertypes(ty))
            .collect()
    }

    /// Direct subtypes in discovery order
    #[must_use]
    pub fn subtypes_of(&self, ty: &T) -> Vec<&'a T> {
        self.nodes
            .get(ty.qualified_name())
            .map(|node| {
                node.subtypes
                    .iter()
                    .filter_map(|name| self.nodes.get(name))
                    .map(|sub| sub.ty)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All direct and indirect subtypes, breadth first, excluding `ty`
    #[must_use]
    pub fn all_subtypes_of(&self, ty: &T) -> Vec<&'a T> {
        let start = ty.qualified_name().to_string();
        let mut visited = HashSet::from([start.clone()]);
        let mut queue = VecDeque::from([start]);
        let mut result = Vec::new();

        while let Some(name) = queue.pop_front() {
            let Some(node) = self.nodes.get(&name) else {
                continue;
            };
            for sub in &node.subtypes {
                if visited.insert(sub.clone()) {
                    if let Some(sub_node) = self.nodes.get(sub) {
                        result.push(sub_node.ty);
                    }
                    queue.push_back(sub.clone());
                }
            }
        }
        result
    }

    /// Whether `supertype` is a proper supertype of `subtype`; false when
    /// either side is absent
    #[must_use]
    pub fn is_subtype_of(&self, subtype: Option<&T>, supertype: Option<&T>) -> bool {
        let (Some(subtype), Some(supertype)) = (subtype, supertype) else {
            return false;
        };
        self.supertypes(subtype)
            .any(|candidate| candidate.qualified_name() == supertype.qualified_name())
    }

    /// Whether `supertype` is a proper supertype of `subtype`, arguments
    /// in reverse order
    #[must_use]
    pub fn is_supertype_of(&self, supertype: Option<&T>, subtype: Option<&T>) -> bool {
        self.is_subtype_of(subtype, supertype)
    }
}

/// Iterator over the supertypes of one type with a visited guard
pub struct SupertypeChain<'h, 'a, T> {
    hierarchy: &'h TypeHierarchy<'a, T>,
    current: String,
    visited: HashSet<String>,
}

impl<'a, T: HierarchyType> Iterator for SupertypeChain<'_, 'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.hierarchy.nodes.get(&self.current)?;
        let next = node.supertype.as_ref()?;
        if !self.visited.insert(next.clone()) {
            return None;
        }
        let next_node = self.hierarchy.nodes.get(next)?;
        self.current.clone_from(next);
        Some(next_node.ty)
    }
}
