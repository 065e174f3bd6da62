//! Type and member abstractions and type lookup
//!
//! The hierarchy resolver works on any type implementing [`HierarchyType`];
//! textual supertype references are resolved through a [`TypeLookup`].

use indexmap::IndexMap;
use modelkit_core::{PartContainer, ProjectContext};

/// An attribute or method as seen by member queries
pub trait TypeMember {
    fn name(&self) -> &str;

    /// Identity used for override matching; the name unless overridden
    fn signature(&self) -> String {
        self.name().to_string()
    }

    /// Whether the member is declared to override an inherited one
    fn overrides(&self) -> bool;

    fn is_abstract(&self) -> bool {
        false
    }
}

/// A type taking part in a single-inheritance hierarchy
pub trait HierarchyType {
    type Attribute: TypeMember;
    type Method: TypeMember;

    /// Identity of the type within a lookup
    fn qualified_name(&self) -> &str;

    /// Textual reference to the direct supertype
    fn supertype_ref(&self) -> Option<&str>;

    fn is_abstract(&self) -> bool;

    /// Attributes in declaration order
    fn attributes(&self) -> Vec<&Self::Attribute>;

    /// Methods in declaration order
    fn methods(&self) -> Vec<&Self::Method>;
}

/// Resolves type references.
///
/// Implementations search the requesting project and, transitively, its
/// dependencies. Dependency cycles are the lookup's concern.
pub trait TypeLookup<'a, T: HierarchyType + 'a> {
    /// Type with the given qualified name
    fn find_type(&self, qualified_name: &str) -> Option<&'a T>;

    /// Every type that may be a subtype: the project's own types and those
    /// of all projects depending on it
    fn subtype_candidates(&self) -> Vec<&'a T>;
}

/// In-memory lookup over a fixed set of types
#[derive(Debug)]
pub struct TypeIndex<'a, T> {
    types: IndexMap<String, &'a T>,
}

impl<'a, T: HierarchyType> TypeIndex<'a, T> {
    /// Index `types` by qualified name; the first of equally named types wins
    pub fn new(types: impl IntoIterator<Item = &'a T>) -> Self {
        let mut index = IndexMap::new();
        for ty in types {
            index.entry(ty.qualified_name().to_string()).or_insert(ty);
        }
        Self { types: index }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<'a, T: HierarchyType> TypeLookup<'a, T> for TypeIndex<'a, T> {
    fn find_type(&self, qualified_name: &str) -> Option<&'a T> {
        self.types.get(qualified_name).copied()
    }

    fn subtype_candidates(&self) -> Vec<&'a T> {
        self.types.values().copied().collect()
    }
}

/// Lookup over the root objects a [`ProjectContext`] exposes
#[derive(Clone, Copy)]
pub struct ContextLookup<'a> {
    project: &'a dyn ProjectContext,
}

impl<'a> ContextLookup<'a> {
    #[must_use]
    pub fn new(project: &'a dyn ProjectContext) -> Self {
        Self { project }
    }
}

impl std::fmt::Debug for ContextLookup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLookup")
            .field("project", &self.project.project_name())
            .finish()
    }
}

impl<'a, T> TypeLookup<'a, T> for ContextLookup<'a>
where
    T: HierarchyType + PartContainer,
{
    fn find_type(&self, qualified_name: &str) -> Option<&'a T> {
        self.project
            .find_object(qualified_name)
            .and_then(|object| object.downcast_ref::<T>())
    }

    fn subtype_candidates(&self) -> Vec<&'a T> {
        self.project
            .objects()
            .into_iter()
            .chain(self.project.dependent_objects())
            .filter_map(|object| object.downcast_ref::<T>())
            .collect()
    }
}
