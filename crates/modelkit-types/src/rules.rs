//! Semantic rules of the component type family
//!
//! Rules report through message codes that stay stable across releases so
//! reports can be grouped and filtered by code.

use std::collections::HashMap;
use std::sync::LazyLock;

use modelkit_core::{Message, MessageList, PartContainer};
use regex::Regex;

use crate::attribute::{PROPERTY_NAME as ATTRIBUTE_NAME, PROPERTY_OVERRIDES};
use crate::component::{ComponentType, PROPERTY_ABSTRACT, PROPERTY_SUPERTYPE};
use crate::hierarchy::TypeHierarchy;
use crate::lookup::HierarchyType;

pub const SUPERTYPE_NOT_FOUND: &str = "SUPERTYPE_NOT_FOUND";
pub const SUPERTYPE_CYCLE: &str = "SUPERTYPE_CYCLE";
pub const ABSTRACT_METHOD_NOT_IMPLEMENTED: &str = "ABSTRACT_METHOD_NOT_IMPLEMENTED";
pub const OVERRIDDEN_ATTRIBUTE_NOT_FOUND: &str = "OVERRIDDEN_ATTRIBUTE_NOT_FOUND";
pub const DUPLICATE_ATTRIBUTE_NAME: &str = "DUPLICATE_ATTRIBUTE_NAME";
pub const INVALID_NAME: &str = "INVALID_NAME";
pub const DATATYPE_MISSING: &str = "DATATYPE_MISSING";
pub const ASSOCIATION_TARGET_NOT_FOUND: &str = "ASSOCIATION_TARGET_NOT_FOUND";
pub const INVALID_CARDINALITY: &str = "INVALID_CARDINALITY";
pub const DUPLICATE_PARAMETER_NAME: &str = "DUPLICATE_PARAMETER_NAME";

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Whether `name` is usable as a member identifier
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|re| re.is_match(name))
}

/// Report `name` unless it is a valid identifier
pub fn check_name(
    container: &dyn PartContainer,
    property: &str,
    name: &str,
    messages: &mut MessageList,
) {
    if !is_valid_name(name) {
        messages.add(
            Message::error(
                INVALID_NAME,
                format!("'{name}' is not a valid {} name", container.kind()),
            )
            .with_ref(container.property_ref(property)),
        );
    }
}

/// Unresolved supertype reference and supertype cycles.
///
/// A cycle is reported once, against the validated type's own supertype
/// property, no matter how many types take part in it.
pub fn check_supertype(
    ty: &ComponentType,
    hierarchy: &TypeHierarchy<'_, ComponentType>,
    messages: &mut MessageList,
) {
    let Some(reference) = ty.supertype_ref() else {
        return;
    };
    if hierarchy.supertype_of(ty).is_none() {
        messages.add(
            Message::error(
                SUPERTYPE_NOT_FOUND,
                format!("Supertype '{reference}' does not exist"),
            )
            .with_ref(ty.property_ref(PROPERTY_SUPERTYPE)),
        );
    }
    if hierarchy.contains_cycle() {
        messages.add(
            Message::error(
                SUPERTYPE_CYCLE,
                format!(
                    "The supertype hierarchy of '{}' contains a cycle",
                    ty.qualified_name()
                ),
            )
            .with_ref(ty.property_ref(PROPERTY_SUPERTYPE)),
        );
    }
}

/// Abstract methods a concrete type inherits without implementing
pub fn check_abstract_methods(
    ty: &ComponentType,
    hierarchy: &TypeHierarchy<'_, ComponentType>,
    messages: &mut MessageList,
) {
    if ty.is_abstract() {
        return;
    }
    for method in hierarchy.override_candidates(ty, true) {
        messages.add(
            Message::error(
                ABSTRACT_METHOD_NOT_IMPLEMENTED,
                format!(
                    "'{}' must implement the abstract method '{}'",
                    ty.qualified_name(),
                    method.signature()
                ),
            )
            .with_ref(ty.property_ref(PROPERTY_ABSTRACT)),
        );
    }
}

/// Attributes marked as overriding without an inherited attribute of that name
pub fn check_overridden_attributes(
    ty: &ComponentType,
    hierarchy: &TypeHierarchy<'_, ComponentType>,
    messages: &mut MessageList,
) {
    // On a cyclic chain the walk never returns to `ty` itself.
    let supertypes = hierarchy.all_supertypes(ty);
    for attribute in ty.attributes().filter(|a| a.is_overriding()) {
        let overridden = supertypes.iter().find_map(|s| s.attribute(attribute.name()));
        if overridden.is_none() {
            messages.add(
                Message::error(
                    OVERRIDDEN_ATTRIBUTE_NOT_FOUND,
                    format!(
                        "Attribute '{}' overrides nothing: no supertype declares it",
                        attribute.name()
                    ),
                )
                .with_ref(attribute.property_ref(PROPERTY_OVERRIDES)),
            );
        }
    }
}

/// Attribute names declared more than once by the same type; every
/// occurrence after the first is reported
pub fn check_duplicate_attributes(ty: &ComponentType, messages: &mut MessageList) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for attribute in ty.attributes() {
        let count = counts.entry(attribute.name()).or_insert(0);
        *count += 1;
        if *count > 1 {
            messages.add(
                Message::error(
                    DUPLICATE_ATTRIBUTE_NAME,
                    format!(
                        "'{}' declares attribute '{}' more than once",
                        ty.qualified_name(),
                        attribute.name()
                    ),
                )
                .with_ref(attribute.property_ref(ATTRIBUTE_NAME)),
            );
        }
    }
}
