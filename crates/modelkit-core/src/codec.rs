//! Element codec for part containers
//!
//! Writing produces one element per container: scalar properties, the
//! extension property block, labels and descriptions, then one child element
//! per part in collection order. Reading reconciles an existing container
//! against an element: parts whose id and kind match are updated in place and
//! keep their identity, new ids create parts, absent ids vanish.

use std::collections::HashSet;
use tracing::{debug, trace};

use crate::container::PartContainer;
use crate::extension::{self, EXTENSION_PROPERTIES_TAG};
use crate::id::PartId;
use crate::labels::{DESCRIPTION_TAG, LABEL_TAG};
use crate::xml::XmlElement;
use crate::{Error, Result};

/// Attribute holding a part's id
pub const ID_ATTRIBUTE: &str = "id";

const RESERVED_TAGS: [&str; 3] = [EXTENSION_PROPERTIES_TAG, LABEL_TAG, DESCRIPTION_TAG];

fn is_reserved(tag: &str) -> bool {
    RESERVED_TAGS.contains(&tag)
}

/// Serialize a container and its subtree
#[must_use]
pub fn to_xml(container: &dyn PartContainer) -> XmlElement {
    let mut element = XmlElement::new(container.kind());
    if container.core().is_part() {
        element.set_attribute(ID_ATTRIBUTE, container.id().as_str());
    }
    container.write_properties(&mut element);
    extension::write_block(container, &mut element);
    if let Some(labels) = container.label_support() {
        labels.write_xml(&mut element);
    }
    for child in container.core().children() {
        element.children.push(to_xml(child));
    }
    element
}

/// Reconcile `container` with `element`.
///
/// A part container takes its id from the element's `id` attribute when one
/// is present. No change events are fired.
///
/// # Errors
///
/// Fails with [`Error::DuplicatePartId`] when two sibling parts in the
/// element share an id, leaving the container untouched, or with the error of
/// a container's property reader.
pub fn init_from_xml(container: &mut dyn PartContainer, element: &XmlElement) -> Result<()> {
    check_sibling_ids(container, element)?;
    if container.core().is_part() {
        if let Some(id) = element.text_attribute(ID_ATTRIBUTE) {
            container.core_mut().set_id(PartId::new(id));
        }
    }
    reconcile(container, element)
}

/// Like [`init_from_xml`] but assigns `id` regardless of the element's attribute
///
/// # Errors
///
/// See [`init_from_xml`].
pub fn init_from_xml_with_id(
    container: &mut dyn PartContainer,
    element: &XmlElement,
    id: PartId,
) -> Result<()> {
    check_sibling_ids(container, element)?;
    container.core_mut().set_id(id);
    reconcile(container, element)
}

/// Ids of managed child parts must be unique per container, across
/// collections. Ignored and unmanaged tags are not looked into.
fn check_sibling_ids(container: &dyn PartContainer, element: &XmlElement) -> Result<()> {
    let ignored = container.ignored_tags();
    let mut seen: HashSet<PartId> = HashSet::new();
    for child in &element.children {
        if is_reserved(&child.name) || ignored.contains(&child.name.as_str()) {
            continue;
        }
        let Some(index) = container.core().collection_index_for_tag(&child.name) else {
            continue;
        };
        if let Some(id) = child.text_attribute(ID_ATTRIBUTE).map(PartId::new) {
            if seen.contains(&id) {
                return Err(Error::duplicate_part_id(id.as_str(), &child.name));
            }
            seen.insert(id);
        }
        let blank = container.core().blank_part(index);
        check_sibling_ids(blank.as_ref(), child)?;
    }
    Ok(())
}

fn reconcile(container: &mut dyn PartContainer, element: &XmlElement) -> Result<()> {
    container.read_properties(element)?;
    extension::read_block(container, element);
    if let Some(labels) = container.label_support_mut() {
        labels.read_xml(element);
    }

    let mut existing = container.core_mut().take_parts();
    let ignored = container.ignored_tags();

    for child in &element.children {
        if is_reserved(&child.name) || ignored.contains(&child.name.as_str()) {
            continue;
        }
        let Some(index) = container.core().collection_index_for_tag(&child.name) else {
            trace!(kind = container.kind(), tag = %child.name, "Child element is not a managed part");
            continue;
        };

        let id = child.text_attribute(ID_ATTRIBUTE).map_or_else(
            || {
                let id = PartId::generate();
                debug!(kind = container.kind(), tag = %child.name, id = %id, "Part without id, assigned a fresh one");
                id
            },
            PartId::new,
        );

        let mut part = match existing.remove(&id) {
            Some(part) if part.kind() == child.name => part,
            _ => container.core().instantiate(index, id),
        };
        reconcile(part.as_mut(), child)?;
        container.core_mut().push_part(index, part);
    }

    if !existing.is_empty() {
        debug!(kind = container.kind(), removed = existing.len(), "Parts absent from element dropped");
    }
    Ok(())
}
