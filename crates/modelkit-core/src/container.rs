//! Part containers
//!
//! Every model object (the root of a document) and every model part is a
//! [`PartContainer`]. The shared state lives in a [`ContainerCore`]: identity,
//! typed part collections, extension property values and the attachment to
//! a [`DocumentScope`] through which change events are fired.

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::change::{ChangeEvent, ChangeKind};
use crate::context::ValidationContext;
use crate::extension::{self, ExtValue, ExtensionPropertyRegistry};
use crate::id::{InstanceId, PartId};
use crate::labels::LabelSupport;
use crate::message::{MessageList, ObjectProperty};
use crate::scope::DocumentScope;
use crate::xml::XmlElement;
use crate::{Error, Result};

/// Shared behaviour of model objects and model parts
pub trait PartContainer: Any + Send + Sync {
    /// Shared container state
    fn core(&self) -> &ContainerCore;

    /// Shared container state, mutable
    fn core_mut(&mut self) -> &mut ContainerCore;

    /// Concrete kind; doubles as the XML tag and the extension registry key
    fn kind(&self) -> &'static str;

    /// Write the container's own scalar properties
    fn write_properties(&self, _element: &mut XmlElement) {}

    /// Read the container's own scalar properties
    ///
    /// # Errors
    ///
    /// Returns an error when a property value cannot be converted.
    fn read_properties(&mut self, _element: &XmlElement) -> Result<()> {
        Ok(())
    }

    /// Child tags the reconciliation walk must leave alone
    fn ignored_tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Label and description entries, for containers that support them
    fn label_support(&self) -> Option<&LabelSupport> {
        None
    }

    /// Label and description entries, mutable
    fn label_support_mut(&mut self) -> Option<&mut LabelSupport> {
        None
    }

    /// The container's own semantic rules
    fn validate_this(&self, _context: &ValidationContext<'_>, _messages: &mut MessageList) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Process-unique identity
    fn instance(&self) -> InstanceId {
        self.core().instance()
    }

    /// Persisted id
    fn id(&self) -> &PartId {
        self.core().id()
    }

    fn is_deleted(&self) -> bool {
        self.core().is_deleted()
    }

    /// Message reference to the whole container
    fn object_ref(&self) -> ObjectProperty {
        let reference = ObjectProperty::object(self.instance());
        if self.core().is_part() {
            reference.with_part(self.id().clone())
        } else {
            reference
        }
    }

    /// Message reference to one property of the container
    fn property_ref(&self, property: &str) -> ObjectProperty {
        let reference = ObjectProperty::property(self.instance(), property);
        if self.core().is_part() {
            reference.with_part(self.id().clone())
        } else {
            reference
        }
    }
}

impl dyn PartContainer {
    /// Downcast to a concrete container type
    #[must_use]
    pub fn downcast_ref<T: PartContainer>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete container type, mutable
    pub fn downcast_mut<T: PartContainer>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// A part type that can be created by its container
pub trait ModelPart: PartContainer + Sized {
    /// XML tag of the part
    const TAG: &'static str;

    /// Create an empty part with the given id
    fn with_id(id: PartId) -> Self;
}

fn create_part<T: ModelPart>(id: PartId) -> Box<dyn PartContainer> {
    Box::new(T::with_id(id))
}

/// Parts of one declared type, in insertion order
pub struct PartCollection {
    tag: &'static str,
    part_type: TypeId,
    factory: fn(PartId) -> Box<dyn PartContainer>,
    parts: Vec<Box<dyn PartContainer>>,
}

impl PartCollection {
    /// Collection for parts of type `T`
    #[must_use]
    pub fn of<T: ModelPart>() -> Self {
        Self {
            tag: T::TAG,
            part_type: TypeId::of::<T>(),
            factory: create_part::<T>,
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PartContainer> {
        self.parts.iter().map(Box::as_ref)
    }

    fn position(&self, id: &PartId) -> Option<usize> {
        self.parts.iter().position(|p| p.id() == id)
    }
}

impl std::fmt::Debug for PartCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartCollection")
            .field("tag", &self.tag)
            .field("parts", &self.parts.iter().map(|p| p.id()).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Attachment {
    scope: Arc<DocumentScope>,
    ancestors: Vec<InstanceId>,
}

/// State shared by every container
#[derive(Debug)]
pub struct ContainerCore {
    instance: InstanceId,
    id: PartId,
    is_part: bool,
    deleted: bool,
    qualified_name: Option<String>,
    collections: Vec<PartCollection>,
    ext_values: IndexMap<String, ExtValue>,
    tombstones: HashSet<PartId>,
    attachment: Option<Attachment>,
}

impl ContainerCore {
    /// Core of a root model object
    #[must_use]
    pub fn object() -> Self {
        Self::new(PartId::generate(), false)
    }

    /// Core of a model part
    #[must_use]
    pub fn part(id: PartId) -> Self {
        Self::new(id, true)
    }

    fn new(id: PartId, is_part: bool) -> Self {
        Self {
            instance: InstanceId::next(),
            id,
            is_part,
            deleted: false,
            qualified_name: None,
            collections: Vec::new(),
            ext_values: IndexMap::new(),
            tombstones: HashSet::new(),
            attachment: None,
        }
    }

    /// Declare a part collection. Collections are serialized in declaration order.
    #[must_use]
    pub fn with_parts<T: ModelPart>(mut self) -> Self {
        self.collections.push(PartCollection::of::<T>());
        self
    }

    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    #[must_use]
    pub fn id(&self) -> &PartId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: PartId) {
        self.id = id;
    }

    /// Whether this is a model part rather than a root object
    #[must_use]
    pub fn is_part(&self) -> bool {
        self.is_part
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Package-qualified name of a root object, assigned by its document
    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        self.qualified_name.as_deref()
    }

    pub fn set_qualified_name(&mut self, qualified_name: impl Into<String>) {
        self.qualified_name = Some(qualified_name.into());
    }

    // ------------------------------------------------------------------
    // Scope
    // ------------------------------------------------------------------

    /// Attach this container and its subtree to a document scope
    pub fn attach(&mut self, scope: Arc<DocumentScope>, ancestors: Vec<InstanceId>) {
        let mut child_ancestors = ancestors.clone();
        child_ancestors.push(self.instance);
        for part in self.parts_iter_mut() {
            part.core_mut()
                .attach(Arc::clone(&scope), child_ancestors.clone());
        }
        self.attachment = Some(Attachment { scope, ancestors });
    }

    /// Detach this container and its subtree from its scope
    pub fn detach(&mut self) {
        for part in self.parts_iter_mut() {
            part.core_mut().detach();
        }
        self.attachment = None;
    }

    #[must_use]
    pub fn scope(&self) -> Option<&Arc<DocumentScope>> {
        self.attachment.as_ref().map(|a| &a.scope)
    }

    #[must_use]
    pub fn registry(&self) -> Option<&Arc<ExtensionPropertyRegistry>> {
        self.scope().map(|scope| scope.registry())
    }

    /// Ancestors of this container, root first
    #[must_use]
    pub fn ancestors(&self) -> &[InstanceId] {
        self.attachment
            .as_ref()
            .map(|a| a.ancestors.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_historic(&self) -> bool {
        self.scope().is_some_and(|scope| scope.is_historic())
    }

    fn child_attachment(&self) -> Option<(Arc<DocumentScope>, Vec<InstanceId>)> {
        self.attachment.as_ref().map(|a| {
            let mut ancestors = a.ancestors.clone();
            ancestors.push(self.instance);
            (Arc::clone(&a.scope), ancestors)
        })
    }

    // ------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------

    /// Fire a change event originating from this container
    pub fn notify(&self, kind: ChangeKind) {
        if let Some(attachment) = &self.attachment {
            attachment.scope.fire(&ChangeEvent {
                document: attachment.scope.key(),
                origin: self.instance,
                ancestors: attachment.ancestors.clone(),
                kind,
            });
        }
    }

    /// Setter primitive: store `value` into `field` and fire a part-changed
    /// event for `property` when the value actually differs.
    pub fn update<T: PartialEq>(&self, field: &mut T, value: T, property: &str) -> bool {
        if *field == value {
            return false;
        }
        *field = value;
        self.notify(ChangeKind::PartChanged {
            property: Some(property.to_string()),
        });
        true
    }

    // ------------------------------------------------------------------
    // Parts
    // ------------------------------------------------------------------

    /// Declared collections in declaration order
    #[must_use]
    pub fn collections(&self) -> &[PartCollection] {
        &self.collections
    }

    /// All parts, collection by collection, each in insertion order
    pub fn children(&self) -> impl Iterator<Item = &dyn PartContainer> {
        self.collections.iter().flat_map(PartCollection::iter)
    }

    fn parts_iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn PartContainer>> {
        self.collections.iter_mut().flat_map(|c| c.parts.iter_mut())
    }

    /// Mutable access to every part, collection by collection
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut dyn PartContainer> {
        self.collections
            .iter_mut()
            .flat_map(|c| c.parts.iter_mut().map(Box::as_mut))
    }

    fn collection_index<T: ModelPart>(&self) -> Result<usize> {
        self.collections
            .iter()
            .position(|c| c.part_type == TypeId::of::<T>())
            .ok_or_else(|| Error::unknown_part_type(T::TAG))
    }

    pub(crate) fn collection_index_for_tag(&self, tag: &str) -> Option<usize> {
        self.collections.iter().position(|c| c.tag == tag)
    }

    /// Parts of type `T`
    pub fn parts_of<T: ModelPart>(&self) -> impl Iterator<Item = &T> {
        self.collections
            .iter()
            .filter(|c| c.part_type == TypeId::of::<T>())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.as_any().downcast_ref::<T>())
    }

    /// Parts of type `T`, mutable
    pub fn parts_of_mut<T: ModelPart>(&mut self) -> impl Iterator<Item = &mut T> {
        self.collections
            .iter_mut()
            .filter(|c| c.part_type == TypeId::of::<T>())
            .flat_map(|c| c.parts.iter_mut())
            .filter_map(|p| p.as_any_mut().downcast_mut::<T>())
    }

    /// Number of parts of type `T`
    #[must_use]
    pub fn part_count<T: ModelPart>(&self) -> usize {
        self.parts_of::<T>().count()
    }

    /// Part of type `T` with the given id
    #[must_use]
    pub fn typed_part<T: ModelPart>(&self, id: &PartId) -> Option<&T> {
        self.parts_of::<T>().find(|p| p.id() == id)
    }

    /// Part of type `T` with the given id, mutable
    pub fn typed_part_mut<T: ModelPart>(&mut self, id: &PartId) -> Option<&mut T> {
        self.parts_of_mut::<T>().find(|p| p.id() == id)
    }

    /// Direct child part of any type with the given id
    #[must_use]
    pub fn find_part(&self, id: &PartId) -> Option<&dyn PartContainer> {
        self.children().find(|p| p.id() == id)
    }

    /// Direct child part of any type with the given id, mutable
    pub fn find_part_mut(&mut self, id: &PartId) -> Option<&mut dyn PartContainer> {
        self.children_mut().find(|p| p.id() == id)
    }

    fn prepare_new_part(&self, part: &mut dyn PartContainer) {
        if let Some((scope, ancestors)) = self.child_attachment() {
            if let Some(labels) = part.label_support_mut() {
                labels.ensure_locales(scope.locales());
            }
            part.core_mut().attach(scope, ancestors);
            extension::materialize(part);
        }
    }

    /// Create a part of type `T` with a fresh id and fire part-added
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPartType`] when the container declares no
    /// collection for `T`.
    pub fn new_part<T: ModelPart>(&mut self) -> Result<&mut T> {
        let index = self.collection_index::<T>()?;
        let mut part = (self.collections[index].factory)(PartId::generate());
        self.prepare_new_part(part.as_mut());
        let id = part.id().clone();
        self.collections[index].parts.push(part);
        self.notify(ChangeKind::PartAdded { part: id });

        self.collections[index]
            .parts
            .last_mut()
            .and_then(|p| p.as_any_mut().downcast_mut::<T>())
            .ok_or_else(|| Error::unknown_part_type(T::TAG))
    }

    /// Add an existing part and fire part-added
    ///
    /// # Errors
    ///
    /// Fails when the part was deleted, when no collection accepts its type,
    /// or when a sibling already has its id.
    pub fn add_part(&mut self, mut part: Box<dyn PartContainer>) -> Result<()> {
        if part.is_deleted() {
            return Err(Error::DeletedPartReuse {
                id: part.id().to_string(),
            });
        }
        let part_type = Any::type_id(part.as_any());
        let index = self
            .collections
            .iter()
            .position(|c| c.part_type == part_type)
            .ok_or_else(|| Error::unknown_part_type(part.kind()))?;
        if self.find_part(part.id()).is_some() {
            return Err(Error::duplicate_part_id(part.id().as_str(), part.kind()));
        }

        self.tombstones.remove(part.id());
        if let Some((scope, ancestors)) = self.child_attachment() {
            part.core_mut().attach(scope, ancestors);
            extension::materialize(part.as_mut());
        }
        let id = part.id().clone();
        self.collections[index].parts.push(part);
        self.notify(ChangeKind::PartAdded { part: id });
        Ok(())
    }

    /// Delete a direct child part: detach it, flag it deleted and fire
    /// part-removed. The deleted part is handed back to the caller.
    ///
    /// # Errors
    ///
    /// Deleting the same id twice fails with [`Error::AlreadyDeleted`];
    /// an unknown id fails with [`Error::PartNotFound`].
    pub fn delete_part(&mut self, id: &PartId) -> Result<Box<dyn PartContainer>> {
        if self.tombstones.contains(id) {
            return Err(Error::AlreadyDeleted { id: id.to_string() });
        }
        let (collection, position) = self
            .collections
            .iter()
            .enumerate()
            .find_map(|(c, collection)| collection.position(id).map(|p| (c, p)))
            .ok_or_else(|| Error::part_not_found(id.as_str()))?;

        let mut part = self.collections[collection].parts.remove(position);
        part.core_mut().deleted = true;
        part.core_mut().detach();
        self.tombstones.insert(id.clone());
        self.notify(ChangeKind::PartRemoved { part: id.clone() });
        Ok(part)
    }

    /// Move the parts of type `T` at `indices` one position up or down.
    /// Parts blocked by the collection boundary (or by a blocked selected
    /// neighbour) stay where they are. Returns the new indices.
    ///
    /// # Errors
    ///
    /// Fails when `T` is not declared or an index is out of range.
    pub fn move_parts<T: ModelPart>(&mut self, indices: &[usize], up: bool) -> Result<Vec<usize>> {
        let index = self.collection_index::<T>()?;
        let parts = &mut self.collections[index].parts;

        let mut selected: Vec<usize> = indices.to_vec();
        selected.sort_unstable();
        selected.dedup();
        if let Some(&out_of_range) = selected.iter().find(|&&i| i >= parts.len()) {
            return Err(Error::invalid_value(
                T::TAG,
                format!("index {out_of_range} out of range for {} parts", parts.len()),
            ));
        }

        let mut moved = false;
        let mut result = Vec::with_capacity(selected.len());
        if up {
            let mut floor = 0;
            for i in selected {
                if i == floor {
                    result.push(i);
                    floor += 1;
                } else {
                    parts.swap(i - 1, i);
                    result.push(i - 1);
                    floor = i;
                    moved = true;
                }
            }
        } else {
            let mut ceiling = parts.len();
            for &i in selected.iter().rev() {
                if i + 1 == ceiling {
                    result.push(i);
                    ceiling = i;
                } else {
                    parts.swap(i, i + 1);
                    result.push(i + 1);
                    ceiling = i + 1;
                    moved = true;
                }
            }
            result.reverse();
        }

        if moved {
            self.notify(ChangeKind::PartsReordered {
                collection: T::TAG.to_string(),
            });
        }
        Ok(result)
    }

    /// Remove every part from every collection, keyed by id
    pub(crate) fn take_parts(&mut self) -> HashMap<PartId, Box<dyn PartContainer>> {
        self.tombstones.clear();
        self.collections
            .iter_mut()
            .flat_map(|c| c.parts.drain(..))
            .map(|p| (p.id().clone(), p))
            .collect()
    }

    /// Instantiate a part for the collection at `index` and attach it
    pub(crate) fn instantiate(&self, index: usize, id: PartId) -> Box<dyn PartContainer> {
        let mut part = (self.collections[index].factory)(id);
        if let Some((scope, ancestors)) = self.child_attachment() {
            part.core_mut().attach(scope, ancestors);
        }
        part
    }

    /// Unattached part of the collection at `index`, for inspecting its layout
    pub(crate) fn blank_part(&self, index: usize) -> Box<dyn PartContainer> {
        (self.collections[index].factory)(PartId::new(""))
    }

    pub(crate) fn push_part(&mut self, index: usize, part: Box<dyn PartContainer>) {
        self.collections[index].parts.push(part);
    }

    // ------------------------------------------------------------------
    // Extension property storage
    // ------------------------------------------------------------------

    /// Stored extension property values in insertion order
    #[must_use]
    pub fn ext_values(&self) -> &IndexMap<String, ExtValue> {
        &self.ext_values
    }

    /// Stored value of one extension property
    #[must_use]
    pub fn ext_value(&self, id: &str) -> Option<&ExtValue> {
        self.ext_values.get(id)
    }

    pub(crate) fn put_ext_value(&mut self, id: &str, value: ExtValue) {
        self.ext_values.insert(id.to_string(), value);
    }

    pub(crate) fn clear_ext_values(&mut self) {
        self.ext_values.clear();
    }
}
