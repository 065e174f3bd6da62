//! Component types
//!
//! A [`ComponentType`] is the root object of a `.ctype` document. It names an
//! optional supertype and owns attributes, methods and associations as
//! parts. Its rules resolve the supertype chain through the project, so they
//! see types of dependency projects as well.
#![allow(clippy::must_use_candidate)] // Setters report whether anything changed; callers rarely care.

use std::any::Any;

use modelkit_core::{
    ContainerCore, LabelSupport, MessageList, PartContainer, ValidationContext, XmlElement,
};

use crate::association::Association;
use crate::attribute::Attribute;
use crate::hierarchy::TypeHierarchy;
use crate::lookup::{ContextLookup, HierarchyType, TypeLookup};
use crate::method::Method;
use crate::rules;

/// Root tag and object kind
pub const TAG: &str = "ComponentType";

pub const PROPERTY_SUPERTYPE: &str = "supertype";
pub const PROPERTY_ABSTRACT: &str = "abstract";

#[derive(Debug)]
pub struct ComponentType {
    core: ContainerCore,
    supertype: Option<String>,
    is_abstract: bool,
    labels: LabelSupport,
}

impl Default for ComponentType {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentType {
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: ContainerCore::object()
                .with_parts::<Attribute>()
                .with_parts::<Method>()
                .with_parts::<Association>(),
            supertype: None,
            is_abstract: false,
            labels: LabelSupport::new(),
        }
    }

    /// Root factory for the object kind registry
    #[must_use]
    pub fn boxed() -> Box<dyn PartContainer> {
        Box::new(Self::new())
    }

    /// Qualified name of the supertype, as written
    #[must_use]
    pub fn supertype(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    /// Set the supertype reference; blank clears it
    pub fn set_supertype(&mut self, supertype: Option<&str>) -> bool {
        let value = supertype
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        self.core.update(&mut self.supertype, value, PROPERTY_SUPERTYPE)
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn set_abstract(&mut self, is_abstract: bool) -> bool {
        self.core
            .update(&mut self.is_abstract, is_abstract, PROPERTY_ABSTRACT)
    }

    #[must_use]
    pub fn labels(&self) -> &LabelSupport {
        &self.labels
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.core.parts_of::<Attribute>()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.core.parts_of::<Method>()
    }

    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.core.parts_of::<Association>()
    }

    /// Own attribute by name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().find(|a| a.name() == name)
    }

    /// Create an attribute with the given name
    ///
    /// # Errors
    ///
    /// Fails only if the attribute collection is missing, which would be a
    /// construction bug.
    pub fn new_attribute(&mut self, name: &str) -> modelkit_core::Result<&mut Attribute> {
        let attribute = self.core.new_part::<Attribute>()?;
        attribute.set_name(name);
        Ok(attribute)
    }

    /// Create a method with the given name
    ///
    /// # Errors
    ///
    /// See [`new_attribute`](Self::new_attribute).
    pub fn new_method(&mut self, name: &str) -> modelkit_core::Result<&mut Method> {
        let method = self.core.new_part::<Method>()?;
        method.set_name(name);
        Ok(method)
    }

    /// Create an association to `target`
    ///
    /// # Errors
    ///
    /// See [`new_attribute`](Self::new_attribute).
    pub fn new_association(&mut self, target: &str) -> modelkit_core::Result<&mut Association> {
        let association = self.core.new_part::<Association>()?;
        association.set_target(target);
        Ok(association)
    }

    /// This type and its supertypes, resolved through `lookup`
    pub fn supertype_hierarchy<'a>(
        &'a self,
        lookup: &impl TypeLookup<'a, Self>,
    ) -> TypeHierarchy<'a, Self> {
        TypeHierarchy::supertype_hierarchy(self, lookup)
    }

    /// This type and every type deriving from it, resolved through `lookup`
    pub fn subtype_hierarchy<'a>(
        &'a self,
        lookup: &impl TypeLookup<'a, Self>,
    ) -> TypeHierarchy<'a, Self> {
        TypeHierarchy::subtype_hierarchy(self, lookup)
    }
}

impl PartContainer for ComponentType {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        TAG
    }

    fn write_properties(&self, element: &mut XmlElement) {
        element
            .set_optional_attribute(PROPERTY_SUPERTYPE, self.supertype.as_deref())
            .set_attribute(PROPERTY_ABSTRACT, self.is_abstract.to_string());
    }

    fn read_properties(&mut self, element: &XmlElement) -> modelkit_core::Result<()> {
        self.supertype = element
            .text_attribute(PROPERTY_SUPERTYPE)
            .map(|s| s.trim().to_string());
        self.is_abstract = element.bool_attribute(PROPERTY_ABSTRACT, false);
        Ok(())
    }

    fn label_support(&self) -> Option<&LabelSupport> {
        Some(&self.labels)
    }

    fn label_support_mut(&mut self) -> Option<&mut LabelSupport> {
        Some(&mut self.labels)
    }

    fn validate_this(&self, context: &ValidationContext<'_>, messages: &mut MessageList) {
        let lookup = ContextLookup::new(context.project());
        let hierarchy = self.supertype_hierarchy(&lookup);

        rules::check_supertype(self, &hierarchy, messages);
        rules::check_abstract_methods(self, &hierarchy, messages);
        rules::check_overridden_attributes(self, &hierarchy, messages);
        rules::check_duplicate_attributes(self, messages);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl HierarchyType for ComponentType {
    type Attribute = Attribute;
    type Method = Method;

    fn qualified_name(&self) -> &str {
        self.core.qualified_name().unwrap_or_default()
    }

    fn supertype_ref(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn attributes(&self) -> Vec<&Attribute> {
        self.core.parts_of::<Attribute>().collect()
    }

    fn methods(&self) -> Vec<&Method> {
        self.core.parts_of::<Method>().collect()
    }
}
