//! Methods and their parameters
#![allow(clippy::must_use_candidate)] // Setters report whether anything changed; callers rarely care.

use std::any::Any;
use std::collections::HashSet;

use modelkit_core::{
    ContainerCore, Message, MessageList, ModelPart, PartContainer, PartId, ValidationContext,
    XmlElement,
};

use crate::lookup::TypeMember;
use crate::rules;

pub const PROPERTY_NAME: &str = "name";
pub const PROPERTY_DATATYPE: &str = "datatype";
pub const PROPERTY_ABSTRACT: &str = "abstract";
pub const PROPERTY_OVERRIDES: &str = "overrides";

/// A method declared by a component type
#[derive(Debug)]
pub struct Method {
    core: ContainerCore,
    name: String,
    datatype: String,
    is_abstract: bool,
    overrides: bool,
}

impl Method {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> bool {
        self.core.update(&mut self.name, name.to_string(), PROPERTY_NAME)
    }

    /// Return type
    #[must_use]
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn set_datatype(&mut self, datatype: &str) -> bool {
        self.core
            .update(&mut self.datatype, datatype.to_string(), PROPERTY_DATATYPE)
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
    pub fn is_overriding(&self) -> bool {
        self.overrides
    }

    pub fn set_overriding(&mut self, overrides: bool) -> bool {
        self.core
            .update(&mut self.overrides, overrides, PROPERTY_OVERRIDES)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.core.parts_of::<Parameter>()
    }

    /// Append a parameter with the given name and datatype
    ///
    /// # Errors
    ///
    /// Returns an error when the part cannot be attached to the document.
    pub fn add_parameter(&mut self, name: &str, datatype: &str) -> modelkit_core::Result<&mut Parameter> {
        let parameter = self.core.new_part::<Parameter>()?;
        parameter.set_name(name);
        parameter.set_datatype(datatype);
        Ok(parameter)
    }

    /// `name(type, ...)`; parameter names are not part of the signature
    #[must_use]
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.parameters().map(Parameter::datatype).collect();
        format!("{}({})", self.name, types.join(", "))
    }
}

impl ModelPart for Method {
    const TAG: &'static str = "Method";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id).with_parts::<Parameter>(),
            name: String::new(),
            datatype: String::new(),
            is_abstract: false,
            overrides: false,
        }
    }
}

impl PartContainer for Method {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        Self::TAG
    }

    fn write_properties(&self, element: &mut XmlElement) {
        element
            .set_attribute(PROPERTY_NAME, &self.name)
            .set_attribute(PROPERTY_DATATYPE, &self.datatype)
            .set_attribute(PROPERTY_ABSTRACT, self.is_abstract.to_string())
            .set_attribute(PROPERTY_OVERRIDES, self.overrides.to_string());
    }

    fn read_properties(&mut self, element: &XmlElement) -> modelkit_core::Result<()> {
        self.name = element.attribute(PROPERTY_NAME).unwrap_or_default().to_string();
        self.datatype = element
            .attribute(PROPERTY_DATATYPE)
            .unwrap_or_default()
            .to_string();
        self.is_abstract = element.bool_attribute(PROPERTY_ABSTRACT, false);
        self.overrides = element.bool_attribute(PROPERTY_OVERRIDES, false);
        Ok(())
    }

    fn validate_this(&self, _context: &ValidationContext<'_>, messages: &mut MessageList) {
        rules::check_name(self, PROPERTY_NAME, &self.name, messages);

        let mut seen = HashSet::new();
        for parameter in self.parameters() {
            if !seen.insert(parameter.name()) {
                messages.add(
                    Message::error(
                        rules::DUPLICATE_PARAMETER_NAME,
                        format!(
                            "Method '{}' declares parameter '{}' more than once",
                            self.name,
                            parameter.name()
                        ),
                    )
                    .with_ref(parameter.property_ref(PROPERTY_NAME)),
                );
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypeMember for Method {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> String {
        Method::signature(self)
    }

    fn overrides(&self) -> bool {
        self.overrides
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// A method parameter
#[derive(Debug)]
pub struct Parameter {
    core: ContainerCore,
    name: String,
    datatype: String,
}

impl Parameter {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> bool {
        self.core.update(&mut self.name, name.to_string(), PROPERTY_NAME)
    }

    #[must_use]
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn set_datatype(&mut self, datatype: &str) -> bool {
        self.core
            .update(&mut self.datatype, datatype.to_string(), PROPERTY_DATATYPE)
    }
}

impl ModelPart for Parameter {
    const TAG: &'static str = "Parameter";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id),
            name: String::new(),
            datatype: String::new(),
        }
    }
}

impl PartContainer for Parameter {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        Self::TAG
    }

    fn write_properties(&self, element: &mut XmlElement) {
        element
            .set_attribute(PROPERTY_NAME, &self.name)
            .set_attribute(PROPERTY_DATATYPE, &self.datatype);
    }

    fn read_properties(&mut self, element: &XmlElement) -> modelkit_core::Result<()> {
        self.name = element.attribute(PROPERTY_NAME).unwrap_or_default().to_string();
        self.datatype = element
            .attribute(PROPERTY_DATATYPE)
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    fn validate_this(&self, _context: &ValidationContext<'_>, messages: &mut MessageList) {
        rules::check_name(self, PROPERTY_NAME, &self.name, messages);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_lists_parameter_types() {
        let mut method = Method::with_id(PartId::generate());
        method.set_name("compute");
        assert_eq!(method.signature(), "compute()");

        method.add_parameter("base", "Money").unwrap();
        method.add_parameter("factor", "Decimal").unwrap();
        assert_eq!(method.signature(), "compute(Money, Decimal)");
    }

    #[test]
    fn test_duplicate_parameter_names_are_reported_once_per_repeat() {
        let mut method = Method::with_id(PartId::generate());
        method.set_name("compute");
        method.add_parameter("x", "Integer").unwrap();
        method.add_parameter("x", "Decimal").unwrap();

        let project = modelkit_core::EmptyProject::default();
        let mut messages = MessageList::new();
        method.validate_this(&ValidationContext::new(&project), &mut messages);
        assert_eq!(messages.all_by_code(rules::DUPLICATE_PARAMETER_NAME).count(), 1);
    }
}
