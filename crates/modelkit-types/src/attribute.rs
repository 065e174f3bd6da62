//! Attributes of a component type
#![allow(clippy::must_use_candidate)] // Setters report whether anything changed; callers rarely care.

use std::any::Any;

use modelkit_core::{
    ContainerCore, Message, MessageList, ModelPart, PartContainer, PartId, ValidationContext,
    XmlElement,
};

use crate::lookup::TypeMember;
use crate::rules;

/// Tag of the child element holding the default value as text
pub const DEFAULT_VALUE_TAG: &str = "DefaultValue";

pub const PROPERTY_NAME: &str = "name";
pub const PROPERTY_DATATYPE: &str = "datatype";
pub const PROPERTY_DEFAULT_VALUE: &str = "defaultValue";
pub const PROPERTY_OVERRIDES: &str = "overrides";

/// A typed attribute declared by a component type
#[derive(Debug)]
pub struct Attribute {
    core: ContainerCore,
    name: String,
    datatype: String,
    default_value: Option<String>,
    overrides: bool,
}

impl Attribute {
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

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn set_default_value(&mut self, value: Option<&str>) -> bool {
        self.core.update(
            &mut self.default_value,
            value.map(ToString::to_string),
            PROPERTY_DEFAULT_VALUE,
        )
    }

    #[must_use]
    pub fn is_overriding(&self) -> bool {
        self.overrides
    }

    pub fn set_overriding(&mut self, overrides: bool) -> bool {
        self.core
            .update(&mut self.overrides, overrides, PROPERTY_OVERRIDES)
    }
}

impl ModelPart for Attribute {
    const TAG: &'static str = "Attribute";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id),
            name: String::new(),
            datatype: String::new(),
            default_value: None,
            overrides: false,
        }
    }
}

impl PartContainer for Attribute {
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
            .set_attribute(PROPERTY_OVERRIDES, self.overrides.to_string());
        if let Some(value) = &self.default_value {
            element.push_child(XmlElement::new(DEFAULT_VALUE_TAG).with_text(value));
        }
    }

    fn read_properties(&mut self, element: &XmlElement) -> modelkit_core::Result<()> {
        self.name = element.attribute(PROPERTY_NAME).unwrap_or_default().to_string();
        self.datatype = element
            .attribute(PROPERTY_DATATYPE)
            .unwrap_or_default()
            .to_string();
        self.overrides = element.bool_attribute(PROPERTY_OVERRIDES, false);
        // An empty element stands for an empty default, a missing one for none.
        self.default_value = element
            .child(DEFAULT_VALUE_TAG)
            .map(|child| child.text.clone().unwrap_or_default());
        Ok(())
    }

    fn ignored_tags(&self) -> &'static [&'static str] {
        &[DEFAULT_VALUE_TAG]
    }

    fn validate_this(&self, _context: &ValidationContext<'_>, messages: &mut MessageList) {
        rules::check_name(self, PROPERTY_NAME, &self.name, messages);
        if self.datatype.trim().is_empty() {
            messages.add(
                Message::error(
                    rules::DATATYPE_MISSING,
                    format!("Attribute '{}' has no datatype", self.name),
                )
                .with_ref(self.property_ref(PROPERTY_DATATYPE)),
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypeMember for Attribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn overrides(&self) -> bool {
        self.overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelkit_core::codec;

    #[test]
    fn test_default_value_round_trips_as_child_text() {
        let mut attribute = Attribute::with_id(PartId::new("a1"));
        attribute.set_name("premium");
        attribute.set_datatype("Money");
        attribute.set_default_value(Some("0 EUR"));
        attribute.set_overriding(true);

        let xml = codec::to_xml(&attribute);
        assert_eq!(xml.child_text(DEFAULT_VALUE_TAG), Some("0 EUR"));
        assert_eq!(xml.attribute(PROPERTY_OVERRIDES), Some("true"));

        let mut copy = Attribute::with_id(PartId::generate());
        codec::init_from_xml(&mut copy, &xml).unwrap();
        assert_eq!(copy.id().as_str(), "a1");
        assert_eq!(copy.default_value(), Some("0 EUR"));
        assert!(copy.is_overriding());
        assert_eq!(copy.datatype(), "Money");
    }

    #[test]
    fn test_missing_default_value_stays_none() {
        let mut attribute = Attribute::with_id(PartId::generate());
        let xml = XmlElement::new(Attribute::TAG).with_attribute(PROPERTY_NAME, "x");
        codec::init_from_xml(&mut attribute, &xml).unwrap();
        assert_eq!(attribute.default_value(), None);
        assert!(!attribute.is_overriding());
    }
}
