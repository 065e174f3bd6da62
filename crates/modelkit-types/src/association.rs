//! Associations between component types
#![allow(clippy::must_use_candidate)] // Setters report whether anything changed; callers rarely care.

use std::any::Any;
use std::fmt;

use modelkit_core::{
    ContainerCore, Error, Message, MessageList, ModelPart, PartContainer, PartId,
    ValidationContext, XmlElement,
};

use crate::component::ComponentType;
use crate::rules;

pub const PROPERTY_TARGET: &str = "target";
pub const PROPERTY_TARGET_ROLE: &str = "targetRole";
pub const PROPERTY_MIN_CARDINALITY: &str = "minCardinality";
pub const PROPERTY_MAX_CARDINALITY: &str = "maxCardinality";

/// Upper bound of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxCardinality {
    Bounded(u32),
    #[default]
    Unbounded,
}

impl MaxCardinality {
    /// Parse `*` or a non-negative integer
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for anything else.
    pub fn parse(text: &str) -> modelkit_core::Result<Self> {
        let text = text.trim();
        if text == "*" {
            return Ok(Self::Unbounded);
        }
        text.parse::<u32>()
            .map(Self::Bounded)
            .map_err(|e| Error::invalid_value(PROPERTY_MAX_CARDINALITY, format!("'{text}': {e}")))
    }
}

impl fmt::Display for MaxCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(max) => write!(f, "{max}"),
            Self::Unbounded => write!(f, "*"),
        }
    }
}

/// A directed association to another component type
#[derive(Debug)]
pub struct Association {
    core: ContainerCore,
    target: String,
    target_role: String,
    min_cardinality: u32,
    max_cardinality: MaxCardinality,
}

impl Association {
    /// Qualified name of the target type
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_target(&mut self, target: &str) -> bool {
        self.core
            .update(&mut self.target, target.to_string(), PROPERTY_TARGET)
    }

    #[must_use]
    pub fn target_role(&self) -> &str {
        &self.target_role
    }

    pub fn set_target_role(&mut self, role: &str) -> bool {
        self.core
            .update(&mut self.target_role, role.to_string(), PROPERTY_TARGET_ROLE)
    }

    #[must_use]
    pub fn min_cardinality(&self) -> u32 {
        self.min_cardinality
    }

    #[must_use]
    pub fn max_cardinality(&self) -> MaxCardinality {
        self.max_cardinality
    }

    /// Set both bounds, firing one change per bound that differs
    pub fn set_cardinality(&mut self, min: u32, max: MaxCardinality) -> bool {
        let min_changed = self
            .core
            .update(&mut self.min_cardinality, min, PROPERTY_MIN_CARDINALITY);
        let max_changed = self
            .core
            .update(&mut self.max_cardinality, max, PROPERTY_MAX_CARDINALITY);
        min_changed || max_changed
    }
}

impl ModelPart for Association {
    const TAG: &'static str = "Association";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id),
            target: String::new(),
            target_role: String::new(),
            min_cardinality: 0,
            max_cardinality: MaxCardinality::Unbounded,
        }
    }
}

impl PartContainer for Association {
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
            .set_attribute(PROPERTY_TARGET, &self.target)
            .set_attribute(PROPERTY_TARGET_ROLE, &self.target_role)
            .set_attribute(PROPERTY_MIN_CARDINALITY, self.min_cardinality.to_string())
            .set_attribute(PROPERTY_MAX_CARDINALITY, self.max_cardinality.to_string());
    }

    fn read_properties(&mut self, element: &XmlElement) -> modelkit_core::Result<()> {
        self.target = element.attribute(PROPERTY_TARGET).unwrap_or_default().to_string();
        self.target_role = element
            .attribute(PROPERTY_TARGET_ROLE)
            .unwrap_or_default()
            .to_string();
        self.min_cardinality = match element.attribute(PROPERTY_MIN_CARDINALITY) {
            Some(text) => text.trim().parse().map_err(|e| {
                Error::invalid_value(PROPERTY_MIN_CARDINALITY, format!("'{text}': {e}"))
            })?,
            None => 0,
        };
        self.max_cardinality = match element.attribute(PROPERTY_MAX_CARDINALITY) {
            Some(text) => MaxCardinality::parse(text)?,
            None => MaxCardinality::Unbounded,
        };
        Ok(())
    }

    fn validate_this(&self, context: &ValidationContext<'_>, messages: &mut MessageList) {
        rules::check_name(self, PROPERTY_TARGET_ROLE, &self.target_role, messages);

        let target_found = context
            .find_object(&self.target)
            .is_some_and(|object| object.downcast_ref::<ComponentType>().is_some());
        if !target_found {
            messages.add(
                Message::error(
                    rules::ASSOCIATION_TARGET_NOT_FOUND,
                    format!("Association target '{}' does not exist", self.target),
                )
                .with_ref(self.property_ref(PROPERTY_TARGET)),
            );
        }

        match self.max_cardinality {
            MaxCardinality::Bounded(0) => messages.add(
                Message::error(
                    rules::INVALID_CARDINALITY,
                    "Maximum cardinality must be at least 1",
                )
                .with_ref(self.property_ref(PROPERTY_MAX_CARDINALITY)),
            ),
            MaxCardinality::Bounded(max) if max < self.min_cardinality => messages.add(
                Message::error(
                    rules::INVALID_CARDINALITY,
                    format!(
                        "Maximum cardinality {max} is below minimum cardinality {}",
                        self.min_cardinality
                    ),
                )
                .with_ref(self.property_ref(PROPERTY_MIN_CARDINALITY))
                .with_ref(self.property_ref(PROPERTY_MAX_CARDINALITY)),
            ),
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
