//! Extension properties
//!
//! Extension properties are named values attached to a container outside of
//! its compiled field set. Definitions are registered per container kind in an
//! [`ExtensionPropertyRegistry`]; values live in the container core. Values
//! whose id has no registered definition are kept verbatim so they survive a
//! round trip through an environment that lacks the registration.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::change::ChangeKind;
use crate::container::PartContainer;
use crate::message::MessageList;
use crate::xml::XmlElement;
use crate::{Error, Result};

/// XML tag of the extension property block
pub const EXTENSION_PROPERTIES_TAG: &str = "ExtensionProperties";
/// XML tag of one extension property value
pub const VALUE_TAG: &str = "Value";

const ID_ATTRIBUTE: &str = "id";
const IS_NULL_ATTRIBUTE: &str = "isNull";

/// Value of an extension property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtValue {
    /// Explicit null, distinct from an absent value
    Null,

    /// String value
    String(String),

    /// Boolean value
    Boolean(bool),

    /// Integer value
    Integer(i64),

    /// Decimal value, kept in its textual form
    Decimal(String),

    /// Verbatim value element of an unregistered property
    Opaque(XmlElement),
}

impl ExtValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ExtValue::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtValue::String(s) | ExtValue::Decimal(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExtValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ExtValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text form used by the generic codec
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            ExtValue::Null | ExtValue::Opaque(_) => None,
            ExtValue::String(s) | ExtValue::Decimal(s) => Some(s.clone()),
            ExtValue::Boolean(b) => Some(b.to_string()),
            ExtValue::Integer(i) => Some(i.to_string()),
        }
    }
}

impl From<&str> for ExtValue {
    fn from(s: &str) -> Self {
        ExtValue::String(s.to_string())
    }
}

impl From<String> for ExtValue {
    fn from(s: String) -> Self {
        ExtValue::String(s)
    }
}

impl From<bool> for ExtValue {
    fn from(b: bool) -> Self {
        ExtValue::Boolean(b)
    }
}

impl From<i64> for ExtValue {
    fn from(i: i64) -> Self {
        ExtValue::Integer(i)
    }
}

/// Describes one extension property of one container kind
pub trait ExtensionPropertyDefinition: Send + Sync {
    /// Property id, unique per container kind
    fn property_id(&self) -> &str;

    /// Kind of container the property extends
    fn extended_kind(&self) -> &str;

    /// Default value, possibly computed from the owning container
    fn default_value(&self, container: &dyn PartContainer) -> ExtValue;

    /// Write a non-null value into its value element
    fn value_to_xml(&self, value: &ExtValue, element: &mut XmlElement);

    /// Read a non-null value from its value element
    ///
    /// # Errors
    ///
    /// Returns an error when the element content cannot be converted.
    fn value_from_xml(&self, element: &XmlElement) -> Result<ExtValue>;

    /// Validate the current value
    ///
    /// # Errors
    ///
    /// Plugin failures are reported to the caller, which logs and skips them.
    fn validate(&self, _container: &dyn PartContainer, _value: &ExtValue) -> anyhow::Result<MessageList> {
        Ok(MessageList::new())
    }

    /// Called before every set; returning `false` vetoes the mutation
    fn before_set(&self, _container: &dyn PartContainer, _value: &ExtValue) -> bool {
        true
    }

    /// Called after every set that was not vetoed
    fn after_set(&self, _container: &dyn PartContainer, _value: &ExtValue) {}
}

/// Type alias for computed defaults
pub type DefaultFn = Arc<dyn Fn(&dyn PartContainer) -> ExtValue + Send + Sync>;

/// Type alias for value validators
pub type ValidateFn =
    Arc<dyn Fn(&dyn PartContainer, &ExtValue) -> anyhow::Result<MessageList> + Send + Sync>;

/// Type alias for before-set hooks
pub type BeforeSetFn = Arc<dyn Fn(&dyn PartContainer, &ExtValue) -> bool + Send + Sync>;

/// Type alias for after-set hooks
pub type AfterSetFn = Arc<dyn Fn(&dyn PartContainer, &ExtValue) + Send + Sync>;

/// Primitive value type of a [`ExtensionProperty`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Boolean,
    Integer,
    Decimal,
}

/// Configurable definition for primitive-valued extension properties
#[derive(Clone)]
pub struct ExtensionProperty {
    id: String,
    kind: String,
    value_type: ValueType,
    default: ExtValue,
    default_fn: Option<DefaultFn>,
    validator: Option<ValidateFn>,
    before_set: Option<BeforeSetFn>,
    after_set: Option<AfterSetFn>,
}

impl ExtensionProperty {
    /// Create a definition with a null default
    pub fn new(id: impl Into<String>, kind: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            value_type,
            default: ExtValue::Null,
            default_fn: None,
            validator: None,
            before_set: None,
            after_set: None,
        }
    }

    /// String property
    pub fn string(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(id, kind, ValueType::String)
    }

    /// Boolean property
    pub fn boolean(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(id, kind, ValueType::Boolean)
    }

    /// Integer property
    pub fn integer(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(id, kind, ValueType::Integer)
    }

    /// Constant default value
    #[must_use]
    pub fn with_default(mut self, default: impl Into<ExtValue>) -> Self {
        self.default = default.into();
        self
    }

    /// Default computed from the owning container
    #[must_use]
    pub fn with_default_fn(
        mut self,
        default: impl Fn(&dyn PartContainer) -> ExtValue + Send + Sync + 'static,
    ) -> Self {
        self.default_fn = Some(Arc::new(default));
        self
    }

    /// Value validator
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&dyn PartContainer, &ExtValue) -> anyhow::Result<MessageList>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Hook run before every set; returning `false` vetoes it
    #[must_use]
    pub fn on_before_set(
        mut self,
        hook: impl Fn(&dyn PartContainer, &ExtValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.before_set = Some(Arc::new(hook));
        self
    }

    /// Hook run after every set
    #[must_use]
    pub fn on_after_set(
        mut self,
        hook: impl Fn(&dyn PartContainer, &ExtValue) + Send + Sync + 'static,
    ) -> Self {
        self.after_set = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for ExtensionProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionProperty")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("has_default_fn", &self.default_fn.is_some())
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl ExtensionPropertyDefinition for ExtensionProperty {
    fn property_id(&self) -> &str {
        &self.id
    }

    fn extended_kind(&self) -> &str {
        &self.kind
    }

    fn default_value(&self, container: &dyn PartContainer) -> ExtValue {
        match &self.default_fn {
            Some(default) => default(container),
            None => self.default.clone(),
        }
    }

    fn value_to_xml(&self, value: &ExtValue, element: &mut XmlElement) {
        element.text = value.to_text();
    }

    fn value_from_xml(&self, element: &XmlElement) -> Result<ExtValue> {
        let text = element.text.clone().unwrap_or_default();
        match self.value_type {
            ValueType::String => Ok(ExtValue::String(text)),
            ValueType::Decimal => Ok(ExtValue::Decimal(text.trim().to_string())),
            ValueType::Boolean => match text.trim() {
                "true" => Ok(ExtValue::Boolean(true)),
                "false" => Ok(ExtValue::Boolean(false)),
                other => Err(Error::invalid_value(&self.id, format!("'{other}' is not a boolean"))),
            },
            ValueType::Integer => text
                .trim()
                .parse::<i64>()
                .map(ExtValue::Integer)
                .map_err(|e| Error::invalid_value(&self.id, e.to_string())),
        }
    }

    fn validate(&self, container: &dyn PartContainer, value: &ExtValue) -> anyhow::Result<MessageList> {
        match &self.validator {
            Some(validator) => validator(container, value),
            None => Ok(MessageList::new()),
        }
    }

    fn before_set(&self, container: &dyn PartContainer, value: &ExtValue) -> bool {
        self.before_set
            .as_ref()
            .is_none_or(|hook| hook(container, value))
    }

    fn after_set(&self, container: &dyn PartContainer, value: &ExtValue) {
        if let Some(hook) = &self.after_set {
            hook(container, value);
        }
    }
}

type Definitions = IndexMap<String, Arc<dyn ExtensionPropertyDefinition>>;

/// Registry of extension property definitions keyed by container kind
#[derive(Default)]
pub struct ExtensionPropertyRegistry {
    by_kind: RwLock<HashMap<String, Definitions>>,
}

impl ExtensionPropertyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition
    ///
    /// # Errors
    ///
    /// Returns an error if the kind already has a property with the same id.
    pub fn register(&self, definition: impl ExtensionPropertyDefinition + 'static) -> Result<()> {
        let kind = definition.extended_kind().to_string();
        let id = definition.property_id().to_string();
        let mut by_kind = self.by_kind.write().unwrap_or_else(PoisonError::into_inner);
        let definitions = by_kind.entry(kind.clone()).or_default();
        if definitions.contains_key(&id) {
            return Err(Error::DuplicateExtensionProperty { kind, id });
        }
        debug!(kind = %kind, id = %id, "Registered extension property");
        definitions.insert(id, Arc::new(definition));
        Ok(())
    }

    /// All definitions for a kind, in registration order
    #[must_use]
    pub fn definitions_for(&self, kind: &str) -> Vec<Arc<dyn ExtensionPropertyDefinition>> {
        self.by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .map(|definitions| definitions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Definition of one property
    #[must_use]
    pub fn definition(&self, kind: &str, id: &str) -> Option<Arc<dyn ExtensionPropertyDefinition>> {
        self.by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .and_then(|definitions| definitions.get(id).cloned())
    }
}

impl std::fmt::Debug for ExtensionPropertyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let by_kind = self.by_kind.read().unwrap_or_else(PoisonError::into_inner);
        let summary: HashMap<&String, Vec<&String>> = by_kind
            .iter()
            .map(|(kind, definitions)| (kind, definitions.keys().collect()))
            .collect();
        f.debug_struct("ExtensionPropertyRegistry")
            .field("definitions", &summary)
            .finish()
    }
}

fn definition_of(
    container: &dyn PartContainer,
    id: &str,
) -> Option<Arc<dyn ExtensionPropertyDefinition>> {
    container
        .core()
        .registry()
        .and_then(|registry| registry.definition(container.kind(), id))
}

/// Whether `id` is a registered extension property of the container's kind
#[must_use]
pub fn is_defined(container: &dyn PartContainer, id: &str) -> bool {
    definition_of(container, id).is_some()
}

/// Current value of an extension property.
///
/// A registered property that has not been materialized yet yields its
/// default; an unregistered but stored value is returned as stored.
///
/// # Errors
///
/// Returns [`Error::UnknownExtensionProperty`] when the id is neither
/// registered nor stored.
pub fn value(container: &dyn PartContainer, id: &str) -> Result<ExtValue> {
    if let Some(stored) = container.core().ext_value(id) {
        return Ok(stored.clone());
    }
    definition_of(container, id)
        .map(|definition| definition.default_value(container))
        .ok_or_else(|| Error::unknown_extension_property(container.kind(), id))
}

/// Set an extension property value.
///
/// Runs the definition's `before_set` hook first; a veto leaves the value
/// unchanged and fires nothing. Otherwise the value is stored, a change event
/// is fired if it differs from the previous value, and `after_set` runs.
/// Returns whether the value changed.
///
/// # Errors
///
/// Returns [`Error::UnknownExtensionProperty`] when the id is not registered
/// for the container's kind.
pub fn set_value(container: &mut dyn PartContainer, id: &str, new_value: ExtValue) -> Result<bool> {
    let definition = definition_of(&*container, id)
        .ok_or_else(|| Error::unknown_extension_property(container.kind(), id))?;

    if !definition.before_set(&*container, &new_value) {
        debug!(kind = container.kind(), id, "Extension property change vetoed");
        return Ok(false);
    }

    let current = value(&*container, id)?;
    let changed = current != new_value;
    container.core_mut().put_ext_value(id, new_value.clone());
    if changed {
        container.core().notify(ChangeKind::PartChanged {
            property: Some(id.to_string()),
        });
    }

    definition.after_set(&*container, &new_value);
    Ok(changed)
}

/// Store defaults for every registered property without a value
pub fn materialize(container: &mut dyn PartContainer) {
    let Some(registry) = container.core().registry().cloned() else {
        return;
    };
    let view: &dyn PartContainer = &*container;
    let missing: Vec<(String, ExtValue)> = registry
        .definitions_for(view.kind())
        .iter()
        .filter(|definition| view.core().ext_value(definition.property_id()).is_none())
        .map(|definition| {
            (
                definition.property_id().to_string(),
                definition.default_value(view),
            )
        })
        .collect();

    for (id, default) in missing {
        container.core_mut().put_ext_value(&id, default);
    }
}

/// Append the extension property block; omitted when there is nothing to write
pub(crate) fn write_block(container: &dyn PartContainer, element: &mut XmlElement) {
    let definitions = container
        .core()
        .registry()
        .map(|registry| registry.definitions_for(container.kind()))
        .unwrap_or_default();

    let mut block = XmlElement::new(EXTENSION_PROPERTIES_TAG);

    for definition in &definitions {
        let id = definition.property_id();
        let current = container
            .core()
            .ext_value(id)
            .cloned()
            .unwrap_or_else(|| definition.default_value(container));
        if let ExtValue::Opaque(original) = current {
            block.children.push(original);
            continue;
        }
        let mut value_element = XmlElement::new(VALUE_TAG);
        value_element.set_attribute(ID_ATTRIBUTE, id);
        value_element.set_attribute(IS_NULL_ATTRIBUTE, current.is_null().to_string());
        if !current.is_null() {
            definition.value_to_xml(&current, &mut value_element);
        }
        block.children.push(value_element);
    }

    for (id, stored) in container.core().ext_values() {
        if definitions.iter().any(|d| d.property_id() == id) {
            continue;
        }
        match stored {
            ExtValue::Opaque(original) => block.children.push(original.clone()),
            other => {
                let mut value_element = XmlElement::new(VALUE_TAG);
                value_element.set_attribute(ID_ATTRIBUTE, id);
                value_element.set_attribute(IS_NULL_ATTRIBUTE, other.is_null().to_string());
                value_element.text = other.to_text();
                block.children.push(value_element);
            }
        }
    }

    if !block.children.is_empty() {
        element.children.push(block);
    }
}

/// Replace all extension property values with the ones found in `element`
pub(crate) fn read_block(container: &mut dyn PartContainer, element: &XmlElement) {
    container.core_mut().clear_ext_values();

    if let Some(block) = element.child(EXTENSION_PROPERTIES_TAG) {
        for value_element in block.children_named(VALUE_TAG) {
            let Some(id) = value_element.text_attribute(ID_ATTRIBUTE) else {
                warn!(kind = container.kind(), "Extension property value without id ignored");
                continue;
            };
            let id = id.trim().to_string();

            let value = match definition_of(&*container, &id) {
                Some(_) if value_element.bool_attribute(IS_NULL_ATTRIBUTE, false) => ExtValue::Null,
                Some(definition) => match definition.value_from_xml(value_element) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(kind = container.kind(), id = %id, error = %e,
                            "Extension property value could not be converted, keeping it verbatim");
                        ExtValue::Opaque(value_element.clone())
                    }
                },
                None => {
                    warn!(kind = container.kind(), id = %id,
                        "Extension property is not registered, keeping its value verbatim");
                    ExtValue::Opaque(value_element.clone())
                }
            };
            container.core_mut().put_ext_value(&id, value);
        }
    }

    materialize(container);
}
