#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # modelkit-core
//!
//! Object model foundation for persistent, XML-backed model objects.
//!
//! Root model objects and their nested model parts share one container
//! abstraction: typed part collections, a persisted id per part, extension
//! properties, per-locale labels and structured change events. Containers
//! are serialized to and reconciled from an in-memory element tree without
//! losing the identity of parts that survive a reload.

/// Change events and listener registration.
pub mod change;
/// Element codec: container trees to elements and back.
pub mod codec;
/// Part containers and their shared core.
pub mod container;
/// Project context visible to validation rules.
pub mod context;
/// Extension property definitions, registry and value access.
pub mod extension;
/// Instance identities, persisted part ids and the id map.
pub mod id;
/// Per-locale labels and descriptions.
pub mod labels;
/// Validation messages and message lists.
pub mod message;
/// Document scope shared by attached containers.
pub mod scope;
/// In-memory element tree.
pub mod xml;

#[cfg(test)]
mod test_support;

pub use change::{ChangeEvent, ChangeKind, ChangeListener, ListenerId, ListenerSet};
pub use codec::{init_from_xml, init_from_xml_with_id, to_xml};
pub use container::{ContainerCore, ModelPart, PartCollection, PartContainer};
pub use context::{EmptyProject, ProjectContext, ValidationContext};
pub use extension::{
    ExtValue, ExtensionProperty, ExtensionPropertyDefinition, ExtensionPropertyRegistry,
};
pub use id::{DocumentKey, IdMap, InstanceId, PartId};
pub use labels::{Description, Label, LabelSupport, Locale};
pub use message::{Message, MessageList, ObjectProperty, Severity};
pub use scope::DocumentScope;
pub use xml::XmlElement;

use thiserror::Error;

/// Errors raised by container operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate sibling part id '{id}' at <{tag}>")]
    DuplicatePartId { id: String, tag: String },

    #[error("No part collection accepts '{tag}'")]
    UnknownPartType { tag: String },

    #[error("Part not found: {id}")]
    PartNotFound { id: String },

    #[error("Part '{id}' is already deleted")]
    AlreadyDeleted { id: String },

    #[error("Deleted part '{id}' cannot be added again")]
    DeletedPartReuse { id: String },

    #[error("Extension property '{id}' is not defined for {kind}")]
    UnknownExtensionProperty { kind: String, id: String },

    #[error("Extension property '{id}' is already registered for {kind}")]
    DuplicateExtensionProperty { kind: String, id: String },

    #[error("Invalid value for '{property}': {message}")]
    InvalidValue { property: String, message: String },
}

impl Error {
    /// Build a duplicate-id error for sibling parts.
    pub fn duplicate_part_id(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::DuplicatePartId {
            id: id.into(),
            tag: tag.into(),
        }
    }

    /// Build an unknown-part-type error.
    pub fn unknown_part_type(tag: impl Into<String>) -> Self {
        Self::UnknownPartType { tag: tag.into() }
    }

    /// Build a part-not-found error.
    pub fn part_not_found(id: impl Into<String>) -> Self {
        Self::PartNotFound { id: id.into() }
    }

    /// Build an unknown-extension-property error with the extended kind.
    pub fn unknown_extension_property(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::UnknownExtensionProperty {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Build an invalid-value error for a property.
    pub fn invalid_value(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// Crate-local result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
