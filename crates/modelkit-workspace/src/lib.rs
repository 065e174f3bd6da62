#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # modelkit-workspace
//!
//! Documents, byte resources, projects and workspace configuration.
//!
//! A [`Document`] binds one root object to one [`ByteResource`] and tracks
//! whether the object changed since it was last loaded or saved. A
//! [`Project`] is a source directory of documents; projects depend on each
//! other and the [`Workspace`] resolves qualified names across those
//! dependencies when validating.

pub mod config;
pub mod document;
pub mod kinds;
pub mod project;
pub mod resource;
pub mod workspace;

pub use config::{ProjectConfig, WorkspaceConfig};
pub use document::{Document, qualified_name_for};
pub use kinds::{ObjectKind, ObjectKindRegistry};
pub use project::Project;
pub use resource::{ByteResource, FileResource, MemoryResource, ModificationStamp, WriteOutcome};
pub use workspace::{ProjectView, Workspace};

use thiserror::Error;

/// Errors raised by documents, projects and the workspace
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot parse {name}: {message}")]
    Parse { name: String, message: String },

    #[error("Malformed content in {name}: {source}")]
    Structure {
        name: String,
        #[source]
        source: modelkit_core::Error,
    },

    #[error("Cannot serialize {name}: {message}")]
    Serialize { name: String, message: String },

    #[error("Content of {name} is unavailable, the last parse failed")]
    ContentUnavailable { name: String },

    #[error("{name} is a historic snapshot and cannot be changed")]
    Frozen { name: String },

    #[error("{name} was changed outside the workspace; save with force to overwrite")]
    WriteConflict { name: String },

    #[error("IO error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Unknown object kind: {0}")]
    UnknownKind(String),
}

impl Error {
    /// Build an IO error for a named resource.
    pub fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    /// Build a parse error for a document.
    pub fn parse(name: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a container error raised while reconciling a document.
    pub fn structure(name: &str, source: modelkit_core::Error) -> Self {
        Self::Structure {
            name: name.to_string(),
            source,
        }
    }

    pub fn content_unavailable(name: &str) -> Self {
        Self::ContentUnavailable {
            name: name.to_string(),
        }
    }

    pub fn frozen(name: &str) -> Self {
        Self::Frozen {
            name: name.to_string(),
        }
    }

    pub fn write_conflict(name: &str) -> Self {
        Self::WriteConflict {
            name: name.to_string(),
        }
    }

    /// Attribute an XML reader or writer error to a document.
    pub fn from_xml(name: &str, error: modelkit_xml::Error) -> Self {
        match error {
            modelkit_xml::Error::Parse { message, .. } => Self::parse(name, message),
            modelkit_xml::Error::Serialize(message) => Self::Serialize {
                name: name.to_string(),
                message,
            },
            modelkit_xml::Error::Model(source) => Self::structure(name, source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
