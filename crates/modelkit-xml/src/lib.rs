#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # modelkit-xml
//!
//! XML text reader and writer for [`XmlElement`] trees.
//!
//! The reader builds an element tree from UTF-8 bytes with a streaming
//! parser; the writer produces indented UTF-8 output with an XML
//! declaration. [`load_into`] and [`save`] combine both with the container
//! codec.

pub mod parser;
pub mod serializer;

pub use parser::XmlParser;
pub use serializer::XmlSerializer;

use modelkit_core::{PartContainer, XmlElement};
use thiserror::Error;

/// Errors that can occur when reading or writing XML
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Model(#[from] modelkit_core::Error),
}

impl Error {
    /// Build a parse error for a named input.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse bytes into an element tree
///
/// # Errors
///
/// Returns [`Error::Parse`] for malformed input.
pub fn read_document(data: &[u8], source_name: &str) -> Result<XmlElement> {
    XmlParser::new().parse(data, source_name)
}

/// Write an element tree as indented UTF-8 bytes
///
/// # Errors
///
/// Returns [`Error::Serialize`] when the writer fails.
pub fn write_document(element: &XmlElement) -> Result<Vec<u8>> {
    XmlSerializer::new().serialize(element)
}

/// Parse `data` and reconcile `container` with the result
///
/// # Errors
///
/// Fails on malformed input or when the container rejects the element tree.
pub fn load_into(container: &mut dyn PartContainer, data: &[u8], source_name: &str) -> Result<()> {
    let element = read_document(data, source_name)?;
    modelkit_core::init_from_xml(container, &element)?;
    Ok(())
}

/// Serialize `container` to XML bytes
///
/// # Errors
///
/// Returns [`Error::Serialize`] when the writer fails.
pub fn save(container: &dyn PartContainer) -> Result<Vec<u8>> {
    write_document(&modelkit_core::to_xml(container))
}
