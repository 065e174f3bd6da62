//! Indented XML writer for element trees

use modelkit_core::XmlElement;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::{Error, Result};

/// XML writer for element trees
#[derive(Debug, Clone, Copy)]
pub struct XmlSerializer {
    indent: usize,
}

impl Default for XmlSerializer {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl XmlSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `indent` spaces per nesting level
    #[must_use]
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    /// Serialize `element` as a complete UTF-8 document with a trailing newline
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] when the underlying writer fails.
    pub fn serialize(&self, element: &XmlElement) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.indent);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::Serialize(format!("write error: {e}")))?;
        write_element(&mut writer, element)?;

        let mut output = writer.into_inner().into_inner();
        output.push(b'\n');
        Ok(output)
    }

    /// Serialize to a string
    ///
    /// # Errors
    ///
    /// See [`serialize`](Self::serialize).
    pub fn serialize_to_string(&self, element: &XmlElement) -> Result<String> {
        let bytes = self.serialize(element)?;
        String::from_utf8(bytes).map_err(|e| Error::Serialize(e.to_string()))
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::Serialize(format!("write error: {e}")));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Serialize(format!("write error: {e}")))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Serialize(format!("write error: {e}")))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| Error::Serialize(format!("write error: {e}")))
}
