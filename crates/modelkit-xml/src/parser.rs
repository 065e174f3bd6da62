//! Streaming XML reader producing element trees

use modelkit_core::XmlElement;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::{Error, Result};

/// XML reader for element trees.
///
/// Text content is kept as written. Whitespace-only text is dropped from
/// elements that have child elements and from outside the root. Comments,
/// processing instructions and the declaration are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlParser;

impl XmlParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete document with exactly one root element
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed XML, non UTF-8 names, a missing
    /// root element, unclosed elements or content after the root.
    pub fn parse(&self, data: &[u8], source_name: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(start_element(e, source_name)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = start_element(e, source_name)?;
                    close(element, &mut stack, &mut root, source_name)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::parse(source_name, "unexpected closing tag"))?;
                    close(element, &mut stack, &mut root, source_name)?;
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape().map_err(|e| {
                        Error::parse(source_name, format!("text content error: {e}"))
                    })?;
                    append_text(&mut stack, &text, source_name)?;
                }
                Ok(Event::CData(ref e)) => {
                    let text = std::str::from_utf8(e).map_err(|e| {
                        Error::parse(source_name, format!("CDATA is not UTF-8: {e}"))
                    })?;
                    append_text(&mut stack, text, source_name)?;
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::parse(
                        source_name,
                        format!("XML error at position {}: {e}", reader.error_position()),
                    ));
                }
                Ok(other) => trace!(event = ?other, "Skipping XML event"),
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(Error::parse(
                source_name,
                format!("element <{}> is not closed", open.name),
            ));
        }
        let root = root.ok_or_else(|| Error::parse(source_name, "document has no root element"))?;
        debug!(source = source_name, root = %root.name, "Parsed XML document");
        Ok(root)
    }
}

fn start_element(e: &BytesStart<'_>, source_name: &str) -> Result<XmlElement> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| Error::parse(source_name, format!("tag name is not UTF-8: {err}")))?
        .to_string();
    let mut element = XmlElement::new(name);

    for attr_result in e.attributes() {
        let attr = attr_result
            .map_err(|err| Error::parse(source_name, format!("attribute error: {err}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| Error::parse(source_name, format!("attribute key error: {err}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::parse(source_name, format!("attribute value error: {err}")))?
            .to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn close(
    mut element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    source_name: &str,
) -> Result<()> {
    // Indentation between child elements is layout, not content.
    if !element.children.is_empty() && element.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        element.text = None;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::parse(
            source_name,
            format!("second root element <{}>", element.name),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [XmlElement], text: &str, source_name: &str) -> Result<()> {
    let Some(current) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(Error::parse(source_name, "text outside of the root element"));
    };
    match &mut current.text {
        Some(existing) => existing.push_str(text),
        None => current.text = Some(text.to_string()),
    }
    Ok(())
}
