//! In-memory XML element tree used as the persisted form of containers
#![allow(clippy::must_use_candidate)] // Accessors and builders are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builders return Self for chaining.

/// An XML element with ordered attributes, optional text and child elements.
///
/// Mixed content is not modelled: text belongs to the element, children
/// follow it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Tag name
    pub name: String,

    /// Attributes in document order
    pub attributes: Vec<(String, String)>,

    /// Text content (if any)
    pub text: Option<String>,

    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder: set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing one with the same key in place
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attributes.push((key, value));
        }
        self
    }

    /// Set an attribute only when a value is present
    pub fn set_optional_attribute(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.set_attribute(key, value);
        }
        self
    }

    /// Attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute parsed as a boolean; absent or unrecognised values yield `default`
    pub fn bool_attribute(&self, key: &str, default: bool) -> bool {
        match self.attribute(key).map(str::trim) {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Attribute treated as optional text: absent, empty and blank are all `None`
    pub fn text_attribute(&self, key: &str) -> Option<String> {
        self.attribute(key)
            .filter(|v| !v.trim().is_empty())
            .map(ToString::to_string)
    }

    /// Append a child element and return a mutable reference to it
    pub fn push_child(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// First child with the given tag
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given tag
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given tag
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text.as_deref())
    }
}
