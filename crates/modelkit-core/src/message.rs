//! Validation messages produced by containers, rules and plugins
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{InstanceId, PartId};

/// Severity level for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// The offending object and, optionally, the offending property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperty {
    /// Container instance the message refers to
    pub object: InstanceId,

    /// Persisted id of the container, absent for root objects
    pub part: Option<PartId>,

    /// Property name within the container
    pub property: Option<String>,
}

impl ObjectProperty {
    /// Reference a whole object
    pub fn object(object: InstanceId) -> Self {
        Self {
            object,
            part: None,
            property: None,
        }
    }

    /// Reference one property of an object
    pub fn property(object: InstanceId, property: impl Into<String>) -> Self {
        Self {
            object,
            part: None,
            property: Some(property.into()),
        }
    }

    /// Attach the persisted part id
    pub fn with_part(mut self, part: PartId) -> Self {
        self.part = Some(part);
        self
    }
}

/// A single validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable message code
    pub code: String,

    /// Human-readable text
    pub text: String,

    /// Severity level
    pub severity: Severity,

    /// Objects and properties the message refers to
    pub refs: Vec<ObjectProperty>,
}

impl Message {
    /// Create a message without references
    pub fn new(code: impl Into<String>, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
            severity,
            refs: Vec::new(),
        }
    }

    /// Create an error message
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(code, text, Severity::Error)
    }

    /// Create a warning message
    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(code, text, Severity::Warning)
    }

    /// Create an info message
    pub fn info(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(code, text, Severity::Info)
    }

    /// Add a reference
    pub fn with_ref(mut self, reference: ObjectProperty) -> Self {
        self.refs.push(reference);
        self
    }

    /// Whether the message refers to the given object (any property)
    pub fn refers_to(&self, object: InstanceId) -> bool {
        self.refs.iter().any(|r| r.object == object)
    }

    /// Whether the message refers to the given object property
    pub fn refers_to_property(&self, object: InstanceId, property: &str) -> bool {
        self.refs
            .iter()
            .any(|r| r.object == object && r.property.as_deref() == Some(property))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.text)
    }
}

/// Ordered list of validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append all messages of another list, keeping their order
    pub fn extend(&mut self, other: MessageList) {
        self.messages.extend(other.messages);
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate messages in order
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Highest severity in the list
    pub fn max_severity(&self) -> Option<Severity> {
        self.messages.iter().map(|m| m.severity).max()
    }

    /// Whether any error-severity message exists
    pub fn has_errors(&self) -> bool {
        self.max_severity() == Some(Severity::Error)
    }

    /// First message with the given code
    pub fn by_code(&self, code: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.code == code)
    }

    /// Messages with the given code
    pub fn all_by_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Message> {
        self.messages.iter().filter(move |m| m.code == code)
    }

    /// Messages referring to the given object
    pub fn for_object(&self, object: InstanceId) -> MessageList {
        self.messages
            .iter()
            .filter(|m| m.refers_to(object))
            .cloned()
            .collect()
    }
}

impl FromIterator<Message> for MessageList {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MessageList {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
