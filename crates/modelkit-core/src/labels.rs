//! Per-locale labels and descriptions
//!
//! [`LabelSupport`] is held by every container type that opts into labels
//! and descriptions. The codec reads and writes it through
//! [`PartContainer::label_support`](crate::container::PartContainer::label_support).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::change::ChangeKind;
use crate::container::PartContainer;
use crate::xml::XmlElement;

/// XML tag of a label entry
pub const LABEL_TAG: &str = "Label";
/// XML tag of a description entry
pub const DESCRIPTION_TAG: &str = "Description";

const LOCALE_ATTRIBUTE: &str = "locale";
const VALUE_ATTRIBUTE: &str = "value";
const PLURAL_VALUE_ATTRIBUTE: &str = "pluralValue";

/// A locale code such as `en` or `de`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    /// Wrap a locale code
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    /// The locale code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Singular and plural label for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub locale: Option<Locale>,
    pub value: String,
    pub plural_value: String,
}

/// Description text for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub locale: Option<Locale>,
    pub text: String,
}

/// Labels and descriptions of one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSupport {
    labels: Vec<Label>,
    descriptions: Vec<Description>,
}

impl LabelSupport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn descriptions(&self) -> &[Description] {
        &self.descriptions
    }

    #[must_use]
    pub fn label(&self, locale: &Locale) -> Option<&Label> {
        self.labels.iter().find(|l| l.locale.as_ref() == Some(locale))
    }

    #[must_use]
    pub fn description(&self, locale: &Locale) -> Option<&Description> {
        self.descriptions
            .iter()
            .find(|d| d.locale.as_ref() == Some(locale))
    }

    /// Create missing label and description entries for each locale.
    /// Returns whether anything was added.
    pub fn ensure_locales(&mut self, locales: &[Locale]) -> bool {
        let mut added = false;
        for locale in locales {
            if self.label(locale).is_none() {
                self.labels.push(Label {
                    locale: Some(locale.clone()),
                    value: String::new(),
                    plural_value: String::new(),
                });
                added = true;
            }
            if self.description(locale).is_none() {
                self.descriptions.push(Description {
                    locale: Some(locale.clone()),
                    text: String::new(),
                });
                added = true;
            }
        }
        added
    }

    fn set_label(&mut self, locale: &Locale, value: &str, plural_value: &str) -> bool {
        match self.labels.iter_mut().find(|l| l.locale.as_ref() == Some(locale)) {
            Some(label) if label.value == value && label.plural_value == plural_value => false,
            Some(label) => {
                label.value = value.to_string();
                label.plural_value = plural_value.to_string();
                true
            }
            None => {
                self.labels.push(Label {
                    locale: Some(locale.clone()),
                    value: value.to_string(),
                    plural_value: plural_value.to_string(),
                });
                true
            }
        }
    }

    fn set_description(&mut self, locale: &Locale, text: &str) -> bool {
        match self
            .descriptions
            .iter_mut()
            .find(|d| d.locale.as_ref() == Some(locale))
        {
            Some(description) if description.text == text => false,
            Some(description) => {
                description.text = text.to_string();
                true
            }
            None => {
                self.descriptions.push(Description {
                    locale: Some(locale.clone()),
                    text: text.to_string(),
                });
                true
            }
        }
    }

    /// Append label and description elements
    pub fn write_xml(&self, element: &mut XmlElement) {
        for label in &self.labels {
            let mut child = XmlElement::new(LABEL_TAG);
            child.set_optional_attribute(LOCALE_ATTRIBUTE, label.locale.as_ref().map(Locale::as_str));
            child.set_attribute(VALUE_ATTRIBUTE, &label.value);
            child.set_attribute(PLURAL_VALUE_ATTRIBUTE, &label.plural_value);
            element.children.push(child);
        }
        for description in &self.descriptions {
            let mut child = XmlElement::new(DESCRIPTION_TAG);
            child.set_optional_attribute(
                LOCALE_ATTRIBUTE,
                description.locale.as_ref().map(Locale::as_str),
            );
            if !description.text.is_empty() {
                child.text = Some(description.text.clone());
            }
            element.children.push(child);
        }
    }

    /// Rebuild all entries from the label and description children of `element`
    pub fn read_xml(&mut self, element: &XmlElement) {
        self.labels = element
            .children_named(LABEL_TAG)
            .map(|child| Label {
                locale: child.text_attribute(LOCALE_ATTRIBUTE).map(Locale::new),
                value: child.attribute(VALUE_ATTRIBUTE).unwrap_or_default().to_string(),
                plural_value: child
                    .attribute(PLURAL_VALUE_ATTRIBUTE)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();
        self.descriptions = element
            .children_named(DESCRIPTION_TAG)
            .map(|child| Description {
                locale: child.text_attribute(LOCALE_ATTRIBUTE).map(Locale::new),
                text: child.text.clone().unwrap_or_default(),
            })
            .collect();
    }
}

/// Set the label of `container` for `locale`, firing a change event when it changed.
///
/// Returns `false` when the container has no label support or nothing changed.
pub fn set_label(
    container: &mut dyn PartContainer,
    locale: &Locale,
    value: &str,
    plural_value: &str,
) -> bool {
    let changed = container
        .label_support_mut()
        .is_some_and(|labels| labels.set_label(locale, value, plural_value));
    if changed {
        container.core().notify(ChangeKind::PartChanged {
            property: Some(format!("label[{locale}]")),
        });
    }
    changed
}

/// Set the description of `container` for `locale`, firing a change event when it changed.
pub fn set_description(container: &mut dyn PartContainer, locale: &Locale, text: &str) -> bool {
    let changed = container
        .label_support_mut()
        .is_some_and(|labels| labels.set_description(locale, text));
    if changed {
        container.core().notify(ChangeKind::PartChanged {
            property: Some(format!("description[{locale}]")),
        });
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_locales_adds_missing_entries_once() {
        let mut labels = LabelSupport::new();
        let locales = vec![Locale::new("en"), Locale::new("de")];

        assert!(labels.ensure_locales(&locales));
        assert!(!labels.ensure_locales(&locales));
        assert_eq!(labels.labels().len(), 2);
        assert_eq!(labels.descriptions().len(), 2);
    }

    #[test]
    fn test_xml_rebuilds_entries() {
        let mut labels = LabelSupport::new();
        labels.set_label(&Locale::new("en"), "Car", "Cars");
        labels.set_description(&Locale::new("en"), "A vehicle");

        let mut element = XmlElement::new("Owner");
        labels.write_xml(&mut element);

        let mut restored = LabelSupport::new();
        restored.ensure_locales(&[Locale::new("fr")]);
        restored.read_xml(&element);

        assert_eq!(restored, labels);
        assert!(restored.label(&Locale::new("fr")).is_none());
    }

    #[test]
    fn test_set_label_reports_change() {
        let mut labels = LabelSupport::new();
        let en = Locale::new("en");
        assert!(labels.set_label(&en, "A", "As"));
        assert!(!labels.set_label(&en, "A", "As"));
        assert!(labels.set_label(&en, "B", "As"));
        assert_eq!(labels.label(&en).map(|l| l.value.as_str()), Some("B"));
    }
}
