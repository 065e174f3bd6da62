//! Built-in structural rules applied to every container

use modelkit_core::{Locale, Message, MessageList, PartContainer};

/// Number of labels differs from the number of supported locales
pub const LABEL_COUNT_MISMATCH: &str = "LABEL_COUNT_MISMATCH";
/// Number of descriptions differs from the number of supported locales
pub const DESCRIPTION_COUNT_MISMATCH: &str = "DESCRIPTION_COUNT_MISMATCH";
/// A label or description exists for a locale the project does not support
pub const UNSUPPORTED_LOCALE: &str = "UNSUPPORTED_LOCALE";

/// Check labels and descriptions against the supported locales.
///
/// Every finding is a warning. Containers without label support pass.
pub fn validate_labels(container: &dyn PartContainer, locales: &[Locale]) -> MessageList {
    let mut messages = MessageList::new();
    let Some(labels) = container.label_support() else {
        return messages;
    };

    if labels.labels().len() != locales.len() {
        messages.add(
            Message::warning(
                LABEL_COUNT_MISMATCH,
                format!(
                    "{} has {} labels but the project supports {} locales",
                    container.kind(),
                    labels.labels().len(),
                    locales.len()
                ),
            )
            .with_ref(container.property_ref("labels")),
        );
    }
    if labels.descriptions().len() != locales.len() {
        messages.add(
            Message::warning(
                DESCRIPTION_COUNT_MISMATCH,
                format!(
                    "{} has {} descriptions but the project supports {} locales",
                    container.kind(),
                    labels.descriptions().len(),
                    locales.len()
                ),
            )
            .with_ref(container.property_ref("descriptions")),
        );
    }

    let used = labels
        .labels()
        .iter()
        .map(|l| (l.locale.as_ref(), "labels"))
        .chain(labels.descriptions().iter().map(|d| (d.locale.as_ref(), "descriptions")));
    for (locale, property) in used {
        let supported = locale.is_some_and(|l| locales.contains(l));
        if !supported {
            let shown = locale.map_or("<none>", Locale::as_str);
            messages.add(
                Message::warning(
                    UNSUPPORTED_LOCALE,
                    format!("Locale '{shown}' is not supported by the project"),
                )
                .with_ref(container.property_ref(property)),
            );
        }
    }

    messages
}
