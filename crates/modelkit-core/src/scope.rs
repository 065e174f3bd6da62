//! Document scope shared by every container of one document

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::change::{ChangeEvent, ListenerSet};
use crate::extension::ExtensionPropertyRegistry;
use crate::id::DocumentKey;
use crate::labels::Locale;

/// Per-document state reachable from every attached container: the
/// modification flag, the extension registry, the listeners events fan out
/// to, and the locales new parts get labels for.
#[derive(Debug)]
pub struct DocumentScope {
    key: DocumentKey,
    registry: Arc<ExtensionPropertyRegistry>,
    listeners: Arc<ListenerSet>,
    locales: Vec<Locale>,
    historic: bool,
    modified: AtomicBool,
}

impl DocumentScope {
    /// Create a scope with its own listener set
    #[must_use]
    pub fn new(registry: Arc<ExtensionPropertyRegistry>) -> Self {
        Self::with_listeners(registry, Arc::new(ListenerSet::new()))
    }

    /// Create a scope that fans out to a shared listener set
    #[must_use]
    pub fn with_listeners(
        registry: Arc<ExtensionPropertyRegistry>,
        listeners: Arc<ListenerSet>,
    ) -> Self {
        Self {
            key: DocumentKey::next(),
            registry,
            listeners,
            locales: Vec::new(),
            historic: false,
            modified: AtomicBool::new(false),
        }
    }

    /// Locales for which new parts get label and description entries
    #[must_use]
    pub fn with_locales(mut self, locales: Vec<Locale>) -> Self {
        self.locales = locales;
        self
    }

    /// Mark the scope as a frozen snapshot
    #[must_use]
    pub fn historic(mut self) -> Self {
        self.historic = true;
        self
    }

    #[must_use]
    pub fn key(&self) -> DocumentKey {
        self.key
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ExtensionPropertyRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }

    #[must_use]
    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }

    #[must_use]
    pub fn is_historic(&self) -> bool {
        self.historic
    }

    /// Whether a change was fired since the last [`mark_clean`](Self::mark_clean)
    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.historic && self.modified.load(Ordering::SeqCst)
    }

    pub fn mark_clean(&self) {
        self.modified.store(false, Ordering::SeqCst);
    }

    /// Mark the document modified and deliver the event to the listeners
    pub fn fire(&self, event: &ChangeEvent) {
        if !self.historic {
            self.modified.store(true, Ordering::SeqCst);
        }
        self.listeners.broadcast(event);
    }

    /// Deliver an event without touching the modification flag
    pub fn broadcast(&self, event: &ChangeEvent) {
        self.listeners.broadcast(event);
    }
}
