//! Validation result cache invalidated by change events

use dashmap::DashMap;
use modelkit_core::{ChangeEvent, ChangeKind, ChangeListener, DocumentKey, InstanceId, MessageList};
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry {
    document: DocumentKey,
    ancestors: Vec<InstanceId>,
    messages: MessageList,
}

/// Cached message lists keyed by container identity.
///
/// A cached list covers the container and its whole subtree. On a change
/// event the origin, its ancestors and its descendants are evicted within
/// the originating document. Entries of every other document are evicted as
/// well, since rules may resolve types across documents.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entries: DashMap<InstanceId, CacheEntry>,
}

impl ValidationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached list for a container, if still valid
    #[must_use]
    pub fn get(&self, instance: InstanceId) -> Option<MessageList> {
        let hit = self.entries.get(&instance).map(|entry| entry.messages.clone());
        if hit.is_some() {
            trace!(instance = %instance, "Validation cache hit");
        }
        hit
    }

    /// Store the list for a container attached to `document`
    pub fn insert(
        &self,
        instance: InstanceId,
        document: DocumentKey,
        ancestors: Vec<InstanceId>,
        messages: MessageList,
    ) {
        self.entries.insert(
            instance,
            CacheEntry {
                document,
                ancestors,
                messages,
            },
        );
    }

    /// Evict every entry a change could affect
    pub fn invalidate(&self, event: &ChangeEvent) {
        let before = self.entries.len();
        match event.kind {
            ChangeKind::ContentReplaced => self.entries.clear(),
            _ => self.entries.retain(|instance, entry| {
                entry.document == event.document
                    && !event.affects(*instance)
                    && !entry.ancestors.contains(&event.origin)
            }),
        }
        trace!(
            document = %event.document,
            evicted = before.saturating_sub(self.entries.len()),
            "Validation cache invalidated"
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn contains(&self, instance: InstanceId) -> bool {
        self.entries.contains_key(&instance)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ChangeListener for ValidationCache {
    fn on_change(&self, event: &ChangeEvent) {
        self.invalidate(event);
    }
}
