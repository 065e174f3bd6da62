//! Change events and listener fan-out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::id::{DocumentKey, InstanceId, PartId};

/// What happened to a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// The whole content of the document was replaced (reload, discard)
    ContentReplaced,

    /// A part was added to the originating container
    PartAdded { part: PartId },

    /// A property of the originating container changed
    PartChanged { property: Option<String> },

    /// A part was removed from the originating container
    PartRemoved { part: PartId },

    /// Parts of one collection of the originating container changed order
    PartsReordered { collection: String },
}

/// A structured change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Document the change happened in
    pub document: DocumentKey,

    /// Container the change originated from
    pub origin: InstanceId,

    /// Ancestors of the origin, root first
    pub ancestors: Vec<InstanceId>,

    /// Kind of change
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Whether `instance` is the origin or one of its ancestors
    pub fn affects(&self, instance: InstanceId) -> bool {
        self.origin == instance || self.ancestors.contains(&instance)
    }
}

/// Receives change events.
///
/// Listeners run on the mutating call stack and must not mutate the
/// document that fired the event.
pub trait ChangeListener: Send + Sync {
    /// Called once per change
    fn on_change(&self, event: &ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent) {
        self(event);
    }
}

/// Handle returned by [`ListenerSet::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entry = (ListenerId, Arc<dyn ChangeListener>);

/// A set of listeners shared by every document of a workspace
#[derive(Default)]
pub struct ListenerSet {
    next: AtomicU64,
    listeners: RwLock<Vec<Entry>>,
}

impl ListenerSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn add(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(candidate, _)| *candidate != id);
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener registered at the time of the call
    pub fn broadcast(&self, event: &ChangeEvent) {
        let snapshot: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener.on_change(event);
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
