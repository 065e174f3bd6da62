//! Object kinds: which root type a file holds

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use modelkit_core::PartContainer;

use crate::{Error, Result};

/// A root object type stored in files with one extension
#[derive(Clone, Copy)]
pub struct ObjectKind {
    tag: &'static str,
    extension: &'static str,
    factory: fn() -> Box<dyn PartContainer>,
}

impl ObjectKind {
    /// `tag` is the root element name, `extension` the file extension
    /// without the dot
    #[must_use]
    pub fn new(
        tag: &'static str,
        extension: &'static str,
        factory: fn() -> Box<dyn PartContainer>,
    ) -> Self {
        Self {
            tag,
            extension,
            factory,
        }
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// An empty, unattached root object
    #[must_use]
    pub fn create(&self) -> Box<dyn PartContainer> {
        (self.factory)()
    }
}

impl fmt::Debug for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKind")
            .field("tag", &self.tag)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Object kinds by file extension
#[derive(Debug, Default, Clone)]
pub struct ObjectKindRegistry {
    kinds: IndexMap<&'static str, ObjectKind>,
}

impl ObjectKindRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the extension is already taken.
    pub fn register(&mut self, kind: ObjectKind) -> Result<()> {
        if let Some(existing) = self.kinds.get(kind.extension) {
            return Err(Error::Config(format!(
                "extension '.{}' is already registered for {}",
                kind.extension, existing.tag
            )));
        }
        self.kinds.insert(kind.extension, kind);
        Ok(())
    }

    #[must_use]
    pub fn for_extension(&self, extension: &str) -> Option<&ObjectKind> {
        self.kinds.get(extension)
    }

    /// Kind of the file at `path`, by its extension
    #[must_use]
    pub fn for_path(&self, path: &Path) -> Option<&ObjectKind> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.for_extension(e))
    }

    #[must_use]
    pub fn for_tag(&self, tag: &str) -> Option<&ObjectKind> {
        self.kinds.values().find(|k| k.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectKind> {
        self.kinds.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
