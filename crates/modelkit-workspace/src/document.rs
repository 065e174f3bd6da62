//! Documents: one root object bound to one byte resource
//!
//! Content is parsed lazily on first access. A parse failure leaves the
//! document unparsable with an empty root; accessors then fail with
//! [`Error::ContentUnavailable`] instead of handing out stale content.
//! Historic documents are frozen snapshots built from bytes.

use std::path::Path;
use std::sync::Arc;

use modelkit_core::{
    ChangeEvent, ChangeKind, DocumentScope, ExtensionPropertyRegistry, PartContainer,
};
use tracing::{debug, error, info, warn};

use crate::kinds::ObjectKind;
use crate::resource::{ByteResource, MemoryResource, ModificationStamp, WriteOutcome};
use crate::{Error, Result};

/// Qualified name of the object stored at `file` below `source_root`:
/// directories become package segments, the extension is dropped
/// (`a/b/Name.ctype` becomes `a.b.Name`).
#[must_use]
pub fn qualified_name_for(source_root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(source_root).ok()?;
    let stem = relative.file_stem()?.to_str()?;
    let mut segments: Vec<&str> = relative
        .parent()
        .map(|parent| parent.iter().filter_map(|s| s.to_str()).collect())
        .unwrap_or_default();
    segments.push(stem);
    Some(segments.join("."))
}

enum Content {
    Unloaded,
    Loaded {
        root: Box<dyn PartContainer>,
        stamp: ModificationStamp,
        saved: Vec<u8>,
    },
    Unparsable {
        root: Box<dyn PartContainer>,
        stamp: ModificationStamp,
    },
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => f.write_str("Unloaded"),
            Self::Loaded { root, stamp, .. } => f
                .debug_struct("Loaded")
                .field("root", &root.instance())
                .field("stamp", stamp)
                .finish_non_exhaustive(),
            Self::Unparsable { stamp, .. } => f
                .debug_struct("Unparsable")
                .field("stamp", stamp)
                .finish_non_exhaustive(),
        }
    }
}

/// A root object and the resource it is persisted in
#[derive(Debug)]
pub struct Document {
    qualified_name: String,
    kind: ObjectKind,
    resource: Arc<dyn ByteResource>,
    scope: Arc<DocumentScope>,
    content: Content,
}

impl Document {
    /// A document whose content is read on first access
    pub fn new(
        qualified_name: impl Into<String>,
        kind: ObjectKind,
        resource: Arc<dyn ByteResource>,
        scope: Arc<DocumentScope>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            resource,
            scope,
            content: Content::Unloaded,
        }
    }

    /// A frozen snapshot of `data`, parsed immediately
    ///
    /// # Errors
    ///
    /// Returns the parse or structure error when `data` is not a valid
    /// document of `kind`.
    pub fn historic(
        qualified_name: impl Into<String>,
        kind: ObjectKind,
        data: impl Into<Vec<u8>>,
        registry: Arc<ExtensionPropertyRegistry>,
    ) -> Result<Self> {
        let qualified_name = qualified_name.into();
        let resource = Arc::new(MemoryResource::with_content(
            format!("{qualified_name} (historic)"),
            data,
        ));
        let scope = Arc::new(DocumentScope::new(registry).historic());
        let mut document = Self::new(qualified_name, kind, resource, scope);
        document.ensure_loaded()?;
        Ok(document)
    }

    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    #[must_use]
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    #[must_use]
    pub fn resource(&self) -> &Arc<dyn ByteResource> {
        &self.resource
    }

    #[must_use]
    pub fn scope(&self) -> &Arc<DocumentScope> {
        &self.scope
    }

    #[must_use]
    pub fn is_historic(&self) -> bool {
        self.scope.is_historic()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !matches!(self.content, Content::Unloaded)
    }

    /// False once a parse of the resource failed
    #[must_use]
    pub fn is_parsable(&self) -> bool {
        !matches!(self.content, Content::Unparsable { .. })
    }

    /// Whether a change happened since the last load or save
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.scope.is_modified()
    }

    pub fn mark_clean(&self) {
        self.scope.mark_clean();
    }

    /// Parse the resource unless already done.
    ///
    /// A failed parse is logged, leaves an empty root behind and is not
    /// retried until [`refresh`](Self::refresh) sees a new modification
    /// stamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the resource cannot be read (the document
    /// stays unloaded), and [`Error::Parse`] or [`Error::Structure`] when its
    /// content is malformed.
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let data = self.resource.read()?;
        let stamp = self.resource.modification_stamp();
        self.install(data, stamp)
    }

    /// Root of a loaded, parsable document
    #[must_use]
    pub fn loaded_root(&self) -> Option<&dyn PartContainer> {
        match &self.content {
            Content::Loaded { root, .. } => Some(root.as_ref()),
            _ => None,
        }
    }

    /// The root object, loading it first
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContentUnavailable`] when the content cannot be
    /// parsed, and the load error on first access.
    pub fn root(&mut self) -> Result<&dyn PartContainer> {
        self.ensure_loaded()?;
        match &self.content {
            Content::Loaded { root, .. } => Ok(root.as_ref()),
            _ => Err(Error::content_unavailable(&self.qualified_name)),
        }
    }

    /// The root object for mutation
    ///
    /// # Errors
    ///
    /// Returns [`Error::Frozen`] for historic documents, otherwise as
    /// [`root`](Self::root).
    pub fn root_mut(&mut self) -> Result<&mut dyn PartContainer> {
        if self.is_historic() {
            return Err(Error::frozen(&self.qualified_name));
        }
        self.ensure_loaded()?;
        match &mut self.content {
            Content::Loaded { root, .. } => Ok(root.as_mut()),
            _ => Err(Error::content_unavailable(&self.qualified_name)),
        }
    }

    /// The root object downcast to its concrete type
    ///
    /// # Errors
    ///
    /// As [`root`](Self::root); [`Error::UnknownKind`] when the root is not a `T`.
    pub fn root_as<T: PartContainer>(&mut self) -> Result<&T> {
        let kind = self.kind.tag();
        self.root()?
            .downcast_ref::<T>()
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// The root object downcast to its concrete type, for mutation
    ///
    /// # Errors
    ///
    /// As [`root_mut`](Self::root_mut); [`Error::UnknownKind`] when the root
    /// is not a `T`.
    pub fn root_as_mut<T: PartContainer>(&mut self) -> Result<&mut T> {
        let kind = self.kind.tag();
        self.root_mut()?
            .downcast_mut::<T>()
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// Write the root back to the resource
    ///
    /// # Errors
    ///
    /// Returns [`Error::Frozen`] for historic documents,
    /// [`Error::ContentUnavailable`] for unparsable ones and
    /// [`Error::WriteConflict`] when the resource changed out of band and
    /// `force` is not set.
    pub fn save(&mut self, force: bool) -> Result<()> {
        if self.is_historic() {
            return Err(Error::frozen(&self.qualified_name));
        }
        let (root, saved, stamp) = match &mut self.content {
            Content::Unloaded => return Ok(()),
            Content::Unparsable { .. } => {
                return Err(Error::content_unavailable(&self.qualified_name));
            }
            Content::Loaded { root, saved, stamp } => (root, saved, stamp),
        };

        let data = modelkit_xml::save(root.as_ref())
            .map_err(|e| Error::from_xml(&self.qualified_name, e))?;
        match self.resource.write(&data, force)? {
            WriteOutcome::Conflict => return Err(Error::write_conflict(&self.qualified_name)),
            WriteOutcome::Written => {}
        }
        *stamp = self.resource.modification_stamp();
        *saved = data;
        self.scope.mark_clean();
        info!(document = %self.qualified_name, force, "Saved document");
        Ok(())
    }

    /// Revert the root to the last loaded or saved content.
    ///
    /// Part identities survive; listeners get one content-replaced event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Frozen`] for historic documents.
    pub fn discard_changes(&mut self) -> Result<()> {
        if self.is_historic() {
            return Err(Error::frozen(&self.qualified_name));
        }
        let Content::Loaded { root, saved, .. } = &mut self.content else {
            return Ok(());
        };
        if !self.scope.is_modified() {
            return Ok(());
        }
        modelkit_xml::load_into(root.as_mut(), saved, &self.qualified_name)
            .map_err(|e| Error::from_xml(&self.qualified_name, e))?;
        let origin = root.instance();
        self.content_replaced(origin);
        debug!(document = %self.qualified_name, "Discarded changes");
        Ok(())
    }

    /// Pick up an out-of-band change of the resource.
    ///
    /// A clean document is reconciled with the new content, keeping part
    /// identities; a dirty one keeps its in-memory state and the conflict
    /// surfaces on the next save. Returns whether the content was replaced.
    ///
    /// # Errors
    ///
    /// Returns the read or parse error of the new content.
    pub fn refresh(&mut self) -> Result<bool> {
        let known = match &self.content {
            Content::Unloaded => return Ok(false),
            Content::Loaded { stamp, .. } | Content::Unparsable { stamp, .. } => *stamp,
        };
        let current = self.resource.modification_stamp();
        if current == known {
            return Ok(false);
        }
        if self.is_dirty() {
            warn!(document = %self.qualified_name, "Resource changed under unsaved edits");
            return Ok(false);
        }
        let data = self.resource.read()?;
        let installed = self.install(data, current);
        if let Some(origin) = self.any_root().map(PartContainer::instance) {
            self.content_replaced(origin);
        }
        installed?;
        info!(document = %self.qualified_name, "Reloaded changed resource");
        Ok(true)
    }

    fn any_root(&self) -> Option<&dyn PartContainer> {
        match &self.content {
            Content::Loaded { root, .. } | Content::Unparsable { root, .. } => Some(root.as_ref()),
            Content::Unloaded => None,
        }
    }

    /// Parse `data` into the existing root (keeping identities) or a fresh
    /// one, falling back to an empty unparsable root on failure
    fn install(&mut self, data: Vec<u8>, stamp: ModificationStamp) -> Result<()> {
        let previous = std::mem::replace(&mut self.content, Content::Unloaded);
        let mut root = match previous {
            Content::Loaded { root, .. } | Content::Unparsable { root, .. } => root,
            Content::Unloaded => self.fresh_root(),
        };

        match self.parse_into(root.as_mut(), &data) {
            Ok(()) => {
                debug!(document = %self.qualified_name, %stamp, "Loaded document");
                self.content = Content::Loaded {
                    root,
                    stamp,
                    saved: data,
                };
                self.scope.mark_clean();
                Ok(())
            }
            Err(e) => {
                error!(document = %self.qualified_name, error = %e, "Document is unparsable");
                self.content = Content::Unparsable {
                    root: self.fresh_root(),
                    stamp,
                };
                self.scope.mark_clean();
                Err(e)
            }
        }
    }

    fn parse_into(&self, root: &mut dyn PartContainer, data: &[u8]) -> Result<()> {
        let source = self.resource.name();
        let element = modelkit_xml::read_document(data, &source)
            .map_err(|e| Error::from_xml(&self.qualified_name, e))?;
        if element.name != self.kind.tag() {
            return Err(Error::parse(
                &self.qualified_name,
                format!(
                    "root element is <{}>, expected <{}>",
                    element.name,
                    self.kind.tag()
                ),
            ));
        }
        modelkit_core::init_from_xml(root, &element)
            .map_err(|e| Error::structure(&self.qualified_name, e))
    }

    fn fresh_root(&self) -> Box<dyn PartContainer> {
        let mut root = self.kind.create();
        root.core_mut().set_qualified_name(self.qualified_name.clone());
        root.core_mut().attach(Arc::clone(&self.scope), Vec::new());
        root
    }

    fn content_replaced(&self, origin: modelkit_core::InstanceId) {
        self.scope.broadcast(&ChangeEvent {
            document: self.scope.key(),
            origin,
            ancestors: Vec::new(),
            kind: ChangeKind::ContentReplaced,
        });
        self.scope.mark_clean();
    }
}
