//! Projects: a source directory of documents

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use modelkit_core::{DocumentScope, ExtensionPropertyRegistry, ListenerSet, Locale, PartContainer};
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::document::{Document, qualified_name_for};
use crate::kinds::ObjectKindRegistry;
use crate::resource::FileResource;
use crate::{Error, Result};

/// A named set of documents plus the projects it depends on
#[derive(Debug)]
pub struct Project {
    name: String,
    root: PathBuf,
    locales: Vec<Locale>,
    dependencies: Vec<String>,
    documents: IndexMap<String, Document>,
}

impl Project {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            locales: Vec::new(),
            dependencies: Vec::new(),
            documents: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(config.name.clone(), config.root.clone())
            .with_locales(config.locales.clone())
            .with_dependencies(config.dependencies.clone())
    }

    #[must_use]
    pub fn with_locales(mut self, locales: Vec<Locale>) -> Self {
        self.locales = locales;
        self
    }

    /// Projects searched after this one, in order
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source directory qualified names are derived from
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// A scope for a new document of this project
    #[must_use]
    pub fn new_scope(
        &self,
        registry: &Arc<ExtensionPropertyRegistry>,
        listeners: &Arc<ListenerSet>,
    ) -> Arc<DocumentScope> {
        Arc::new(
            DocumentScope::with_listeners(Arc::clone(registry), Arc::clone(listeners))
                .with_locales(self.locales.clone()),
        )
    }

    /// Add a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a document with the same qualified
    /// name exists.
    pub fn add_document(&mut self, document: Document) -> Result<()> {
        let name = document.qualified_name().to_string();
        if self.documents.contains_key(&name) {
            return Err(Error::Config(format!(
                "project '{}' already contains {name}",
                self.name
            )));
        }
        self.documents.insert(name, document);
        Ok(())
    }

    /// Remove a document, as when its resource was deleted
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDocument`] for unknown names and
    /// [`Error::Frozen`] for historic documents.
    pub fn remove_document(&mut self, qualified_name: &str) -> Result<Document> {
        match self.documents.get(qualified_name) {
            None => return Err(Error::UnknownDocument(qualified_name.to_string())),
            Some(document) if document.is_historic() => return Err(Error::frozen(qualified_name)),
            Some(_) => {}
        }
        self.documents
            .shift_remove(qualified_name)
            .ok_or_else(|| Error::UnknownDocument(qualified_name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.documents.contains_key(qualified_name)
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownDocument`] for unknown names.
    pub fn document(&self, qualified_name: &str) -> Result<&Document> {
        self.documents
            .get(qualified_name)
            .ok_or_else(|| Error::UnknownDocument(qualified_name.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownDocument`] for unknown names.
    pub fn document_mut(&mut self, qualified_name: &str) -> Result<&mut Document> {
        self.documents
            .get_mut(qualified_name)
            .ok_or_else(|| Error::UnknownDocument(qualified_name.to_string()))
    }

    /// Documents in the order they were added
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn documents_mut(&mut self) -> impl Iterator<Item = &mut Document> {
        self.documents.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Root of a loaded, parsable document of this project
    #[must_use]
    pub fn find_root(&self, qualified_name: &str) -> Option<&dyn PartContainer> {
        self.documents
            .get(qualified_name)
            .and_then(Document::loaded_root)
    }

    /// Roots of every loaded, parsable document
    pub fn roots(&self) -> impl Iterator<Item = &dyn PartContainer> {
        self.documents.values().filter_map(Document::loaded_root)
    }

    /// Add a document for every file below the source root with a
    /// registered extension. Files already known are left alone.
    ///
    /// Returns the number of documents added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when a directory cannot be listed.
    pub fn scan(
        &mut self,
        kinds: &ObjectKindRegistry,
        registry: &Arc<ExtensionPropertyRegistry>,
        listeners: &Arc<ListenerSet>,
    ) -> Result<usize> {
        let mut files = Vec::new();
        if self.root.is_dir() {
            collect_files(&self.root, &mut files)?;
        }
        files.sort();

        let mut added = 0;
        for file in files {
            let Some(kind) = kinds.for_path(&file) else {
                continue;
            };
            let Some(qualified_name) = qualified_name_for(&self.root, &file) else {
                continue;
            };
            if self.documents.contains_key(&qualified_name) {
                continue;
            }
            debug!(project = %self.name, document = %qualified_name, kind = kind.tag(), "Found document");
            let document = Document::new(
                qualified_name.clone(),
                *kind,
                Arc::new(FileResource::new(file)),
                self.new_scope(registry, listeners),
            );
            self.documents.insert(qualified_name, document);
            added += 1;
        }
        info!(project = %self.name, root = %self.root.display(), added, "Scanned project");
        Ok(added)
    }

    /// Load every document, collecting the failures by qualified name
    pub fn load_all(&mut self) -> Vec<(String, Error)> {
        let mut failures = Vec::new();
        for (name, document) in &mut self.documents {
            if let Err(e) = document.ensure_loaded() {
                failures.push((name.clone(), e));
            }
        }
        failures
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| Error::io(dir.display().to_string(), e))?
            .path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::ObjectKind;
    use crate::kinds::tests::Note;
    use crate::resource::MemoryResource;

    fn kinds() -> ObjectKindRegistry {
        let mut kinds = ObjectKindRegistry::new();
        kinds.register(Note::object_kind()).unwrap();
        kinds
    }

    fn memory_document(project: &Project, name: &str, xml: &str) -> Document {
        let registry = Arc::new(ExtensionPropertyRegistry::new());
        let listeners = Arc::new(ListenerSet::new());
        Document::new(
            name,
            Note::object_kind(),
            Arc::new(MemoryResource::with_content(name, xml)),
            project.new_scope(&registry, &listeners),
        )
    }

    #[test]
    fn test_scan_derives_qualified_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("motor/car")).unwrap();
        fs::write(dir.path().join("Top.note"), r#"<Note name="top"/>"#).unwrap();
        fs::write(dir.path().join("motor/car/Policy.note"), r#"<Note name="p"/>"#).unwrap();
        fs::write(dir.path().join("motor/readme.txt"), "ignored").unwrap();

        let mut project = Project::new("base", dir.path());
        let registry = Arc::new(ExtensionPropertyRegistry::new());
        let listeners = Arc::new(ListenerSet::new());
        assert_eq!(project.scan(&kinds(), &registry, &listeners).unwrap(), 2);
        assert!(project.contains("Top"));
        assert!(project.contains("motor.car.Policy"));

        assert_eq!(project.scan(&kinds(), &registry, &listeners).unwrap(), 0);
        assert!(project.load_all().is_empty());
        assert_eq!(project.roots().count(), 2);
    }

    #[test]
    fn test_scan_of_missing_root_finds_nothing() {
        let mut project = Project::new("empty", "/definitely/not/here");
        let registry = Arc::new(ExtensionPropertyRegistry::new());
        let listeners = Arc::new(ListenerSet::new());
        assert_eq!(project.scan(&kinds(), &registry, &listeners).unwrap(), 0);
        assert!(project.is_empty());
    }

    #[test]
    fn test_load_all_collects_failures() {
        let mut project = Project::new("p", "src");
        let good = memory_document(&project, "a.Good", r#"<Note name="g"/>"#);
        let bad = memory_document(&project, "a.Bad", "<Note");
        project.add_document(good).unwrap();
        project.add_document(bad).unwrap();

        let failures = project.load_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "a.Bad");
        assert!(project.find_root("a.Good").is_some());
        assert!(project.find_root("a.Bad").is_none());
    }

    #[test]
    fn test_document_management() {
        let mut project = Project::new("p", "src");
        let document = memory_document(&project, "a.Note", r#"<Note name="n"/>"#);
        project.add_document(document).unwrap();

        let duplicate = memory_document(&project, "a.Note", r#"<Note name="n"/>"#);
        assert!(matches!(project.add_document(duplicate), Err(Error::Config(_))));
        assert!(matches!(project.document("a.Other"), Err(Error::UnknownDocument(_))));

        let removed = project.remove_document("a.Note").unwrap();
        assert_eq!(removed.qualified_name(), "a.Note");
        assert!(project.is_empty());
        assert!(matches!(
            project.remove_document("a.Note"),
            Err(Error::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_historic_document_cannot_be_removed() {
        let mut project = Project::new("p", "src");
        let kind: ObjectKind = Note::object_kind();
        let snapshot = Document::historic(
            "a.Old",
            kind,
            r#"<Note name="old"/>"#,
            Arc::new(ExtensionPropertyRegistry::new()),
        )
        .unwrap();
        project.add_document(snapshot).unwrap();

        assert!(matches!(project.remove_document("a.Old"), Err(Error::Frozen { .. })));
        assert!(project.contains("a.Old"));
    }

    #[test]
    fn test_scope_carries_project_locales() {
        let project = Project::new("p", "src").with_locales(vec![Locale::new("en")]);
        let scope = project.new_scope(
            &Arc::new(ExtensionPropertyRegistry::new()),
            &Arc::new(ListenerSet::new()),
        );
        assert_eq!(scope.locales(), &[Locale::new("en")]);
    }
}
