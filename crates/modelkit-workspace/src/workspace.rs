//! The workspace: projects, shared listeners and cross-project lookup

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use modelkit_core::{
    ExtensionPropertyRegistry, ListenerSet, Locale, MessageList, PartContainer,
    ProjectContext, ValidationContext,
};
use modelkit_validation::{CustomValidationRegistry, ValidationCache, ValidationEngine};
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::document::Document;
use crate::kinds::ObjectKindRegistry;
use crate::project::Project;
use crate::{Error, Result};

/// Every project of one workspace.
///
/// All documents share one listener set; the validation cache listens on
/// it, so an edit in any document evicts the results that may depend on it.
#[derive(Debug)]
pub struct Workspace {
    projects: IndexMap<String, Project>,
    kinds: ObjectKindRegistry,
    registry: Arc<ExtensionPropertyRegistry>,
    listeners: Arc<ListenerSet>,
    engine: ValidationEngine,
}

impl Workspace {
    #[must_use]
    pub fn new(kinds: ObjectKindRegistry) -> Self {
        Self::with_registry(kinds, Arc::new(ExtensionPropertyRegistry::new()))
    }

    /// Workspace whose documents use the given extension properties
    #[must_use]
    pub fn with_registry(kinds: ObjectKindRegistry, registry: Arc<ExtensionPropertyRegistry>) -> Self {
        let listeners = Arc::new(ListenerSet::new());
        let engine = ValidationEngine::with_cache(Arc::new(ValidationCache::new()), &listeners);
        Self {
            projects: IndexMap::new(),
            kinds,
            registry,
            listeners,
            engine,
        }
    }

    /// Use `registry` for custom validations
    #[must_use]
    pub fn with_custom_validations(mut self, registry: Arc<CustomValidationRegistry>) -> Self {
        self.engine = self.engine.with_custom_validations(registry);
        self
    }

    /// Build a workspace from configuration and scan every project root
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for inconsistent configuration and
    /// [`Error::Io`] when a source directory cannot be listed.
    pub fn from_config(config: &WorkspaceConfig, kinds: ObjectKindRegistry) -> Result<Self> {
        config.validate()?;
        let mut workspace = Self::new(kinds);
        // Dependencies must exist before their dependents are added.
        let mut pending: Vec<_> = config.projects.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut index = 0;
            while index < pending.len() {
                let ready = pending[index]
                    .dependencies
                    .iter()
                    .all(|d| workspace.projects.contains_key(d));
                if ready {
                    let project = pending.remove(index);
                    workspace.add_project(Project::from_config(project))?;
                } else {
                    index += 1;
                }
            }
            if pending.len() == before {
                let names: Vec<&str> = pending.iter().map(|p| p.name.as_str()).collect();
                return Err(Error::Config(format!(
                    "project dependencies form a cycle: {}",
                    names.join(", ")
                )));
            }
        }
        for project in workspace.projects.values_mut() {
            project.scan(&workspace.kinds, &workspace.registry, &workspace.listeners)?;
        }
        Ok(workspace)
    }

    /// Load configuration from a file and build the workspace
    ///
    /// # Errors
    ///
    /// As [`WorkspaceConfig::load`] and [`from_config`](Self::from_config).
    pub fn open(path: &Path, kinds: ObjectKindRegistry) -> Result<Self> {
        let config = WorkspaceConfig::load(path)?;
        Self::from_config(&config, kinds)
    }

    /// Add a project whose dependencies are already part of the workspace
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a duplicate name and
    /// [`Error::UnknownProject`] for a missing dependency.
    pub fn add_project(&mut self, project: Project) -> Result<()> {
        if self.projects.contains_key(project.name()) {
            return Err(Error::Config(format!(
                "project '{}' already exists",
                project.name()
            )));
        }
        if let Some(missing) = project
            .dependencies()
            .iter()
            .find(|d| !self.projects.contains_key(d.as_str()))
        {
            return Err(Error::UnknownProject(missing.clone()));
        }
        debug!(project = project.name(), dependencies = ?project.dependencies(), "Added project");
        self.projects.insert(project.name().to_string(), project);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] for unknown names.
    pub fn project(&self, name: &str) -> Result<&Project> {
        self.projects
            .get(name)
            .ok_or_else(|| Error::UnknownProject(name.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] for unknown names.
    pub fn project_mut(&mut self, name: &str) -> Result<&mut Project> {
        self.projects
            .get_mut(name)
            .ok_or_else(|| Error::UnknownProject(name.to_string()))
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    #[must_use]
    pub fn kinds(&self) -> &ObjectKindRegistry {
        &self.kinds
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ExtensionPropertyRegistry> {
        &self.registry
    }

    /// Listener set shared by every document of the workspace
    #[must_use]
    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }

    #[must_use]
    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] or [`Error::UnknownDocument`].
    pub fn document(&self, project: &str, qualified_name: &str) -> Result<&Document> {
        self.project(project)?.document(qualified_name)
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] or [`Error::UnknownDocument`].
    pub fn document_mut(&mut self, project: &str, qualified_name: &str) -> Result<&mut Document> {
        self.project_mut(project)?.document_mut(qualified_name)
    }

    /// Load every document of every project, collecting the failures.
    ///
    /// Loading is silent, so cached validation results are dropped: a newly
    /// loaded type may resolve references that failed before.
    pub fn load_all(&mut self) -> Vec<(String, Error)> {
        let mut failures = Vec::new();
        for project in self.projects.values_mut() {
            failures.extend(project.load_all());
        }
        if let Some(cache) = self.engine.cache() {
            cache.clear();
        }
        info!(
            projects = self.projects.len(),
            failures = failures.len(),
            "Loaded workspace"
        );
        failures
    }

    /// Pick up out-of-band changes of every loaded document.
    ///
    /// Returns the names of the documents whose content was replaced and
    /// the failures.
    pub fn refresh_all(&mut self) -> (Vec<String>, Vec<(String, Error)>) {
        let mut replaced = Vec::new();
        let mut failures = Vec::new();
        for project in self.projects.values_mut() {
            for document in project.documents_mut() {
                match document.refresh() {
                    Ok(true) => replaced.push(document.qualified_name().to_string()),
                    Ok(false) => {}
                    Err(e) => failures.push((document.qualified_name().to_string(), e)),
                }
            }
        }
        (replaced, failures)
    }

    /// The project as validation rules see it
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] for unknown names.
    pub fn project_context(&self, name: &str) -> Result<ProjectView<'_>> {
        let project = self.project(name)?;
        Ok(ProjectView {
            workspace: self,
            project,
        })
    }

    /// Validate one loaded document
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`], [`Error::UnknownDocument`], or
    /// [`Error::ContentUnavailable`] when the document is not loaded or
    /// unparsable.
    pub fn validate_document(&self, project: &str, qualified_name: &str) -> Result<MessageList> {
        let view = self.project_context(project)?;
        let document = view.project.document(qualified_name)?;
        let root = document
            .loaded_root()
            .ok_or_else(|| Error::content_unavailable(qualified_name))?;
        Ok(self.engine.validate(root, &ValidationContext::new(&view)))
    }

    /// Validate every loaded document of a project, in document order
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProject`] for unknown names.
    pub fn validate_project(&self, name: &str) -> Result<Vec<(String, MessageList)>> {
        let view = self.project_context(name)?;
        let context = ValidationContext::new(&view);
        let results = view
            .project
            .documents()
            .filter_map(|document| {
                document.loaded_root().map(|root| {
                    (
                        document.qualified_name().to_string(),
                        self.engine.validate(root, &context),
                    )
                })
            })
            .collect();
        Ok(results)
    }

    /// Projects searched for a qualified name from `start`: the project,
    /// then its dependencies depth first in declaration order
    fn lookup_order<'a>(&'a self, start: &'a Project) -> Vec<&'a Project> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit(start, &mut visited, &mut order);
        order
    }

    fn visit<'a>(
        &'a self,
        project: &'a Project,
        visited: &mut HashSet<&'a str>,
        order: &mut Vec<&'a Project>,
    ) {
        if !visited.insert(project.name()) {
            return;
        }
        order.push(project);
        for dependency in project.dependencies() {
            if let Some(dependency) = self.projects.get(dependency) {
                self.visit(dependency, visited, order);
            }
        }
    }

    /// Projects depending on `project`, directly or transitively
    fn dependents_of<'a>(&'a self, project: &'a Project) -> Vec<&'a Project> {
        self.projects
            .values()
            .filter(|candidate| candidate.name() != project.name())
            .filter(|candidate| {
                self.lookup_order(*candidate)
                    .iter()
                    .any(|p| p.name() == project.name())
            })
            .collect()
    }
}

/// One project of a workspace as a [`ProjectContext`]
#[derive(Debug, Clone, Copy)]
pub struct ProjectView<'a> {
    workspace: &'a Workspace,
    project: &'a Project,
}

impl<'a> ProjectView<'a> {
    #[must_use]
    pub fn project(&self) -> &'a Project {
        self.project
    }

    /// Names of the projects searched, in order
    #[must_use]
    pub fn lookup_order(&self) -> Vec<&'a str> {
        self.workspace
            .lookup_order(self.project)
            .into_iter()
            .map(Project::name)
            .collect()
    }
}

impl ProjectContext for ProjectView<'_> {
    fn project_name(&self) -> &str {
        self.project.name()
    }

    fn supported_locales(&self) -> &[Locale] {
        self.project.locales()
    }

    fn find_object(&self, qualified_name: &str) -> Option<&dyn PartContainer> {
        self.workspace
            .lookup_order(self.project)
            .into_iter()
            .find_map(|project| project.find_root(qualified_name))
    }

    fn objects(&self) -> Vec<&dyn PartContainer> {
        self.workspace
            .lookup_order(self.project)
            .into_iter()
            .flat_map(Project::roots)
            .collect()
    }

    fn dependent_objects(&self) -> Vec<&dyn PartContainer> {
        self.workspace
            .dependents_of(self.project)
            .into_iter()
            .flat_map(Project::roots)
            .collect()
    }
}
