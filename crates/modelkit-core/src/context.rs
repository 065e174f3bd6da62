//! Project context visible to validation rules

use crate::container::PartContainer;
use crate::labels::Locale;

/// The project a validated object belongs to, as seen by rules.
///
/// Lookups cover the project and, transitively, the projects it depends on.
pub trait ProjectContext {
    fn project_name(&self) -> &str;

    /// Locales every label-supporting container should carry entries for
    fn supported_locales(&self) -> &[Locale];

    /// Root object with the given qualified name
    fn find_object(&self, qualified_name: &str) -> Option<&dyn PartContainer>;

    /// Every loaded root object of the project and its dependencies
    fn objects(&self) -> Vec<&dyn PartContainer>;

    /// Root objects of projects that depend on this one
    fn dependent_objects(&self) -> Vec<&dyn PartContainer> {
        Vec::new()
    }
}

/// Context handed to every validation step
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    project: &'a dyn ProjectContext,
}

impl<'a> ValidationContext<'a> {
    #[must_use]
    pub fn new(project: &'a dyn ProjectContext) -> Self {
        Self { project }
    }

    #[must_use]
    pub fn project(&self) -> &'a dyn ProjectContext {
        self.project
    }

    #[must_use]
    pub fn find_object(&self, qualified_name: &str) -> Option<&'a dyn PartContainer> {
        self.project.find_object(qualified_name)
    }

    #[must_use]
    pub fn supported_locales(&self) -> &'a [Locale] {
        self.project.supported_locales()
    }
}

impl std::fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("project", &self.project.project_name())
            .finish()
    }
}

/// A project context without objects
#[derive(Debug, Default, Clone)]
pub struct EmptyProject {
    pub name: String,
    pub locales: Vec<Locale>,
}

impl ProjectContext for EmptyProject {
    fn project_name(&self) -> &str {
        &self.name
    }

    fn supported_locales(&self) -> &[Locale] {
        &self.locales
    }

    fn find_object(&self, _qualified_name: &str) -> Option<&dyn PartContainer> {
        None
    }

    fn objects(&self) -> Vec<&dyn PartContainer> {
        Vec::new()
    }
}
