//! Workspace configuration loaded from YAML or JSON

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use modelkit_core::Locale;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// The projects of a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

/// One project: a source directory plus the projects it builds on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// Source directory, relative to the configuration file
    pub root: PathBuf,

    #[serde(default)]
    pub locales: Vec<Locale>,

    /// Names of the projects this one depends on, in lookup order
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl WorkspaceConfig {
    /// Load a configuration file, YAML for `.yaml`/`.yml` and JSON otherwise.
    ///
    /// Relative project roots are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Config`] when it is malformed or inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let is_yaml = path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml");
        let mut config = if is_yaml {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for project in &mut config.projects {
            if project.root.is_relative() {
                project.root = base.join(&project.root);
            }
        }
        debug!(path = %path.display(), projects = config.projects.len(), "Loaded workspace configuration");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] when the text is malformed or inconsistent.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] when the text is malformed or inconsistent.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that project names are unique and every dependency names a
    /// configured project other than the dependent itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for project in &self.projects {
            if project.name.trim().is_empty() {
                return Err(Error::Config("project name must not be empty".to_string()));
            }
            if !names.insert(project.name.as_str()) {
                return Err(Error::Config(format!(
                    "project '{}' is configured twice",
                    project.name
                )));
            }
        }
        for project in &self.projects {
            for dependency in &project.dependencies {
                if dependency == &project.name {
                    return Err(Error::Config(format!(
                        "project '{}' depends on itself",
                        project.name
                    )));
                }
                if !names.contains(dependency.as_str()) {
                    return Err(Error::Config(format!(
                        "project '{}' depends on unknown project '{dependency}'",
                        project.name
                    )));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }
}
