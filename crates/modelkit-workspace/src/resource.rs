//! Byte resources backing documents
//!
//! A resource remembers the modification stamp it last synchronized with,
//! through a read or a write. A write finding a different stamp means the
//! content was changed out of band and is refused unless forced.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Opaque version of a resource's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationStamp {
    /// The resource does not exist
    Missing,

    /// File system modification time and length
    Modified { at: DateTime<Utc>, len: u64 },

    /// In-memory revision counter
    Revision(u64),
}

impl fmt::Display for ModificationStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Modified { at, len } => write!(f, "{} ({len} bytes)", at.to_rfc3339()),
            Self::Revision(revision) => write!(f, "r{revision}"),
        }
    }
}

/// Result of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,

    /// The resource changed since it was last read or written
    Conflict,
}

/// Storage a document reads its content from and writes it back to
pub trait ByteResource: Send + Sync + fmt::Debug {
    /// Name used in diagnostics
    fn name(&self) -> String;

    /// Read the whole content and synchronize with the current stamp
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the content cannot be read.
    fn read(&self) -> Result<Vec<u8>>;

    /// Replace the whole content.
    ///
    /// Without `force`, a resource changed since the last read or write is
    /// left alone and [`WriteOutcome::Conflict`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the content cannot be written.
    fn write(&self, data: &[u8], force: bool) -> Result<WriteOutcome>;

    fn modification_stamp(&self) -> ModificationStamp;

    fn exists(&self) -> bool;
}

/// A file on disk
#[derive(Debug)]
pub struct FileResource {
    path: PathBuf,
    synced: Mutex<Option<ModificationStamp>>,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synced: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sync(&self) {
        let stamp = self.modification_stamp();
        *self.synced.lock().unwrap_or_else(PoisonError::into_inner) = Some(stamp);
    }
}

impl ByteResource for FileResource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<Vec<u8>> {
        let data = fs::read(&self.path).map_err(|e| Error::io(self.name(), e))?;
        self.sync();
        debug!(path = %self.path.display(), bytes = data.len(), "Read resource");
        Ok(data)
    }

    fn write(&self, data: &[u8], force: bool) -> Result<WriteOutcome> {
        let synced = *self.synced.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.modification_stamp();
        // A never-synchronized handle may only create the file.
        let expected = synced.unwrap_or(ModificationStamp::Missing);
        if !force && current != expected {
            warn!(
                path = %self.path.display(),
                %expected,
                %current,
                "Refusing to overwrite externally modified resource"
            );
            return Ok(WriteOutcome::Conflict);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(self.name(), e))?;
        }
        fs::write(&self.path, data).map_err(|e| Error::io(self.name(), e))?;
        self.sync();
        Ok(WriteOutcome::Written)
    }

    fn modification_stamp(&self) -> ModificationStamp {
        match fs::metadata(&self.path) {
            Ok(metadata) => metadata
                .modified()
                .map(|time| ModificationStamp::Modified {
                    at: DateTime::<Utc>::from(time),
                    len: metadata.len(),
                })
                .unwrap_or(ModificationStamp::Missing),
            Err(_) => ModificationStamp::Missing,
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    data: Option<Vec<u8>>,
    revision: u64,
    synced: Option<u64>,
}

/// Content held in memory, for snapshots and tests
#[derive(Debug, Default)]
pub struct MemoryResource {
    name: String,
    state: Mutex<MemoryState>,
}

impl MemoryResource {
    /// A resource that does not exist yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::default(),
        }
    }

    /// A resource holding `data`
    pub fn with_content(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let resource = Self::new(name);
        resource.replace_content(data);
        resource
    }

    /// Change the content without synchronizing, as an outside editor would
    pub fn replace_content(&self, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.data = Some(data.into());
        state.revision += 1;
    }

    /// Current content
    #[must_use]
    pub fn content(&self) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }
}

impl ByteResource for MemoryResource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read(&self) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let data = state.data.clone().ok_or_else(|| {
            Error::io(
                self.name.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no content"),
            )
        })?;
        state.synced = Some(state.revision);
        Ok(data)
    }

    fn write(&self, data: &[u8], force: bool) -> Result<WriteOutcome> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let in_sync = match state.synced {
            Some(revision) => revision == state.revision,
            None => state.data.is_none(),
        };
        if !force && !in_sync {
            warn!(resource = %self.name, "Refusing to overwrite externally modified resource");
            return Ok(WriteOutcome::Conflict);
        }
        state.data = Some(data.to_vec());
        state.revision += 1;
        state.synced = Some(state.revision);
        Ok(WriteOutcome::Written)
    }

    fn modification_stamp(&self) -> ModificationStamp {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.data.is_some() {
            ModificationStamp::Revision(state.revision)
        } else {
            ModificationStamp::Missing
        }
    }

    fn exists(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .is_some()
    }
}
