//! Recovery configuration.
//!
//! Loaded from TOML by the server bootstrap or assembled in code:
//!
//! ```toml
//! data_root = "/var/lib/engine/databases/db-1"
//! worker_threads = 4
//! create_data_root = false
//! sync_directories = true
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use collrec_error::{CollrecError, Result};
use serde::Deserialize;

/// Upper bound on classification workers.
pub const MAX_WORKER_THREADS: usize = 64;

const DEFAULT_WORKER_CAP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Directory holding one subdirectory per collection.
    pub data_root: PathBuf,
    /// Threads used to classify directories during the scan.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Create `data_root` if it does not exist (fresh engine).
    #[serde(default)]
    pub create_data_root: bool,
    /// fsync the collection directory after a descriptor rename.
    #[serde(default = "default_sync_directories")]
    pub sync_directories: bool,
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(DEFAULT_WORKER_CAP)
}

const fn default_sync_directories() -> bool {
    true
}

impl RecoveryConfig {
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            worker_threads: default_worker_threads(),
            create_data_root: false,
            sync_directories: default_sync_directories(),
        }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    #[must_use]
    pub fn with_create_data_root(mut self, create: bool) -> Self {
        self.create_data_root = create;
        self
    }

    #[must_use]
    pub fn with_sync_directories(mut self, sync: bool) -> Self {
        self.sync_directories = sync;
        self
    }

    /// Reject configurations recovery cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(CollrecError::config("data_root must not be empty"));
        }
        if self.worker_threads == 0 || self.worker_threads > MAX_WORKER_THREADS {
            return Err(CollrecError::config(format!(
                "worker_threads must be within 1..={MAX_WORKER_THREADS}, got {}",
                self.worker_threads
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| CollrecError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
