use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for collection-directory recovery.
///
/// Per-directory failures never surface through this type during a scan;
/// the classifier converts them into incomplete classifications. Only
/// root-level and catalog-invariant failures reach the caller.
#[derive(Error, Debug)]
pub enum CollrecError {
    // === I/O Errors ===
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data root itself could not be listed.
    #[error("cannot list data root '{path}': {source}")]
    DataRootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data root does not exist and creation was not requested.
    #[error("data root does not exist: '{path}'")]
    DataRootMissing { path: PathBuf },

    // === Descriptor Errors ===
    /// Descriptor content is empty or malformed.
    #[error("malformed collection descriptor '{path}': {detail}")]
    DescriptorParse { path: PathBuf, detail: String },

    // === Catalog Errors ===
    /// Two valid descriptors declare the same logical collection name.
    #[error("duplicate collection name '{name}': declared by '{first}' and '{second}'")]
    DuplicateCollectionName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Two valid descriptors declare the same collection id.
    #[error("duplicate collection id {id}: declared by '{first}' and '{second}'")]
    DuplicateCollectionId {
        id: u64,
        first: PathBuf,
        second: PathBuf,
    },

    // === Layout Errors ===
    /// A collection directory already exists at the allocated path.
    #[error("collection directory already exists: '{path}'")]
    CollectionDirExists { path: PathBuf },

    /// The path does not name a collection directory.
    #[error("not a collection directory: '{path}'")]
    InvalidDirectoryName { path: PathBuf },

    // === Configuration Errors ===
    /// Recovery configuration is unusable.
    #[error("invalid recovery configuration: {detail}")]
    InvalidConfig { detail: String },

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Filesystem operation failed.
    Io,
    /// Descriptor content malformed.
    Parse,
    /// Catalog invariant violated (duplicate name or id).
    Duplicate,
    /// Bad caller input or configuration.
    Usage,
    /// Bug.
    Internal,
}

impl CollrecError {
    /// Classify this error into the recovery taxonomy.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) | Self::DataRootUnreadable { .. } | Self::DataRootMissing { .. } => {
                ErrorClass::Io
            }
            Self::DescriptorParse { .. } => ErrorClass::Parse,
            Self::DuplicateCollectionName { .. } | Self::DuplicateCollectionId { .. } => {
                ErrorClass::Duplicate
            }
            Self::CollectionDirExists { .. }
            | Self::InvalidDirectoryName { .. }
            | Self::InvalidConfig { .. } => ErrorClass::Usage,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether this error must abort engine startup when raised by recovery.
    pub const fn is_fatal_to_startup(&self) -> bool {
        matches!(
            self,
            Self::DataRootUnreadable { .. }
                | Self::DataRootMissing { .. }
                | Self::DuplicateCollectionName { .. }
                | Self::DuplicateCollectionId { .. }
                | Self::InvalidConfig { .. }
                | Self::Internal(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DataRootUnreadable { .. } => {
                Some("Check that the data directory exists and is readable by the server")
            }
            Self::DataRootMissing { .. } => {
                Some("Create the data directory or enable create_data_root")
            }
            Self::DuplicateCollectionName { .. } | Self::DuplicateCollectionId { .. } => Some(
                "Move one of the conflicting collection directories out of the data root",
            ),
            Self::InvalidConfig { .. } => Some("Fix the recovery configuration and restart"),
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::Io => 10,
            ErrorClass::Parse => 11,
            ErrorClass::Duplicate => 12,
            ErrorClass::Usage => 2,
            ErrorClass::Internal => 70,
        }
    }

    /// Create a descriptor parse error.
    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::DescriptorParse {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `CollrecError`.
pub type Result<T> = std::result::Result<T, CollrecError>;
