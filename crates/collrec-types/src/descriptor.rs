//! Collection descriptor (`parameter.json`) model.
//!
//! The descriptor is the only file recovery trusts. It is written to
//! [`TEMP_DESCRIPTOR_FILE_NAME`] first and renamed to
//! [`DESCRIPTOR_FILE_NAME`], so a canonical file that fails to decode was
//! never committed by this engine.

use std::path::Path;

use collrec_error::{CollrecError, Result};
use serde::{Deserialize, Serialize};

use crate::id::CollectionId;

/// Canonical descriptor file name inside a collection directory.
pub const DESCRIPTOR_FILE_NAME: &str = "parameter.json";

/// Suffix marking an in-progress descriptor write.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Temp descriptor file name (canonical name plus [`TEMP_SUFFIX`]).
pub const TEMP_DESCRIPTOR_FILE_NAME: &str = "parameter.json.tmp";

/// Descriptor format version written by this engine.
pub const DESCRIPTOR_VERSION: u32 = 5;

const DEFAULT_JOURNAL_SIZE: u64 = 32 * 1024 * 1024;
const DEFAULT_INDEX_BUCKETS: u32 = 8;

/// Lifecycle flag persisted in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    New,
    Unloaded,
    Loaded,
    Deleted,
    Corrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    #[default]
    Document,
    Edge,
}

/// Storage options carried alongside the identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub wait_for_sync: bool,
    #[serde(default = "default_journal_size")]
    pub journal_size: u64,
    #[serde(default)]
    pub is_volatile: bool,
    #[serde(default = "default_index_buckets")]
    pub index_buckets: u32,
}

impl Default for CollectionProperties {
    fn default() -> Self {
        Self {
            is_system: false,
            wait_for_sync: false,
            journal_size: DEFAULT_JOURNAL_SIZE,
            is_volatile: false,
            index_buckets: DEFAULT_INDEX_BUCKETS,
        }
    }
}

const fn default_journal_size() -> u64 {
    DEFAULT_JOURNAL_SIZE
}

const fn default_index_buckets() -> u32 {
    DEFAULT_INDEX_BUCKETS
}

const fn default_version() -> u32 {
    DESCRIPTOR_VERSION
}

/// Persisted metadata record identifying a collection.
///
/// Unknown fields are ignored on decode so newer writers stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    #[serde(rename = "cid")]
    pub id: CollectionId,
    pub status: CollectionStatus,
    #[serde(rename = "type", default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub properties: CollectionProperties,
}

impl Descriptor {
    /// Descriptor for a newly created document collection.
    #[must_use]
    pub fn new(name: impl Into<String>, id: CollectionId) -> Self {
        Self {
            name: name.into(),
            id,
            status: CollectionStatus::New,
            kind: CollectionKind::Document,
            deleted: false,
            version: DESCRIPTOR_VERSION,
            properties: CollectionProperties::default(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CollectionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: CollectionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: CollectionProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Whether a drop has been recorded in this descriptor.
    #[must_use]
    pub fn is_marked_deleted(&self) -> bool {
        self.deleted || self.status == CollectionStatus::Deleted
    }

    /// Copy of this descriptor with the drop recorded.
    #[must_use]
    pub fn marked_deleted(&self) -> Self {
        Self {
            status: CollectionStatus::Deleted,
            deleted: true,
            ..self.clone()
        }
    }

    /// Serialize to the on-disk representation.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|err| CollrecError::internal(format!("descriptor encode failed: {err}")))
    }

    /// Decode descriptor bytes read from `path`.
    ///
    /// Empty input, malformed JSON, and an empty `name` are all rejected
    /// with [`CollrecError::DescriptorParse`]; no partial decode is
    /// attempted.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(CollrecError::parse(path, "descriptor is empty"));
        }
        let descriptor: Self = serde_json::from_slice(bytes)
            .map_err(|err| CollrecError::parse(path, err.to_string()))?;
        if descriptor.name.is_empty() {
            return Err(CollrecError::parse(path, "descriptor has an empty name"));
        }
        Ok(descriptor)
    }
}
