//! Per-directory classification.
//!
//! Inspects only the directory name and the descriptor files. Never writes,
//! renames, or deletes anything.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use collrec_error::{CollrecError, Result};
use collrec_types::{CollectionId, Descriptor};
use serde::Serialize;
use tracing::debug;

use crate::layout::{descriptor_path, parse_dir_name, temp_descriptor_path};

/// Why a directory is excluded from the catalog but still ours to clean up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncompleteReason {
    /// No canonical descriptor (crash before the rename, or before any
    /// descriptor write).
    MissingDescriptor { temp_present: bool },
    /// Canonical descriptor exists but has no content.
    EmptyDescriptor,
    /// Canonical descriptor does not decode.
    MalformedDescriptor { detail: String },
    /// Descriptor records a drop that did not finish.
    MarkedDeleted,
    /// Directory was renamed to `deleted-<id>` by a drop.
    DropInProgress,
    /// Descriptor belongs to a different collection id than the directory.
    IdMismatch {
        dir_id: CollectionId,
        descriptor_id: CollectionId,
    },
    /// Probing or reading the directory failed.
    Unreadable { detail: String },
}

impl IncompleteReason {
    /// Leftover of an interrupted drop rather than an interrupted create.
    #[must_use]
    pub const fn is_drop_leftover(&self) -> bool {
        matches!(self, Self::MarkedDeleted | Self::DropInProgress)
    }
}

/// Verdict for one candidate directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Valid(Descriptor),
    Incomplete(IncompleteReason),
    Unrecognized,
}

/// Read and decode the canonical descriptor of `dir`.
pub fn read_descriptor(dir: &Path) -> Result<Descriptor> {
    let path = descriptor_path(dir);
    let bytes = fs::read(&path)?;
    Descriptor::decode(&path, &bytes)
}

/// Classify one candidate directory.
pub fn classify(dir: &Path) -> Classification {
    let Some(name) = parse_dir_name(dir) else {
        return Classification::Unrecognized;
    };
    if name.is_dropping() {
        return Classification::Incomplete(IncompleteReason::DropInProgress);
    }

    let path = descriptor_path(dir);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let temp_present = match fs::symlink_metadata(temp_descriptor_path(dir)) {
                Ok(_) => true,
                Err(err) if err.kind() == ErrorKind::NotFound => false,
                Err(err) => {
                    return Classification::Incomplete(IncompleteReason::Unreadable {
                        detail: err.to_string(),
                    });
                }
            };
            return Classification::Incomplete(IncompleteReason::MissingDescriptor {
                temp_present,
            });
        }
        Err(err) => {
            return Classification::Incomplete(IncompleteReason::Unreadable {
                detail: err.to_string(),
            });
        }
    };

    if bytes.is_empty() {
        return Classification::Incomplete(IncompleteReason::EmptyDescriptor);
    }

    let descriptor = match Descriptor::decode(&path, &bytes) {
        Ok(descriptor) => descriptor,
        Err(CollrecError::DescriptorParse { detail, .. }) => {
            debug!(
                target: "collrec.classify",
                path = %path.display(),
                detail = %detail,
                "descriptor does not decode"
            );
            return Classification::Incomplete(IncompleteReason::MalformedDescriptor { detail });
        }
        Err(err) => {
            return Classification::Incomplete(IncompleteReason::Unreadable {
                detail: err.to_string(),
            });
        }
    };

    if descriptor.is_marked_deleted() {
        return Classification::Incomplete(IncompleteReason::MarkedDeleted);
    }
    if descriptor.id != name.id {
        return Classification::Incomplete(IncompleteReason::IdMismatch {
            dir_id: name.id,
            descriptor_id: descriptor.id,
        });
    }
    Classification::Valid(descriptor)
}
