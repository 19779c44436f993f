//! Lazy removal of leftover directories.
//!
//! Runs outside the recovery window on the `incomplete` set of a scan, which
//! may be stale by then. Each path is re-checked against the collection
//! naming pattern and re-classified right before removal: an unrecognized
//! or meanwhile committed directory is never removed.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::classify::{Classification, classify};
use crate::layout::parse_dir_name;
use crate::scan::ScanReport;
use crate::writer::remove_tree_if_present;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub already_gone: Vec<PathBuf>,
    /// Paths that could not be removed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remove every directory in `report.incomplete`. Idempotent.
pub fn purge_incomplete(report: &ScanReport) -> CleanupReport {
    let mut outcome = CleanupReport::default();

    for path in report.incomplete_paths() {
        if parse_dir_name(path).is_none() {
            warn!(target: "collrec.cleanup", path = %path.display(), "refusing to remove unrecognized directory");
            outcome
                .failed
                .push((path.to_path_buf(), "not a collection directory".to_owned()));
            continue;
        }
        if let Classification::Valid(descriptor) = classify(path) {
            warn!(
                target: "collrec.cleanup",
                path = %path.display(),
                collection = %descriptor.name,
                "skipping directory that now holds a committed descriptor"
            );
            outcome
                .failed
                .push((path.to_path_buf(), "directory is now valid".to_owned()));
            continue;
        }
        match remove_tree_if_present(path) {
            Ok(true) => outcome.removed.push(path.to_path_buf()),
            Ok(false) => outcome.already_gone.push(path.to_path_buf()),
            Err(err) => {
                warn!(
                    target: "collrec.cleanup",
                    path = %path.display(),
                    error = %err,
                    "failed to remove leftover collection directory"
                );
                outcome.failed.push((path.to_path_buf(), err.to_string()));
            }
        }
    }

    info!(
        target: "collrec.cleanup",
        removed = outcome.removed.len(),
        already_gone = outcome.already_gone.len(),
        failed = outcome.failed.len(),
        "leftover cleanup finished"
    );
    outcome
}
