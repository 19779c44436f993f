//! Recovery scan over the data root.
//!
//! Lists the immediate subdirectories of the data root once, classifies each
//! independently, and buckets the results. The filesystem is never mutated.
//! Output vectors are sorted by path, so repeated scans of an unchanged
//! snapshot compare equal.

use std::fs;
use std::path::{Path, PathBuf};

use collrec_error::{CollrecError, Result};
use collrec_types::Descriptor;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{Classification, IncompleteReason, classify};
use crate::layout::parse_dir_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidEntry {
    /// Directory file name (opaque identifier, not the logical name).
    pub dir_name: String,
    pub path: PathBuf,
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteEntry {
    pub path: PathBuf,
    pub reason: IncompleteReason,
}

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub valid: Vec<ValidEntry>,
    /// Candidates for the lazy cleanup pass.
    pub incomplete: Vec<IncompleteEntry>,
    /// Directories that are not ours; neither loaded nor cleaned up.
    pub unrecognized: Vec<PathBuf>,
}

impl ScanReport {
    /// No leftovers were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.incomplete.is_empty()
    }

    pub fn incomplete_paths(&self) -> impl Iterator<Item = &Path> {
        self.incomplete.iter().map(|entry| entry.path.as_path())
    }

    fn push(&mut self, path: PathBuf, classification: Classification) {
        match classification {
            Classification::Valid(descriptor) => {
                let dir_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.valid.push(ValidEntry {
                    dir_name,
                    path,
                    descriptor,
                });
            }
            Classification::Incomplete(reason) => {
                self.incomplete.push(IncompleteEntry { path, reason });
            }
            Classification::Unrecognized => self.unrecognized.push(path),
        }
    }

    fn sort(&mut self) {
        self.valid.sort_by(|a, b| a.path.cmp(&b.path));
        self.incomplete.sort_by(|a, b| a.path.cmp(&b.path));
        self.unrecognized.sort();
    }
}

/// Scan `data_root` on the calling thread.
pub fn scan(data_root: &Path) -> Result<ScanReport> {
    scan_with_workers(data_root, 1)
}

/// Scan `data_root`, classifying directories on up to `workers` scoped
/// threads.
///
/// Fails only if the data root itself cannot be listed.
pub fn scan_with_workers(data_root: &Path, workers: usize) -> Result<ScanReport> {
    let unreadable_root = |source: std::io::Error| CollrecError::DataRootUnreadable {
        path: data_root.to_path_buf(),
        source,
    };

    let mut report = ScanReport::default();
    let mut candidates = Vec::new();
    for entry in fs::read_dir(data_root).map_err(unreadable_root)? {
        let path = entry.map_err(unreadable_root)?.path();
        // Follows symlinks: a link to a collection directory is scanned.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => candidates.push(path),
            Ok(_) => {
                debug!(target: "collrec.scan", path = %path.display(), "skipping non-directory entry");
            }
            Err(err) => {
                if parse_dir_name(&path).is_some() {
                    warn!(
                        target: "collrec.scan",
                        path = %path.display(),
                        error = %err,
                        "cannot stat collection directory"
                    );
                    report.push(
                        path,
                        Classification::Incomplete(IncompleteReason::Unreadable {
                            detail: err.to_string(),
                        }),
                    );
                } else {
                    report.push(path, Classification::Unrecognized);
                }
            }
        }
    }

    for (path, classification) in classify_all(candidates, workers.max(1)) {
        debug!(
            target: "collrec.scan",
            path = %path.display(),
            classification = classification_label(&classification),
            "classified directory"
        );
        report.push(path, classification);
    }
    report.sort();
    Ok(report)
}

fn classify_all(candidates: Vec<PathBuf>, workers: usize) -> Vec<(PathBuf, Classification)> {
    if workers == 1 || candidates.len() < 2 {
        return candidates
            .into_iter()
            .map(|path| {
                let classification = classify(&path);
                (path, classification)
            })
            .collect();
    }

    let chunk_len = candidates.len().div_ceil(workers);
    std::thread::scope(|s| {
        let joins: Vec<_> = candidates
            .chunks(chunk_len)
            .map(|part| {
                let handle = s.spawn(move || {
                    part.iter()
                        .map(|path| (path.clone(), classify(path)))
                        .collect::<Vec<_>>()
                });
                (part, handle)
            })
            .collect();

        joins
            .into_iter()
            .flat_map(|(part, handle)| {
                handle.join().unwrap_or_else(|_| {
                    warn!(target: "collrec.scan", dirs = part.len(), "classification worker panicked");
                    part.iter()
                        .map(|path| {
                            (
                                path.clone(),
                                Classification::Incomplete(IncompleteReason::Unreadable {
                                    detail: "classification worker panicked".to_owned(),
                                }),
                            )
                        })
                        .collect()
                })
            })
            .collect()
    })
}

const fn classification_label(classification: &Classification) -> &'static str {
    match classification {
        Classification::Valid(_) => "valid",
        Classification::Incomplete(_) => "incomplete",
        Classification::Unrecognized => "unrecognized",
    }
}
