//! Startup recovery: scan the data root, then rebuild the catalog.
//!
//! Must complete before the catalog is exposed to request handling. The
//! returned [`ScanReport`] is handed to the cleanup job afterwards; recovery
//! itself never removes anything.

use std::fs;
use std::io::ErrorKind;
use std::time::Instant;

use collrec_error::{CollrecError, Result};
use tracing::{error, info, warn};

use crate::catalog::{Catalog, rebuild};
use crate::config::RecoveryConfig;
use crate::scan::{ScanReport, scan_with_workers};

/// Outcome of a successful recovery.
#[derive(Debug)]
pub struct Recovered {
    pub catalog: Catalog,
    pub report: ScanReport,
}

/// Run startup recovery for `config.data_root`.
///
/// # Errors
/// Invalid configuration, a missing or unlistable data root, or duplicate
/// collections. All of these abort startup.
pub fn recover(config: &RecoveryConfig) -> Result<Recovered> {
    config.validate()?;
    let started = Instant::now();
    let root = config.data_root.as_path();

    match fs::metadata(root) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if !config.create_data_root {
                let err = CollrecError::DataRootMissing {
                    path: root.to_path_buf(),
                };
                error!(target: "collrec.recovery", path = %root.display(), error = %err, "recovery aborted");
                return Err(err);
            }
            fs::create_dir_all(root)?;
            info!(target: "collrec.recovery", path = %root.display(), "created data root");
        }
        Err(err) => {
            let err = CollrecError::DataRootUnreadable {
                path: root.to_path_buf(),
                source: err,
            };
            error!(target: "collrec.recovery", path = %root.display(), error = %err, "recovery aborted");
            return Err(err);
        }
    }

    let report = scan_with_workers(root, config.worker_threads).inspect_err(|err| {
        error!(target: "collrec.recovery", path = %root.display(), error = %err, "recovery aborted");
    })?;

    for entry in &report.incomplete {
        warn!(
            target: "collrec.recovery",
            path = %entry.path.display(),
            reason = ?entry.reason,
            drop_leftover = entry.reason.is_drop_leftover(),
            "ignoring incomplete collection directory"
        );
    }

    let catalog = rebuild(&report).inspect_err(|err| {
        error!(
            target: "collrec.recovery",
            error = %err,
            suggestion = err.suggestion().unwrap_or(""),
            "recovery aborted"
        );
    })?;

    info!(
        target: "collrec.recovery",
        path = %root.display(),
        valid = report.valid.len(),
        incomplete = report.incomplete.len(),
        unrecognized = report.unrecognized.len(),
        workers = config.worker_threads,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "collection recovery complete"
    );
    Ok(Recovered { catalog, report })
}
