//! Descriptor commit and collection drop.
//!
//! Commit protocol: temp write -> fsync temp -> rename -> fsync dir.
//! Drop protocol: record drop in descriptor -> rename to `deleted-<id>` ->
//! remove tree. A crash between any two steps leaves a directory the
//! classifier reports as incomplete.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use collrec_error::{CollrecError, Result};
use collrec_types::Descriptor;
use tracing::{debug, info, warn};

use crate::classify::read_descriptor;
use crate::layout::{DataRoot, descriptor_path, parse_dir_name, temp_descriptor_path};

/// The only component allowed to create or rename descriptor files.
///
/// Safe to use concurrently for different directories. Commits to the same
/// directory must be serialized by the caller.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorWriter {
    sync_directories: bool,
}

impl Default for DescriptorWriter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DescriptorWriter {
    #[must_use]
    pub const fn new(sync_directories: bool) -> Self {
        Self { sync_directories }
    }

    /// Durably replace the descriptor of `dir` with `descriptor`.
    ///
    /// On failure before the rename a partial temp file may remain; the
    /// canonical descriptor is then untouched.
    pub fn commit(&self, dir: &Path, descriptor: &Descriptor) -> Result<()> {
        let bytes = descriptor.encode()?;
        let tmp_path = temp_descriptor_path(dir);
        let final_path = descriptor_path(dir);

        let mut temp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        temp.write_all(&bytes)?;
        temp.sync_all()?;
        drop(temp);

        fs::rename(&tmp_path, &final_path)?;
        if self.sync_directories {
            sync_dir(dir)?;
        }

        info!(
            target: "collrec.writer",
            path = %final_path.display(),
            collection = %descriptor.name,
            cid = %descriptor.id,
            status = ?descriptor.status,
            bytes = bytes.len(),
            "committed collection descriptor"
        );
        Ok(())
    }

    /// Create the directory for a new collection and commit its descriptor.
    pub fn create(&self, root: &DataRoot, descriptor: &Descriptor) -> Result<PathBuf> {
        let dir = root.collection_dir(descriptor.id);
        fs::create_dir(&dir).map_err(|err| {
            if err.kind() == ErrorKind::AlreadyExists {
                CollrecError::CollectionDirExists { path: dir.clone() }
            } else {
                CollrecError::Io(err)
            }
        })?;
        if self.sync_directories {
            sync_dir(root.path())?;
        }
        self.commit(&dir, descriptor)?;
        Ok(dir)
    }

    /// Remove a collection directory.
    ///
    /// Dropping a directory that no longer exists succeeds. A directory
    /// already renamed to `deleted-<id>` is only removed.
    pub fn drop(&self, dir: &Path) -> Result<()> {
        let Some(name) = parse_dir_name(dir) else {
            return Err(CollrecError::InvalidDirectoryName {
                path: dir.to_path_buf(),
            });
        };
        match fs::symlink_metadata(dir) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(target: "collrec.writer", path = %dir.display(), "drop target already gone");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let doomed = if name.is_dropping() {
            dir.to_path_buf()
        } else {
            match read_descriptor(dir) {
                Ok(descriptor) if !descriptor.is_marked_deleted() => {
                    self.commit(dir, &descriptor.marked_deleted())?;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        target: "collrec.writer",
                        path = %dir.display(),
                        error = %err,
                        "dropping collection without a readable descriptor"
                    );
                }
            }

            let parent = parent_dir(dir).ok_or_else(|| CollrecError::InvalidDirectoryName {
                path: dir.to_path_buf(),
            })?;
            let dropping = parent.join(name.as_dropping().to_string());
            // Leftover of an earlier interrupted drop of the same id.
            remove_tree_if_present(&dropping)?;
            fs::rename(dir, &dropping)?;
            if self.sync_directories {
                sync_dir(parent)?;
            }
            dropping
        };

        remove_tree_if_present(&doomed)?;
        info!(
            target: "collrec.writer",
            path = %dir.display(),
            cid = %name.id,
            "dropped collection directory"
        );
        Ok(())
    }
}

/// `remove_dir_all` that treats a missing path as success.
///
/// Returns whether anything was removed.
pub(crate) fn remove_tree_if_present(path: &Path) -> std::io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Directory holding `path`. A bare relative name lives in `.`.
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().map(non_empty_dir)
}

fn non_empty_dir(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(non_empty_dir(dir))?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
