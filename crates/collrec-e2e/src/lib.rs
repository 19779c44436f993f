//! Fixtures for end-to-end recovery tests.
//!
//! [`leave_residue`] reproduces, step by step, what the create and drop
//! protocols leave on disk when the process dies between two steps. Tests
//! run these inside a subprocess that then aborts, so nothing is tidied up
//! by destructors before the parent recovers.

use std::fs;
use std::path::PathBuf;

use collrec_core::{DataRoot, DescriptorWriter, descriptor_path, temp_descriptor_path};
use collrec_error::Result;
use collrec_types::{CollectionDirName, CollectionId, Descriptor};
use tracing::debug;

/// The step a create or drop was interrupted after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Create: directory made, nothing written yet.
    DirectoryOnly,
    /// Create: temp descriptor written, rename not reached.
    TempDescriptorOnly,
    /// Create: canonical descriptor created but never filled. Carries a
    /// stray data file next to it.
    EmptyDescriptor,
    /// Drop: descriptor rewritten with the drop flag, rename not reached.
    MarkedDeleted,
    /// Drop: renamed to `deleted-<id>`, tree removal not reached.
    RenamedForDrop,
}

impl CrashPoint {
    pub const ALL: [Self; 5] = [
        Self::DirectoryOnly,
        Self::TempDescriptorOnly,
        Self::EmptyDescriptor,
        Self::MarkedDeleted,
        Self::RenamedForDrop,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DirectoryOnly => "directory_only",
            Self::TempDescriptorOnly => "temp_descriptor_only",
            Self::EmptyDescriptor => "empty_descriptor",
            Self::MarkedDeleted => "marked_deleted",
            Self::RenamedForDrop => "renamed_for_drop",
        }
    }
}

/// Leave the on-disk state of collection `name`/`id` as it would be after a
/// crash at `point`. Returns the directory that remains.
pub fn leave_residue(
    root: &DataRoot,
    name: &str,
    id: CollectionId,
    point: CrashPoint,
) -> Result<PathBuf> {
    let writer = DescriptorWriter::new(false);
    let dir = root.collection_dir(id);
    let descriptor = Descriptor::new(name, id);

    let remaining = match point {
        CrashPoint::DirectoryOnly => {
            fs::create_dir(&dir)?;
            dir
        }
        CrashPoint::TempDescriptorOnly => {
            fs::create_dir(&dir)?;
            fs::write(temp_descriptor_path(&dir), descriptor.encode()?)?;
            dir
        }
        CrashPoint::EmptyDescriptor => {
            fs::create_dir(&dir)?;
            fs::write(descriptor_path(&dir), b"")?;
            fs::write(dir.join("foobar"), b"foobar")?;
            dir
        }
        CrashPoint::MarkedDeleted => {
            writer.create(root, &descriptor)?;
            writer.commit(&dir, &descriptor.marked_deleted())?;
            dir
        }
        CrashPoint::RenamedForDrop => {
            writer.create(root, &descriptor)?;
            writer.commit(&dir, &descriptor.marked_deleted())?;
            let dropping = root
                .path()
                .join(CollectionDirName::live(id).as_dropping().to_string());
            fs::rename(&dir, &dropping)?;
            dropping
        }
    };
    debug!(
        target: "collrec.e2e",
        collection = name,
        cid = %id,
        point = point.label(),
        path = %remaining.display(),
        "left crash residue"
    );
    Ok(remaining)
}

/// Create fully committed collections named `names`, with ids starting at
/// `first_id`.
pub fn seed_collections(root: &DataRoot, names: &[&str], first_id: u64) -> Result<Vec<PathBuf>> {
    let writer = DescriptorWriter::new(false);
    names
        .iter()
        .zip(first_id..)
        .map(|(name, id)| writer.create(root, &Descriptor::new(*name, CollectionId::new(id))))
        .collect()
}
