use std::path::{Path, PathBuf};

use collrec_types::{
    CollectionDirName, CollectionId, DESCRIPTOR_FILE_NAME, TEMP_DESCRIPTOR_FILE_NAME,
};

/// On-disk layout rooted at the engine's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Live directory allocated for collection `id`.
    #[must_use]
    pub fn collection_dir(&self, id: CollectionId) -> PathBuf {
        self.root.join(CollectionDirName::live(id).to_string())
    }
}

/// `<dir>/parameter.json`.
#[must_use]
pub fn descriptor_path(dir: &Path) -> PathBuf {
    dir.join(DESCRIPTOR_FILE_NAME)
}

/// `<dir>/parameter.json.tmp`.
#[must_use]
pub fn temp_descriptor_path(dir: &Path) -> PathBuf {
    dir.join(TEMP_DESCRIPTOR_FILE_NAME)
}

/// Parse the final path component of `dir` as a collection directory name.
#[must_use]
pub fn parse_dir_name(dir: &Path) -> Option<CollectionDirName> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .and_then(CollectionDirName::parse)
}
