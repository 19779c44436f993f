//! Core type definitions shared by the recovery crates.

pub mod descriptor;
pub mod dir_name;
pub mod id;

pub use descriptor::{
    CollectionKind, CollectionProperties, CollectionStatus, DESCRIPTOR_FILE_NAME,
    DESCRIPTOR_VERSION, Descriptor, TEMP_DESCRIPTOR_FILE_NAME, TEMP_SUFFIX,
};
pub use dir_name::{COLLECTION_DIR_PREFIX, CollectionDirName, DELETED_DIR_PREFIX, DirState};
pub use id::CollectionId;
