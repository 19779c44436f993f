//! Collection-directory recovery.
//!
//! At startup the engine walks its data root, classifies every collection
//! directory by the durability state of its descriptor, and rebuilds the
//! in-memory catalog from the directories whose descriptor was fully
//! committed. Directories left behind by a crash mid-create or mid-drop are
//! excluded and reported for lazy cleanup.
//!
//! Flow: [`DescriptorWriter`] commit discipline -> [`classify`] per
//! directory -> [`scan`] over the root -> [`rebuild`] into a [`Catalog`].
//! [`recover`] runs the whole startup sequence.

pub mod catalog;
pub mod classify;
pub mod cleanup;
pub mod config;
pub mod layout;
pub mod recovery;
pub mod scan;
pub mod writer;

pub use catalog::{Catalog, CollectionHandle, rebuild};
pub use classify::{Classification, IncompleteReason, classify, read_descriptor};
pub use cleanup::{CleanupReport, purge_incomplete};
pub use config::RecoveryConfig;
pub use layout::{DataRoot, descriptor_path, temp_descriptor_path};
pub use recovery::{Recovered, recover};
pub use scan::{IncompleteEntry, ScanReport, ValidEntry, scan, scan_with_workers};
pub use writer::DescriptorWriter;
