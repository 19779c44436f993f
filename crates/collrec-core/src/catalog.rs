//! In-memory collection catalog rebuilt from a scan.
//!
//! Only `Valid` directories produce entries. A name whose only trace on disk
//! is an incomplete directory looks exactly like a name that never existed.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use collrec_error::{CollrecError, Result};
use collrec_types::{CollectionId, Descriptor};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::scan::ScanReport;

#[derive(Debug)]
struct CollectionInner {
    descriptor: Descriptor,
    path: PathBuf,
}

/// Open handle to a recovered collection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    inner: Arc<CollectionInner>,
}

impl CollectionHandle {
    fn new(descriptor: Descriptor, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(CollectionInner { descriptor, path }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.descriptor.name
    }

    #[must_use]
    pub fn id(&self) -> CollectionId {
        self.inner.descriptor.id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    #[must_use]
    pub fn descriptor(&self) -> &Descriptor {
        &self.inner.descriptor
    }

    /// Whether both handles refer to the same catalog entry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug, Default)]
struct Entries {
    by_name: BTreeMap<String, CollectionHandle>,
    by_id: HashMap<CollectionId, String>,
}

/// Logical name -> open collection.
///
/// Built once by [`rebuild`] and handed to the serving layer. Reads take a
/// shared lock; only [`Catalog::remove`] writes after startup.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<Entries>,
}

impl Catalog {
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<CollectionHandle> {
        self.entries.read().by_name.get(name).cloned()
    }

    #[must_use]
    pub fn lookup_id(&self, id: CollectionId) -> Option<CollectionHandle> {
        let entries = self.entries.read();
        entries
            .by_id
            .get(&id)
            .and_then(|name| entries.by_name.get(name))
            .cloned()
    }

    /// All collection names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.entries.read().by_name.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the entry for `name` (explicit drop). Existing handles stay
    /// usable until released.
    pub fn remove(&self, name: &str) -> Option<CollectionHandle> {
        let mut entries = self.entries.write();
        let removed = entries.by_name.remove(name)?;
        entries.by_id.remove(&removed.id());
        debug!(target: "collrec.catalog", collection = %name, cid = %removed.id(), "catalog entry removed");
        Some(removed)
    }
}

/// Build a catalog from the `valid` set of a scan.
///
/// # Errors
/// [`CollrecError::DuplicateCollectionName`] or
/// [`CollrecError::DuplicateCollectionId`] when two valid directories claim
/// the same collection. Neither one is kept.
pub fn rebuild(report: &ScanReport) -> Result<Catalog> {
    let mut entries = Entries::default();

    for entry in &report.valid {
        let descriptor = &entry.descriptor;
        if let Some(existing) = entries.by_name.get(&descriptor.name) {
            return Err(CollrecError::DuplicateCollectionName {
                name: descriptor.name.clone(),
                first: existing.path().to_path_buf(),
                second: entry.path.clone(),
            });
        }
        if let Some(existing) = entries
            .by_id
            .get(&descriptor.id)
            .and_then(|name| entries.by_name.get(name))
        {
            return Err(CollrecError::DuplicateCollectionId {
                id: descriptor.id.get(),
                first: existing.path().to_path_buf(),
                second: entry.path.clone(),
            });
        }

        entries.by_id.insert(descriptor.id, descriptor.name.clone());
        entries.by_name.insert(
            descriptor.name.clone(),
            CollectionHandle::new(descriptor.clone(), entry.path.clone()),
        );
    }

    info!(
        target: "collrec.catalog",
        collections = entries.by_name.len(),
        "catalog rebuilt"
    );
    Ok(Catalog {
        entries: RwLock::new(entries),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::IncompleteReason;
    use crate::scan::{IncompleteEntry, ValidEntry};

    fn valid(dir: &str, name: &str, id: u64) -> ValidEntry {
        ValidEntry {
            dir_name: dir.to_owned(),
            path: PathBuf::from("/data").join(dir),
            descriptor: Descriptor::new(name, CollectionId::new(id)),
        }
    }

    #[test]
    fn keyed_by_logical_name_not_directory() {
        let report = ScanReport {
            valid: vec![valid("collection-10", "users", 10)],
            ..ScanReport::default()
        };
        let catalog = rebuild(&report).unwrap();
        assert!(catalog.lookup("collection-10").is_none());
        let handle = catalog.lookup("users").unwrap();
        assert_eq!(handle.id(), CollectionId::new(10));
        assert_eq!(handle.path(), Path::new("/data/collection-10"));
        assert!(handle.ptr_eq(&catalog.lookup_id(CollectionId::new(10)).unwrap()));
    }

    #[test]
    fn incomplete_and_unrecognized_are_absent() {
        let report = ScanReport {
            valid: vec![valid("collection-1", "kept", 1)],
            incomplete: vec![IncompleteEntry {
                path: PathBuf::from("/data/collection-2"),
                reason: IncompleteReason::MissingDescriptor { temp_present: true },
            }],
            unrecognized: vec![PathBuf::from("/data/journals")],
        };
        let catalog = rebuild(&report).unwrap();
        assert_eq!(catalog.list(), vec!["kept".to_owned()]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup_id(CollectionId::new(2)).is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let report = ScanReport {
            valid: vec![valid("collection-1", "dup", 1), valid("collection-2", "dup", 2)],
            ..ScanReport::default()
        };
        let err = rebuild(&report).unwrap_err();
        match err {
            CollrecError::DuplicateCollectionName {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "dup");
                assert_eq!(first, PathBuf::from("/data/collection-1"));
                assert_eq!(second, PathBuf::from("/data/collection-2"));
            }
            other => panic!("expected duplicate name, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let report = ScanReport {
            valid: vec![valid("collection-3", "a", 3), valid("collection-3-b", "b", 3)],
            ..ScanReport::default()
        };
        assert!(matches!(
            rebuild(&report),
            Err(CollrecError::DuplicateCollectionId { id: 3, .. })
        ));
    }

    #[test]
    fn list_is_sorted() {
        let report = ScanReport {
            valid: vec![
                valid("collection-1", "zeta", 1),
                valid("collection-2", "alpha", 2),
                valid("collection-3", "mid", 3),
            ],
            ..ScanReport::default()
        };
        let catalog = rebuild(&report).unwrap();
        assert_eq!(catalog.list(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn remove_drops_entry_but_not_outstanding_handles() {
        let report = ScanReport {
            valid: vec![valid("collection-4", "temp", 4)],
            ..ScanReport::default()
        };
        let catalog = rebuild(&report).unwrap();
        let handle = catalog.lookup("temp").unwrap();

        let removed = catalog.remove("temp").unwrap();
        assert!(removed.ptr_eq(&handle));
        assert!(catalog.lookup("temp").is_none());
        assert!(catalog.lookup_id(CollectionId::new(4)).is_none());
        assert!(catalog.is_empty());
        assert!(catalog.remove("temp").is_none());
        assert_eq!(handle.name(), "temp");
    }

    #[test]
    fn catalog_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();
        assert_send_sync::<CollectionHandle>();
    }
}
