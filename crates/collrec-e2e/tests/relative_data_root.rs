//! Create and drop through paths relative to the working directory.
//!
//! Changes the process working directory, so this binary holds a single
//! test.

use std::env;
use std::path::Path;

use collrec_core::{DataRoot, DescriptorWriter, RecoveryConfig, recover};
use collrec_types::{CollectionId, Descriptor};
use tempfile::tempdir;

#[test]
fn create_and_drop_with_relative_paths() {
    let dir = tempdir().expect("tempdir");
    env::set_current_dir(dir.path()).expect("enter data root");

    let writer = DescriptorWriter::default();
    for (root, id) in [(DataRoot::new("."), 3), (DataRoot::new(""), 4)] {
        let created = writer
            .create(&root, &Descriptor::new(format!("rel_{id}"), CollectionId::new(id)))
            .expect("create in relative root");
        assert!(created.is_dir());
    }

    writer
        .drop(Path::new("collection-3"))
        .expect("drop bare relative name");
    assert!(!dir.path().join("collection-3").exists());
    assert!(!dir.path().join("deleted-3").exists());

    let recovered = recover(&RecoveryConfig::new(dir.path())).expect("recover");
    assert_eq!(recovered.catalog.list(), vec!["rel_4".to_owned()]);
    assert!(recovered.report.is_clean());
}
