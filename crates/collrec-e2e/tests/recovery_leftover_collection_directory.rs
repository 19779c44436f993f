//! Recovery after a crash that leaves partially created and partially
//! dropped collection directories behind.
//!
//! The crash is simulated with `std::process::abort()` in a subprocess so no
//! cleanup runs before the parent process recovers the data root.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use collrec_core::{
    DataRoot, DescriptorWriter, IncompleteReason, RecoveryConfig, purge_incomplete, recover,
};
use collrec_e2e::{CrashPoint, leave_residue, seed_collections};
use collrec_error::CollrecError;
use collrec_types::CollectionId;
use tempfile::tempdir;

const HELPER_MODE_ENV: &str = "COLLREC_CRASH_HELPER_MODE";
const HELPER_ROOT_ENV: &str = "COLLREC_CRASH_HELPER_ROOT";
const HELPER_TEST_NAME: &str = "crash_helper_entrypoint";

const SURVIVOR: &str = "test";
const SURVIVOR_ID: u64 = 1;
const LEFTOVERS: u64 = 10;

fn leftover_name(i: u64) -> String {
    format!("leftover_{i}")
}

fn leftover_id(i: u64) -> CollectionId {
    CollectionId::new(100 + i)
}

fn spawn_crash_helper(mode: &str, root: &Path) {
    let helper_status = Command::new(env::current_exe().expect("current_exe"))
        .arg("--exact")
        .arg(HELPER_TEST_NAME)
        .arg("--ignored")
        .arg("--nocapture")
        .env(HELPER_MODE_ENV, mode)
        .env(HELPER_ROOT_ENV, root.as_os_str())
        .status()
        .expect("spawn crash helper");

    assert!(
        !helper_status.success(),
        "helper should abort for mode={mode}"
    );
}

fn recover_root(root: &Path) -> collrec_core::Recovered {
    recover(&RecoveryConfig::new(root).with_worker_threads(4)).expect("recover data root")
}

/// One committed collection, then ten creates that die halfway: five with
/// only a temp descriptor, five with an empty descriptor and a stray file.
fn helper_mode_leftovers(root: &Path) -> ! {
    let data_root = DataRoot::new(root);
    seed_collections(&data_root, &[SURVIVOR], SURVIVOR_ID).expect("seed survivor");
    for i in 0..LEFTOVERS {
        let point = if i < LEFTOVERS / 2 {
            CrashPoint::TempDescriptorOnly
        } else {
            CrashPoint::EmptyDescriptor
        };
        leave_residue(&data_root, &leftover_name(i), leftover_id(i), point)
            .expect("leave residue");
    }
    fs::create_dir(root.join("journals")).expect("unrelated dir");
    std::process::abort();
}

/// Drops interrupted at both intermediate steps, next to a clean drop.
fn helper_mode_drops(root: &Path) -> ! {
    let data_root = DataRoot::new(root);
    let dirs = seed_collections(&data_root, &[SURVIVOR, "dropped"], SURVIVOR_ID)
        .expect("seed collections");
    DescriptorWriter::default()
        .drop(&dirs[1])
        .expect("complete drop");
    leave_residue(
        &data_root,
        "marked",
        CollectionId::new(20),
        CrashPoint::MarkedDeleted,
    )
    .expect("marked residue");
    leave_residue(
        &data_root,
        "renamed",
        CollectionId::new(21),
        CrashPoint::RenamedForDrop,
    )
    .expect("renamed residue");
    std::process::abort();
}

#[test]
fn leftover_directories_are_not_recovered() {
    let dir = tempdir().expect("tempdir");
    spawn_crash_helper("leftovers", dir.path());

    let recovered = recover_root(dir.path());
    let catalog = &recovered.catalog;

    for i in 0..LEFTOVERS {
        assert!(
            catalog.lookup(&leftover_name(i)).is_none(),
            "{} must not survive recovery",
            leftover_name(i)
        );
        assert!(catalog.lookup_id(leftover_id(i)).is_none());
    }
    assert_eq!(catalog.list(), vec![SURVIVOR.to_owned()]);

    let survivor = catalog.lookup(SURVIVOR).expect("survivor recovered");
    assert_eq!(survivor.name(), SURVIVOR);
    assert_eq!(survivor.id(), CollectionId::new(SURVIVOR_ID));
    assert_eq!(survivor.path(), dir.path().join("collection-1"));

    let report = &recovered.report;
    assert_eq!(report.incomplete.len(), LEFTOVERS as usize);
    let temp_only = report
        .incomplete
        .iter()
        .filter(|e| e.reason == IncompleteReason::MissingDescriptor { temp_present: true })
        .count();
    let empty = report
        .incomplete
        .iter()
        .filter(|e| e.reason == IncompleteReason::EmptyDescriptor)
        .count();
    assert_eq!((temp_only, empty), (5, 5));
    assert_eq!(report.unrecognized, vec![dir.path().join("journals")]);
}

#[test]
fn leftover_directories_stay_on_disk_until_purged() {
    let dir = tempdir().expect("tempdir");
    spawn_crash_helper("leftovers", dir.path());

    let first = recover_root(dir.path());
    for entry in &first.report.incomplete {
        assert!(entry.path.exists(), "recovery must not delete {}", entry.path.display());
    }

    let cleanup = purge_incomplete(&first.report);
    assert!(cleanup.is_complete());
    assert_eq!(cleanup.removed.len(), LEFTOVERS as usize);
    assert!(dir.path().join("journals").is_dir());

    let second = recover_root(dir.path());
    assert!(second.report.incomplete.is_empty());
    assert_eq!(second.catalog.list(), first.catalog.list());
}

#[test]
fn interrupted_drops_are_not_resurrected() {
    let dir = tempdir().expect("tempdir");
    spawn_crash_helper("drops", dir.path());

    let recovered = recover_root(dir.path());
    assert_eq!(recovered.catalog.list(), vec![SURVIVOR.to_owned()]);
    for gone in ["dropped", "marked", "renamed"] {
        assert!(recovered.catalog.lookup(gone).is_none(), "{gone} resurrected");
    }

    let mut reasons: Vec<(PathBuf, IncompleteReason)> = recovered
        .report
        .incomplete
        .iter()
        .map(|e| (e.path.clone(), e.reason.clone()))
        .collect();
    reasons.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        reasons,
        vec![
            (dir.path().join("collection-20"), IncompleteReason::MarkedDeleted),
            (dir.path().join("deleted-21"), IncompleteReason::DropInProgress),
        ]
    );
    assert!(reasons.iter().all(|(_, reason)| reason.is_drop_leftover()));

    // Finishing the drop on a leftover is idempotent.
    let writer = DescriptorWriter::default();
    writer.drop(&dir.path().join("deleted-21")).expect("finish drop");
    writer.drop(&dir.path().join("deleted-21")).expect("finish drop again");
    assert!(!dir.path().join("deleted-21").exists());
}

#[test]
fn duplicate_names_abort_recovery_without_touching_disk() {
    let dir = tempdir().expect("tempdir");
    let root = DataRoot::new(dir.path());
    let dirs = seed_collections(&root, &["twin", "twin"], 5).expect("seed");

    let err = recover(&RecoveryConfig::new(dir.path())).expect_err("duplicates are fatal");
    match err {
        CollrecError::DuplicateCollectionName { name, first, second } => {
            assert_eq!(name, "twin");
            assert_eq!(vec![first, second], dirs);
        }
        other => panic!("expected duplicate name, got {other:?}"),
    }
    assert!(dirs.iter().all(|d| d.is_dir()));
}

#[test]
fn unrelated_entries_do_not_affect_recovery() {
    let dir = tempdir().expect("tempdir");
    let root = DataRoot::new(dir.path());
    seed_collections(&root, &["only"], 9).expect("seed");
    fs::create_dir(dir.path().join("collection-")).expect("bare prefix");
    fs::create_dir(dir.path().join("lost+found")).expect("lost+found");
    fs::write(dir.path().join("collection-77"), b"a file, not a dir").expect("file");
    fs::write(dir.path().join("ENGINE"), b"storage-engine").expect("engine file");

    let recovered = recover_root(dir.path());
    assert_eq!(recovered.catalog.list(), vec!["only".to_owned()]);
    assert!(recovered.report.incomplete.is_empty());
    assert_eq!(recovered.report.unrecognized.len(), 2);
}

#[test]
#[ignore = "invoked via subprocess by crash recovery tests"]
fn crash_helper_entrypoint() {
    let Some(mode) = env::var_os(HELPER_MODE_ENV) else {
        return;
    };
    let Some(root) = env::var_os(HELPER_ROOT_ENV) else {
        return;
    };
    let root = PathBuf::from(root);

    match mode.to_string_lossy().as_ref() {
        "leftovers" => helper_mode_leftovers(&root),
        "drops" => helper_mode_drops(&root),
        other => panic!("unknown crash helper mode: {other}"),
    }
}
