//! End-to-end sync runs against an in-memory server.
//!
//! Covers fresh uploads, idempotent reruns, changed content, failure
//! containment, downloads and fatal setup errors.

use camino::{Utf8Path, Utf8PathBuf};
use davsync::commands::sync::{run_with, RunOutcome};
use davsync::config::TransferSettings;
use davsync::hash::HashAlgorithm;
use davsync::remote::MemoryConnector;
use davsync::{Config, Operation, SyncError, TransferStatus, TransferSummary};
use std::fs;
use tempfile::TempDir;

fn utf8(path: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("temp paths are UTF-8")
}

fn config_for(operation: Operation, source: &Utf8Path, destination: &Utf8Path, failures: &TempDir) -> Config {
    Config {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        operation,
        settings: TransferSettings {
            host: "https://dav.test".to_string(),
            user: "tester".to_string(),
            password: "secret".to_string(),
        },
        workers: 3,
        failures_dir: failures.path().to_path_buf(),
        show_progress: false,
        ..Config::default()
    }
}

/// `<tmp>/a/f1.txt` and `<tmp>/a/b/f2.txt`
fn sample_tree() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("create source tempdir");
    let root = utf8(temp.path()).join("a");
    fs::create_dir_all(root.join("b")).expect("create nested source dir");
    fs::write(root.join("f1.txt"), b"1").expect("write f1");
    fs::write(root.join("b/f2.txt"), b"2").expect("write f2");
    (temp, root)
}

fn summary_of(outcome: RunOutcome) -> TransferSummary {
    outcome.summary.expect("transfers should have run")
}

fn failure_files(dir: &TempDir) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir.path())
        .expect("read failures dir")
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("davsync-failed-"))
        })
        .collect()
}

#[test]
fn test_fresh_upload_transfers_everything() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();

    let outcome = run_with(
        &config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures),
        &connector,
    )
    .expect("upload should succeed");

    assert!(outcome.failure_file.is_none());
    let summary = summary_of(outcome);
    assert_eq!(summary.count(TransferStatus::Done), 2);
    assert_eq!(summary.count(TransferStatus::Failed), 0);
    assert_eq!(summary.count(TransferStatus::AlreadyExists), 0);
    assert_eq!(summary.total_bytes, 2);

    assert_eq!(connector.read_file("/dst/a/f1.txt"), Some(b"1".to_vec()));
    assert_eq!(connector.read_file("/dst/a/b/f2.txt"), Some(b"2".to_vec()));
    assert!(failure_files(&failures).is_empty());
}

#[test]
fn test_rerun_skips_identical_files() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();
    let config = config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures);

    run_with(&config, &connector).expect("first run");
    let summary = summary_of(run_with(&config, &connector).expect("second run"));

    assert_eq!(summary.count(TransferStatus::AlreadyExists), 2);
    assert_eq!(summary.count(TransferStatus::Done), 0);
    assert_eq!(summary.total_bytes, 0);
}

#[test]
fn test_changed_file_is_transferred_again() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();
    let config = config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures);

    run_with(&config, &connector).expect("first run");
    fs::write(root.join("f1.txt"), b"changed").expect("modify f1");
    let summary = summary_of(run_with(&config, &connector).expect("second run"));

    assert_eq!(summary.count(TransferStatus::Done), 1);
    assert_eq!(summary.count(TransferStatus::AlreadyExists), 1);
    assert_eq!(summary.total_bytes, 7);
    assert_eq!(connector.read_file("/dst/a/f1.txt"), Some(b"changed".to_vec()));
}

#[test]
fn test_blake3_fingerprints_are_honoured() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::with_algorithm(HashAlgorithm::Blake3);
    let config = Config {
        hash: HashAlgorithm::Blake3,
        ..config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures)
    };

    run_with(&config, &connector).expect("first run");
    let summary = summary_of(run_with(&config, &connector).expect("second run"));
    assert_eq!(summary.count(TransferStatus::AlreadyExists), 2);
}

#[test]
fn test_single_failure_is_contained_and_listed() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();
    connector.refuse_dirs_under("/dst/a/b");

    let outcome = run_with(
        &config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures),
        &connector,
    )
    .expect("per-file failures are not fatal");

    let failure_file = outcome.failure_file.clone().expect("failure list written");
    let summary = summary_of(outcome);
    assert_eq!(summary.count(TransferStatus::Failed), 1);
    assert_eq!(summary.count(TransferStatus::Done), 1);
    assert_eq!(summary.total(), 2);

    let listed = fs::read_to_string(&failure_file).expect("read failure list");
    assert_eq!(listed, format!("{}\n", root.join("b/f2.txt")));
    assert_eq!(failure_files(&failures), vec![failure_file]);
    assert_eq!(connector.read_file("/dst/a/f1.txt"), Some(b"1".to_vec()));
}

#[test]
fn test_single_file_source_lands_under_destination() {
    let temp = TempDir::new().unwrap();
    let failures = TempDir::new().unwrap();
    let file = utf8(temp.path()).join("report.pdf");
    fs::write(&file, b"%PDF").unwrap();
    let connector = MemoryConnector::new();

    let summary = summary_of(
        run_with(
            &config_for(Operation::Upload, &file, Utf8Path::new("/docs"), &failures),
            &connector,
        )
        .unwrap(),
    );
    assert_eq!(summary.done, 1);
    assert_eq!(connector.file_paths(), vec!["/docs/report.pdf".to_string()]);
}

#[test]
fn test_every_task_produces_one_result_under_load() {
    let temp = TempDir::new().unwrap();
    let failures = TempDir::new().unwrap();
    let root = utf8(temp.path()).join("many");
    for dir in 0..5 {
        let sub = root.join(format!("d{}", dir));
        fs::create_dir_all(&sub).unwrap();
        for i in 0..60 {
            fs::write(sub.join(format!("f{}.dat", i)), format!("{}-{}", dir, i)).unwrap();
        }
    }
    let connector = MemoryConnector::new();
    let config = Config {
        workers: 8,
        ..config_for(Operation::Upload, &root, Utf8Path::new("/bulk"), &failures)
    };

    let outcome = run_with(&config, &connector).expect("bulk upload");
    let stats = outcome.stats.clone().expect("pool stats");
    let summary = summary_of(outcome);

    assert_eq!(summary.total(), 300);
    assert_eq!(summary.done, 300);
    assert_eq!(stats.dispatched, 300);
    assert_eq!(stats.per_worker_completed.len(), 8);
    assert_eq!(stats.per_worker_completed.iter().sum::<usize>(), 300);
    assert_eq!(connector.file_paths().len(), 300);
    assert_eq!(connector.connections(), 8);
}

#[test]
fn test_download_mirrors_remote_tree() {
    let local = TempDir::new().unwrap();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();
    connector.put_file("/remote/tree/x.txt", b"xx").unwrap();
    connector.put_file("/remote/tree/sub/y.txt", b"yyy").unwrap();
    let destination = utf8(local.path());

    let config = config_for(Operation::Download, Utf8Path::new("/remote/tree"), &destination, &failures);
    let summary = summary_of(run_with(&config, &connector).expect("download"));

    assert_eq!(summary.done, 2);
    assert_eq!(summary.total_bytes, 5);
    assert_eq!(fs::read(destination.join("tree/x.txt")).unwrap(), b"xx");
    assert_eq!(fs::read(destination.join("tree/sub/y.txt")).unwrap(), b"yyy");

    let rerun = summary_of(run_with(&config, &connector).expect("second download"));
    assert_eq!(rerun.count(TransferStatus::AlreadyExists), 2);
}

#[test]
fn test_refused_connection_aborts_before_transfers() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    let connector = MemoryConnector::new();
    connector.refuse_connections(true);

    let err = run_with(
        &config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures),
        &connector,
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::Connection(_)));
    assert!(connector.file_paths().is_empty());
    assert!(failure_files(&failures).is_empty());
}

#[test]
#[cfg(unix)]
fn test_symlink_in_source_aborts_enumeration() {
    let (_src, root) = sample_tree();
    let failures = TempDir::new().unwrap();
    std::os::unix::fs::symlink(root.join("f1.txt"), root.join("link")).unwrap();
    let connector = MemoryConnector::new();

    let err = run_with(
        &config_for(Operation::Upload, &root, Utf8Path::new("/dst"), &failures),
        &connector,
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::UnsupportedFileType { .. }));
    assert_eq!(connector.connections(), 0);
}
