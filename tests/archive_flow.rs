//! Tests de integración del flujo de archivo
//! tests/archive_flow.rs
//!
//! Escenarios de punta a punta sobre `BatchService`: ZIP completo, falla
//! agregada sin ZIP, y limpieza de temporales en ambos casos.

use batch_server::archive::{self, TempFiles};
use batch_server::batch::BatchError;
use batch_server::error::ServiceError;
use batch_server::files::{FileGenerator, FileKind};
use batch_server::pool::ShutdownReport;
use batch_server::service::{BatchService, ServiceConfig};
use std::fs;
use std::io::{Cursor, Read};
use std::time::Duration;
use tempfile::TempDir;
use zip::ZipArchive;

fn service(dir: &TempDir) -> BatchService {
    BatchService::new(ServiceConfig {
        pool_size: 5,
        batch_timeout: Duration::from_secs(10),
        shutdown_grace: Duration::from_secs(5),
        demo_step: Duration::from_millis(10),
        temp_dir: Some(dir.path().to_path_buf()),
    })
}

fn leftovers(dir: &TempDir) -> usize {
    fs::read_dir(dir.path()).unwrap().count()
}

#[test]
fn test_successful_bundle_has_five_named_entries() {
    let dir = TempDir::new().unwrap();
    let bytes = service(&dir).create_files_and_archive().unwrap();

    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec!["config.json", "data.csv", "log.log", "report.txt", "summary.md"]
    );

    let mut json = String::new();
    zip.by_name("config.json").unwrap().read_to_string(&mut json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["taskId"], 3);

    assert_eq!(leftovers(&dir), 0, "temporary files must be removed");
}

#[test]
fn test_failing_task_aborts_bundle() {
    let dir = TempDir::new().unwrap();
    let err = service(&dir)
        .create_files_with_failure_and_archive()
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("task 2:"), "{}", message);
    assert_eq!(message.matches("task 2:").count(), 1);
    assert!(!message.contains("task 1:"));
    assert_eq!(leftovers(&dir), 0, "successful units' files must be removed too");
}

#[test]
fn test_timed_out_batch_leaves_no_files_once_idle() {
    let dir = TempDir::new().unwrap();
    let service = BatchService::new(ServiceConfig {
        pool_size: 2,
        batch_timeout: Duration::from_micros(50),
        shutdown_grace: Duration::from_secs(5),
        demo_step: Duration::from_millis(10),
        temp_dir: Some(dir.path().to_path_buf()),
    });

    let mut timeouts = 0;
    for _ in 0..50 {
        match service.create_files_and_archive() {
            Err(ServiceError::Batch(BatchError::Timeout { .. })) => timeouts += 1,
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => {}
        }
    }
    assert!(timeouts > 0, "the batch timeout never fired");

    // Espera a que las tareas rezagadas terminen
    assert_eq!(service.shutdown(), ShutdownReport::Graceful);
    assert_eq!(leftovers(&dir), 0, "timed-out batches must not leave files");
}

#[test]
fn test_repeated_requests_are_independent() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    for _ in 0..3 {
        assert!(service.create_files_with_failure_and_archive().is_err());
        assert!(service.create_files_and_archive().is_ok());
    }

    assert_eq!(leftovers(&dir), 0);
}

#[test]
fn test_round_trip_matches_generated_sizes() {
    let dir = TempDir::new().unwrap();
    let generator = FileGenerator::new(dir.path());

    let files: Vec<_> = FileKind::ALL
        .iter()
        .zip(1..)
        .map(|(&kind, id)| generator.produce(kind, id).unwrap())
        .collect();

    let mut guard = TempFiles::new();
    guard.extend(files.iter().map(|f| f.path.clone()));

    let bytes = guard.bundle().unwrap();
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), files.len());

    for file in &files {
        let entry = zip.by_name(&file.name).unwrap();
        assert_eq!(entry.size(), file.size);
        assert!(!file.path.exists());
    }
}

#[test]
fn test_bundle_cleans_even_missing_inputs() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("present.txt");
    fs::write(&present, "x").unwrap();
    let missing = dir.path().join("gone.txt");

    let bytes = archive::bundle(&[present.clone(), missing]).unwrap();
    assert_eq!(ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 1);
    assert!(!present.exists());
}
