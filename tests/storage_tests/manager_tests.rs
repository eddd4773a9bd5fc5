//! Tests for SegmentManager
//!
//! These tests verify:
//! - Segment discovery on open (and ignoring foreign files)
//! - A fresh active segment per writable open
//! - Rotation of the active segment
//! - Read-only opens never touch the directory
//! - Retiring segments

use std::fs;

use caskkv::segment::{Record, SegmentKind};
use caskkv::storage::SegmentManager;
use caskkv::{CaskError, Config, OpenMode};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage(mode: OpenMode, max_segment_size: u64) -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .mode(mode)
        .max_segment_size(max_segment_size)
        .build();
    (temp_dir, config)
}

fn rw() -> OpenMode {
    OpenMode::READ | OpenMode::WRITE
}

fn record(key: &str, value: &str) -> Record {
    Record::new(key.as_bytes().to_vec(), value.as_bytes().to_vec(), 1)
}

fn file_count(temp: &TempDir) -> usize {
    fs::read_dir(temp.path()).unwrap().count()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_writable_open_creates_active_segment() {
    let (temp, config) = setup_temp_storage(rw(), 1024);

    let storage = SegmentManager::open(&config).unwrap();

    let active = storage.active_segment_id().unwrap();
    assert_eq!(active.kind(), SegmentKind::Data);
    assert_eq!(storage.segment_count(), 1);
    assert_eq!(storage.active_segment_size(), Some(0));
    assert!(active.path_in(temp.path()).exists());
}

#[test]
fn test_read_only_open_creates_nothing() {
    let (temp, config) = setup_temp_storage(OpenMode::READ, 1024);

    let storage = SegmentManager::open(&config).unwrap();

    assert_eq!(storage.active_segment_id(), None);
    assert_eq!(storage.segment_count(), 0);
    assert_eq!(file_count(&temp), 0);
}

#[test]
fn test_read_only_append_fails() {
    let (_temp, config) = setup_temp_storage(OpenMode::READ, 1024);
    let storage = SegmentManager::open(&config).unwrap();

    let err = storage.append(&record("k", "v")).unwrap_err();
    assert!(matches!(err, CaskError::NotWritable));
}

#[test]
fn test_reopen_starts_new_active_segment() {
    let (_temp, config) = setup_temp_storage(rw(), 1024);

    let first = {
        let storage = SegmentManager::open(&config).unwrap();
        storage.append(&record("a", "1")).unwrap();
        storage.active_segment_id().unwrap()
    };

    let storage = SegmentManager::open(&config).unwrap();
    let second = storage.active_segment_id().unwrap();

    assert_ne!(first, second);
    assert!(second.seq() > first.seq());
    assert_eq!(storage.segment_ids(), vec![first, second]);
    assert_eq!(storage.sealed_segment_ids(), vec![first]);
}

#[test]
fn test_writable_open_removes_empty_segments() {
    let (temp, config) = setup_temp_storage(rw(), 1024);

    // Each open leaves an empty active segment behind
    drop(SegmentManager::open(&config).unwrap());
    drop(SegmentManager::open(&config).unwrap());
    assert_eq!(file_count(&temp), 1);

    let storage = SegmentManager::open(&config).unwrap();
    assert_eq!(storage.segment_count(), 1);
}

#[test]
fn test_foreign_files_are_ignored() {
    let (temp, config) = setup_temp_storage(rw(), 1024);
    fs::write(temp.path().join("README.txt"), b"not a segment").unwrap();
    fs::create_dir(temp.path().join("backup")).unwrap();

    let storage = SegmentManager::open(&config).unwrap();

    assert_eq!(storage.segment_count(), 1);
    assert!(temp.path().join("README.txt").exists());
}

#[test]
fn test_open_missing_directory_fails() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path().join("missing"))
        .mode(rw())
        .build();

    assert!(matches!(SegmentManager::open(&config), Err(CaskError::Io(_))));
}

// =============================================================================
// Append / Rotation Tests
// =============================================================================

#[test]
fn test_append_returns_value_location() {
    let (_temp, config) = setup_temp_storage(rw(), 1024);
    let storage = SegmentManager::open(&config).unwrap();

    let first = storage.append(&record("a", "1")).unwrap();
    let second = storage.append(&record("key", "value")).unwrap();

    assert_eq!(first.value_offset, 17);
    assert_eq!(second.value_offset, 18 + 16 + 3);
    assert_eq!(second.value_size, 5);
    assert_eq!(storage.read_value(b"key", &second).unwrap().unwrap(), b"value");
}

#[test]
fn test_rotation_past_threshold() {
    let (_temp, config) = setup_temp_storage(rw(), 50);
    let storage = SegmentManager::open(&config).unwrap();
    let first_active = storage.active_segment_id().unwrap();

    // 26 bytes each: the second append pushes the segment past 50
    storage.append(&record("key1", "value1")).unwrap();
    assert_eq!(storage.active_segment_id(), Some(first_active));
    let entry = storage.append(&record("key2", "value2")).unwrap();

    let new_active = storage.active_segment_id().unwrap();
    assert_ne!(new_active, first_active);
    assert_eq!(entry.segment_id, first_active);
    assert_eq!(storage.segment_count(), 2);
    assert_eq!(storage.active_segment_size(), Some(0));

    // The sealed segment receives no further appends
    let sealed_len = storage.reader(&first_active).unwrap().len().unwrap();
    storage.append(&record("key3", "value3")).unwrap();
    assert_eq!(storage.reader(&first_active).unwrap().len().unwrap(), sealed_len);
}

#[test]
fn test_total_size() {
    let (_temp, config) = setup_temp_storage(rw(), 50);
    let storage = SegmentManager::open(&config).unwrap();

    for i in 0..5 {
        storage.append(&record(&format!("key{}", i), "value")).unwrap();
    }

    assert_eq!(storage.total_size().unwrap(), 5 * 25);
}

// =============================================================================
// Retire Tests
// =============================================================================

#[test]
fn test_retire_deletes_file() {
    let (temp, config) = setup_temp_storage(rw(), 1024);
    let storage = SegmentManager::open(&config).unwrap();
    let id = storage.create_segment(SegmentKind::Merged).unwrap().id();

    assert!(id.path_in(temp.path()).exists());
    storage.retire(&id).unwrap();

    assert!(!id.path_in(temp.path()).exists());
    assert!(storage.reader(&id).is_none());
}

#[test]
fn test_read_value_after_retire_is_none() {
    let (_temp, config) = setup_temp_storage(rw(), 20);
    let storage = SegmentManager::open(&config).unwrap();
    let entry = storage.append(&record("key", "value")).unwrap();

    // 24 bytes > 20, so the segment was sealed and can be retired
    assert_ne!(storage.active_segment_id(), Some(entry.segment_id));
    storage.retire(&entry.segment_id).unwrap();

    assert_eq!(storage.read_value(b"key", &entry).unwrap(), None);
}

#[test]
fn test_retire_unknown_segment_fails() {
    let (_temp, config) = setup_temp_storage(rw(), 1024);
    let storage = SegmentManager::open(&config).unwrap();

    let unknown = caskkv::segment::SegmentId::new(SegmentKind::Data, 999);
    assert!(matches!(storage.retire(&unknown), Err(CaskError::Storage(_))));
}
