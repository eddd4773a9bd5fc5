//! Tests for SegmentWriter
//!
//! These tests verify:
//! - Appending records and tracking the segment size
//! - Rotation threshold
//! - Refusing to overwrite an existing segment
//! - Sync on append

use std::fs;

use caskkv::segment::{Record, SegmentId, SegmentKind, SegmentReader, SegmentWriter, HEADER_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_writer(sync: bool) -> (TempDir, SegmentWriter) {
    let temp_dir = TempDir::new().unwrap();
    let id = SegmentId::new(SegmentKind::Data, 1);
    let writer = SegmentWriter::create(temp_dir.path(), id, sync).unwrap();
    (temp_dir, writer)
}

fn record(key: &str, value: &str) -> Record {
    Record::new(key.as_bytes().to_vec(), value.as_bytes().to_vec(), 1)
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_create_makes_empty_file() {
    let (temp, writer) = setup_temp_writer(false);
    let path = writer.id().path_in(temp.path());

    assert!(path.exists());
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    assert_eq!(writer.size(), 0);
}

#[test]
fn test_append_returns_bytes_written() {
    let (_temp, mut writer) = setup_temp_writer(false);

    let written = writer.append(&record("key", "value")).unwrap();

    assert_eq!(written, (HEADER_SIZE + 3 + 5) as u64);
    assert_eq!(writer.size(), written);
}

#[test]
fn test_size_matches_file_length() {
    let (temp, mut writer) = setup_temp_writer(false);

    for i in 0..10 {
        writer
            .append(&record(&format!("k{}", i), &format!("v{}", i)))
            .unwrap();
    }

    let on_disk = fs::metadata(writer.id().path_in(temp.path())).unwrap().len();
    assert_eq!(writer.size(), on_disk);
}

#[test]
fn test_appended_record_is_immediately_readable() {
    let (temp, mut writer) = setup_temp_writer(false);
    let reader = SegmentReader::open(temp.path(), writer.id()).unwrap();

    writer.append(&record("first", "1")).unwrap();
    let offset = writer.size();
    writer.append(&record("second", "22")).unwrap();

    let value_offset = offset + (HEADER_SIZE + "second".len()) as u64;
    assert_eq!(reader.read_value(b"second", value_offset, 2).unwrap(), b"22");
}

#[test]
fn test_sync_on_append() {
    let (temp, mut writer) = setup_temp_writer(true);

    writer.append(&record("durable", "yes")).unwrap();

    let reader = SegmentReader::open(temp.path(), writer.id()).unwrap();
    assert_eq!(reader.len().unwrap(), writer.size());
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_should_rotate_only_past_threshold() {
    let (_temp, mut writer) = setup_temp_writer(false);
    let rec = record("key", "value");
    let len = rec.encoded_len() as u64;

    writer.append(&rec).unwrap();

    assert!(!writer.should_rotate(len));
    assert!(writer.should_rotate(len - 1));
}

#[test]
fn test_finish_returns_final_size() {
    let (_temp, mut writer) = setup_temp_writer(false);
    writer.append(&record("a", "1")).unwrap();
    let size = writer.size();

    assert_eq!(writer.finish().unwrap(), size);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_create_refuses_existing_file() {
    let (temp, writer) = setup_temp_writer(false);

    let result = SegmentWriter::create(temp.path(), writer.id(), false);
    assert!(result.is_err());
}
