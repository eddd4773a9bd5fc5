//! Tests for Keydir
//!
//! These tests verify:
//! - Basic set/get/delete operations
//! - Compare-and-set repointing used by merge
//! - Sorted key listing
//! - Concurrent readers and writers

use caskkv::keydir::{Keydir, KeydirEntry};
use caskkv::segment::{SegmentId, SegmentKind};

// =============================================================================
// Helper Functions
// =============================================================================

fn entry(segment: SegmentId, offset: u64) -> KeydirEntry {
    KeydirEntry::new(segment, 5, offset, 1)
}

fn segment(seq: u64) -> SegmentId {
    SegmentId::new(SegmentKind::Data, seq)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_keydir_is_empty() {
    let keydir = Keydir::new();

    assert!(keydir.is_empty());
    assert_eq!(keydir.len(), 0);
    assert_eq!(keydir.get(b"missing"), None);
}

#[test]
fn test_set_and_get() {
    let keydir = Keydir::new();
    let e = entry(segment(1), 20);

    assert_eq!(keydir.set(b"key".to_vec(), e), None);
    assert_eq!(keydir.get(b"key"), Some(e));
    assert!(keydir.contains_key(b"key"));
}

#[test]
fn test_set_overwrites() {
    let keydir = Keydir::new();
    let old = entry(segment(1), 20);
    let new = entry(segment(2), 40);

    keydir.set(b"key".to_vec(), old);
    assert_eq!(keydir.set(b"key".to_vec(), new), Some(old));
    assert_eq!(keydir.get(b"key"), Some(new));
    assert_eq!(keydir.len(), 1);
}

#[test]
fn test_delete() {
    let keydir = Keydir::new();
    let e = entry(segment(1), 20);
    keydir.set(b"key".to_vec(), e);

    assert_eq!(keydir.delete(b"key"), Some(e));
    assert_eq!(keydir.delete(b"key"), None);
    assert!(!keydir.contains_key(b"key"));
}

#[test]
fn test_keys_are_sorted() {
    let keydir = Keydir::new();
    for key in ["cherry", "apple", "banana"] {
        keydir.set(key.as_bytes().to_vec(), entry(segment(1), 0));
    }

    assert_eq!(
        keydir.keys(),
        vec![b"apple".to_vec(), b"banana".to_vec(), b"cherry".to_vec()]
    );
    assert_eq!(keydir.snapshot()[0].0, b"apple");
}

// =============================================================================
// Repoint Tests
// =============================================================================

#[test]
fn test_repoint_when_unchanged() {
    let keydir = Keydir::new();
    let old = entry(segment(1), 20);
    let moved = entry(SegmentId::new(SegmentKind::Merged, 3), 17);
    keydir.set(b"key".to_vec(), old);

    assert!(keydir.repoint(b"key", &old, moved));
    assert_eq!(keydir.get(b"key"), Some(moved));
}

#[test]
fn test_repoint_loses_to_newer_write() {
    let keydir = Keydir::new();
    let old = entry(segment(1), 20);
    let newer = entry(segment(2), 20);
    let moved = entry(SegmentId::new(SegmentKind::Merged, 3), 17);

    keydir.set(b"key".to_vec(), newer);

    assert!(!keydir.repoint(b"key", &old, moved));
    assert_eq!(keydir.get(b"key"), Some(newer));
}

#[test]
fn test_repoint_loses_to_delete() {
    let keydir = Keydir::new();
    let old = entry(segment(1), 20);
    let moved = entry(SegmentId::new(SegmentKind::Merged, 3), 17);

    assert!(!keydir.repoint(b"key", &old, moved));
    assert!(!keydir.contains_key(b"key"));
}

#[test]
fn test_same_location_ignores_timestamp() {
    let a = KeydirEntry::new(segment(1), 5, 20, 1);
    let mut b = a;
    b.timestamp = 99;

    assert!(a.same_location(&b));
    assert_eq!(a.value_end(), 25);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_and_writer() {
    let keydir = Keydir::new();
    let seg = segment(1);

    crossbeam::scope(|s| {
        s.spawn(|_| {
            for i in 0..1000u64 {
                keydir.set(format!("key{}", i).into_bytes(), entry(seg, i));
            }
        });

        for _ in 0..4 {
            s.spawn(|_| {
                for i in 0..1000u64 {
                    if let Some(e) = keydir.get(format!("key{}", i).as_bytes()) {
                        assert_eq!(e.value_offset, i);
                    }
                }
            });
        }
    })
    .unwrap();

    assert_eq!(keydir.len(), 1000);
}
