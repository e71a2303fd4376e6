//! Integration tests for scrivener-store
//!
//! These tests exercise the on-disk cache layout, fingerprinting of real files and
//! the degraded "always miss" mode.

use proptest::prelude::*;
use scrivener_domain::traits::TextCache;
use scrivener_store::{fingerprint_bytes, fingerprint_file, write_atomic, CacheError, FileCache};
use std::fs;
use std::sync::Arc;
use std::thread;

fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_put_then_get() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"%PDF-1.7 agreement").unwrap();

    assert_eq!(cache.get(&fp).unwrap(), None);
    cache.put(&fp, "MUTUAL NON-DISCLOSURE AGREEMENT\n").unwrap();
    assert_eq!(
        cache.get(&fp).unwrap().as_deref(),
        Some("MUTUAL NON-DISCLOSURE AGREEMENT\n")
    );
}

#[test]
fn test_entry_is_named_by_fingerprint() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"bytes").unwrap();
    cache.put(&fp, "text").unwrap();

    let expected = dir.path().join(format!("{}.txt", fp.as_str()));
    assert_eq!(fs::read_to_string(expected).unwrap(), "text");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1, "No temp files left behind");
}

#[test]
fn test_put_does_not_overwrite() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"bytes").unwrap();

    cache.put(&fp, "first").unwrap();
    cache.put(&fp, "second").unwrap();
    assert_eq!(cache.get(&fp).unwrap().as_deref(), Some("first"));
}

#[test]
fn test_empty_text_is_a_hit() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"blank scan").unwrap();

    cache.put(&fp, "").unwrap();
    assert_eq!(cache.get(&fp).unwrap().as_deref(), Some(""));
}

#[test]
fn test_open_creates_nested_directory() {
    let dir = temp_dir();
    let nested = dir.path().join("a").join("b");
    let cache = FileCache::open(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(cache.dir(), Some(nested.as_path()));
}

#[test]
fn test_unusable_directory_degrades_to_disabled() {
    let dir = temp_dir();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let cache = FileCache::open_or_disabled(blocker.join("cache"));
    assert!(!cache.is_enabled());

    let fp = fingerprint_bytes(b"doc").unwrap();
    cache.put(&fp, "text").unwrap();
    assert_eq!(cache.get(&fp).unwrap(), None);
}

#[test]
fn test_non_utf8_entry_is_corrupt() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"doc").unwrap();
    fs::write(cache.entry_path(&fp).unwrap(), [0xff, 0xfe, 0x00]).unwrap();

    assert!(matches!(cache.get(&fp), Err(CacheError::Corrupt(_))));
}

#[test]
fn test_put_repairs_corrupt_entry() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path()).unwrap();
    let fp = fingerprint_bytes(b"doc").unwrap();
    fs::write(cache.entry_path(&fp).unwrap(), [0xff, 0xfe, 0x00]).unwrap();

    cache.put(&fp, "fresh text").unwrap();
    assert_eq!(cache.get(&fp).unwrap().as_deref(), Some("fresh text"));
}

#[test]
fn test_documents_differing_in_middle_byte_get_distinct_entries() {
    let dir = temp_dir();
    let cache = FileCache::open(dir.path().join("cache")).unwrap();

    let size = 10 * 1024 * 1024;
    let first = vec![0x41u8; size];
    let mut second = first.clone();
    second[5_000_000] = 0x42;

    let first_path = dir.path().join("first.pdf");
    let second_path = dir.path().join("second.pdf");
    fs::write(&first_path, &first).unwrap();
    fs::write(&second_path, &second).unwrap();

    let fp_first = fingerprint_file(&first_path).unwrap();
    let fp_second = fingerprint_file(&second_path).unwrap();
    assert_ne!(fp_first, fp_second);

    cache.put(&fp_first, "first text").unwrap();
    cache.put(&fp_second, "second text").unwrap();
    assert_eq!(cache.get(&fp_first).unwrap().as_deref(), Some("first text"));
    assert_eq!(cache.get(&fp_second).unwrap().as_deref(), Some("second text"));
}

#[test]
fn test_fingerprint_file_matches_bytes() {
    let dir = temp_dir();
    let path = dir.path().join("doc.pdf");
    fs::write(&path, b"contents").unwrap();

    assert_eq!(
        fingerprint_file(&path).unwrap(),
        fingerprint_bytes(b"contents").unwrap()
    );
}

#[test]
fn test_fingerprint_missing_file_names_path() {
    let dir = temp_dir();
    let err = fingerprint_file(&dir.path().join("missing.pdf")).unwrap_err();
    assert!(err.to_string().contains("missing.pdf"));
}

#[test]
fn test_concurrent_writers_same_fingerprint() {
    let dir = temp_dir();
    let cache = Arc::new(FileCache::open(dir.path()).unwrap());
    let fp = fingerprint_bytes(b"shared document").unwrap();
    let text = "identical extracted text ".repeat(10_000);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let fp = fp.clone();
            let text = text.clone();
            thread::spawn(move || {
                cache.put(&fp, &text).unwrap();
                // Any observed entry must be complete
                if let Some(seen) = cache.get(&fp).unwrap() {
                    assert_eq!(seen.len(), text.len());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.get(&fp).unwrap().as_deref(), Some(text.as_str()));
}

#[test]
fn test_write_atomic_replaces_existing_file() {
    let dir = temp_dir();
    let path = dir.path().join("out.json");
    write_atomic(&path, b"old").unwrap();
    write_atomic(&path, b"new").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"new");
}

proptest! {
    #[test]
    fn test_any_text_round_trips(text in ".*") {
        let dir = temp_dir();
        let cache = FileCache::open(dir.path()).unwrap();
        let fp = fingerprint_bytes(text.as_bytes()).unwrap();
        cache.put(&fp, &text).unwrap();
        prop_assert_eq!(cache.get(&fp).unwrap(), Some(text));
    }

    #[test]
    fn test_single_byte_change_changes_fingerprint(
        data in proptest::collection::vec(any::<u8>(), 1..4096),
        index in any::<prop::sample::Index>(),
        delta in 1u8..=255,
    ) {
        let mut changed = data.clone();
        let i = index.index(changed.len());
        changed[i] = changed[i].wrapping_add(delta);
        prop_assert_ne!(fingerprint_bytes(&data).unwrap(), fingerprint_bytes(&changed).unwrap());
    }
}
