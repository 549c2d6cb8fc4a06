//! Corruption detection suite
//!
//! Damaged trailers and directories must be rejected on open with
//! `MalformedEntry`, never auto-repaired.

use cabin_rs::{Archive, CabinError, DirectoryReader, TRAILER_SIZE};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Helper: Create a valid test archive
fn create_test_archive() -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut archive = Archive::open(temp_file.path()).unwrap();
    archive.write_file("test.txt", b"Hello, World!").unwrap();
    archive.write_file("data.bin", &vec![0xAB; 1024]).unwrap();
    archive.close().unwrap();
    temp_file
}

/// Helper: Overwrite bytes at specific offset
fn overwrite_at(path: &std::path::Path, offset: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
}

/// Helper: Truncate file at specific offset
fn truncate_at(path: &std::path::Path, new_length: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_length).unwrap();
}

fn file_len(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

fn assert_malformed<T>(result: cabin_rs::Result<T>) {
    match result {
        Err(CabinError::MalformedEntry(_)) => {}
        Err(other) => panic!("Expected MalformedEntry, got: {:?}", other),
        Ok(_) => panic!("Expected MalformedEntry, got Ok"),
    }
}

#[test]
fn test_directory_offset_past_trailer() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let trailer_start = file_len(path) - TRAILER_SIZE as u64;

    overwrite_at(path, trailer_start, &u64::MAX.to_be_bytes());

    assert_malformed(DirectoryReader::open(path));
    assert_malformed(Archive::open(path));
}

#[test]
fn test_entry_count_too_large() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let count_at = file_len(path) - 4;

    overwrite_at(path, count_at, &1000u32.to_be_bytes());

    assert_malformed(DirectoryReader::open(path));
}

#[test]
fn test_entry_count_too_small_leaves_trailing_bytes() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let count_at = file_len(path) - 4;

    overwrite_at(path, count_at, &1u32.to_be_bytes());

    assert_malformed(DirectoryReader::open(path));
}

#[test]
fn test_path_length_runs_past_directory() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // First entry starts at the directory offset (13 + 1024); its path length
    // field sits 16 bytes in.
    overwrite_at(path, 1037 + 16, &0xFFFFu16.to_be_bytes());

    assert_malformed(DirectoryReader::open(path));
}

#[test]
fn test_entry_range_outside_data_region() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // Second entry's length field: first entry is 18 + 8 bytes long
    overwrite_at(path, 1037 + 26 + 8, &5000u64.to_be_bytes());

    assert_malformed(DirectoryReader::open(path));
}

#[test]
fn test_truncated_archive() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // Cut into the directory; the last 12 bytes are now payload/directory bytes
    truncate_at(path, 1040);

    let result = DirectoryReader::open(path);
    assert!(result.is_err(), "Truncated archive should fail to open");
}

#[test]
fn test_file_shorter_than_trailer_is_empty() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), b"tiny").unwrap();

    let reader = DirectoryReader::open(temp_file.path()).unwrap();
    assert_eq!(reader.entry_count(), 0);

    let archive = Archive::open(temp_file.path()).unwrap();
    assert_eq!(archive.cursor(), 0);
    drop(archive);

    // Opening never writes
    assert_eq!(std::fs::read(temp_file.path()).unwrap(), b"tiny");
}

#[test]
fn test_failed_open_leaves_file_untouched() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let trailer_start = file_len(path) - TRAILER_SIZE as u64;
    overwrite_at(path, trailer_start, &u64::MAX.to_be_bytes());

    let before = std::fs::read(path).unwrap();
    assert!(Archive::open(path).is_err());
    assert_eq!(std::fs::read(path).unwrap(), before);
}
