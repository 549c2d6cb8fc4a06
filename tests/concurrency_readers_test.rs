//! Multi-reader tests
//!
//! Read-only loaders and mapped views used from several threads at once.

use cabin_rs::{Archive, DirectoryReader};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use tempfile::NamedTempFile;

/// Helper: Create archive with N files
fn create_archive_with_files(file_count: usize) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut archive = Archive::open(temp_file.path()).unwrap();
    for i in 0..file_count {
        let filename = format!("file{}.txt", i);
        let data = format!("data{}", i);
        archive.write_file(&filename, data.as_bytes()).unwrap();
    }
    archive.close().unwrap();
    temp_file
}

#[test]
fn test_concurrent_directory_readers() {
    let temp_file = create_archive_with_files(100);
    let path = Arc::new(temp_file.path().to_path_buf());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let mut reader = DirectoryReader::open(path.as_path()).unwrap();
                assert_eq!(reader.entry_count(), 100);
                for i in (t..100).step_by(8) {
                    let data = reader.read_file(&format!("file{}.txt", i)).unwrap();
                    assert_eq!(data, format!("data{}", i).as_bytes());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_views_move_across_threads() {
    let temp_file = create_archive_with_files(20);
    let archive = Archive::open(temp_file.path()).unwrap();

    let paths: Vec<String> = (0..20).map(|i| format!("file{}.txt", i)).collect();
    let views = archive.direct_read_batch(&paths).unwrap();
    assert_eq!(views.len(), 20);

    // Views borrow the archive, so they move into scoped threads
    thread::scope(|scope| {
        for (path, mut view) in views {
            scope.spawn(move || {
                let mut data = Vec::new();
                view.read_to_end(&mut data).unwrap();
                let index = path.trim_start_matches("file").trim_end_matches(".txt");
                assert_eq!(data, format!("data{}", index).as_bytes());
            });
        }
    });

    archive.close().unwrap();
}

#[test]
fn test_streaming_readers_are_independent() {
    let temp_file = create_archive_with_files(3);
    let archive = Archive::open(temp_file.path()).unwrap();

    let mut first = archive.open_reader("file0.txt").unwrap();
    let mut second = archive.open_reader("file0.txt").unwrap();

    let mut buf = [0u8; 2];
    first.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"da");

    let mut all = Vec::new();
    second.read_to_end(&mut all).unwrap();
    assert_eq!(all, b"data0");

    let mut rest = Vec::new();
    first.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"ta0");
}
