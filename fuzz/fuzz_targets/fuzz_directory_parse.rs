#![no_main]

use libfuzzer_sys::fuzz_target;
use cabin_rs::{Archive, DirectoryReader};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Write fuzz data to temporary file
    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };

    if temp_file.write_all(data).is_err() {
        return;
    }

    if temp_file.flush().is_err() {
        return;
    }

    let path = temp_file.path();

    // Try to load the directory - should never panic
    let mut reader = match DirectoryReader::open(path) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Every listed entry lies inside the file, so reads must succeed
    let files: Vec<String> = reader.list_files().into_iter().cloned().collect();
    for file in &files {
        assert!(reader.read_file(file).is_ok());
    }

    let _ = reader.to_json();
    let _ = reader.contains("");

    // Mapping every entry through a read/write handle must not fault either
    if let Ok(archive) = Archive::open(path) {
        for file in &files {
            if let Ok(view) = archive.direct_read(file) {
                let _ = view.as_slice().iter().fold(0u8, |acc, b| acc ^ b);
            }
        }
    }
});
