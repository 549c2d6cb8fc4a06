//! Cabin-rs: single-file archive of named byte streams
//!
//! A cabin archive packs many files into one OS file:
//! - Append-only data region holding every payload ever written
//! - Directory of live entries (offset, length, path), written on close
//! - Fixed 12-byte trailer locating the directory
//!
//! Entries can be written by streaming (length discovered on close) or by
//! pre-sized memory-mapped views, and read back either way. Overwritten and
//! deleted entries leave dead space that is never reclaimed.
//!
//! # Example
//!
//! ```no_run
//! use cabin_rs::Archive;
//! use std::io::Write;
//!
//! let mut archive = Archive::open("example.cabin")?;
//! archive.write_file("hello.txt", b"Hello, World!")?;
//!
//! let mut view = archive.direct_write("fixed.bin", 4)?;
//! view.write_all(&[1, 2, 3, 4])?;
//! view.release()?;
//!
//! archive.close()?;
//!
//! let archive = Archive::open("example.cabin")?;
//! assert_eq!(archive.direct_read("hello.txt")?.as_slice(), b"Hello, World!");
//! # Ok::<(), cabin_rs::error::CabinError>(())
//! ```

pub mod archive;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use archive::{
    AllocationCursor, Archive, ArchiveIndex, DirectoryEntry, DirectoryReader, EntryReader,
    EntryWriter, MappedView, MappedViewMut, Trailer, MAX_PATH_LENGTH, TRAILER_SIZE,
};
pub use config::CabinOptions;
pub use error::{CabinError, Result};
