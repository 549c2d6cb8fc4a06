//! Sequential access to entries through buffered file handles

use crate::archive::cabin::Archive;
use crate::archive::entry::DirectoryEntry;
use crate::error::{CabinError, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Take, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Forward-only reader over one entry
///
/// Opens its own handle on the archive file, so its position is independent
/// of the archive's write handle. Reads stop at the end of the entry.
pub struct EntryReader {
    entry: DirectoryEntry,
    inner: Take<BufReader<File>>,
}

impl EntryReader {
    pub(crate) fn open(path: &Path, entry: DirectoryEntry, buffer_size: usize) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let inner = BufReader::with_capacity(buffer_size, file).take(entry.length);

        Ok(Self { entry, inner })
    }

    /// The directory entry being read
    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    /// Bytes left before the end of the entry
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

enum WriterState {
    Open(BufWriter<File>),
    Closed(DirectoryEntry),
    Failed,
}

/// Append-only writer for an entry of unknown length
///
/// Bytes go straight into the data region at the allocation cursor. The
/// entry is registered only when the writer is closed, with the length
/// being the number of bytes written. Holding the archive mutably keeps any
/// other allocation from landing inside the bytes being appended.
pub struct EntryWriter<'a> {
    archive: &'a mut Archive,
    path: String,
    start: u64,
    written: u64,
    state: WriterState,
}

impl<'a> EntryWriter<'a> {
    pub(crate) fn new(archive: &'a mut Archive, path: &str) -> Result<Self> {
        let start = archive.cursor();
        let mut file = archive.file().try_clone()?;
        file.seek(SeekFrom::Start(start))?;
        let sink = BufWriter::with_capacity(archive.options().stream_buffer_size, file);

        debug!("Appending {} at {}", path, start);

        Ok(Self {
            archive,
            path: path.to_string(),
            start,
            written: 0,
            state: WriterState::Open(sink),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Offset where this entry's bytes begin
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Bytes accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush and register the entry
    ///
    /// Closing again returns the entry registered by the first close.
    pub fn close(&mut self) -> Result<DirectoryEntry> {
        let sink = match std::mem::replace(&mut self.state, WriterState::Failed) {
            WriterState::Open(sink) => sink,
            WriterState::Closed(entry) => {
                self.state = WriterState::Closed(entry.clone());
                return Ok(entry);
            }
            WriterState::Failed => {
                return Err(CabinError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("writer for {} failed earlier", self.path),
                )));
            }
        };

        sink.into_inner().map_err(|e| e.into_error())?;

        let entry = self.archive.allocate(&self.path, self.written)?;
        debug_assert_eq!(entry.offset, self.start);

        self.state = WriterState::Closed(entry.clone());
        Ok(entry)
    }

    fn sink(&mut self) -> io::Result<&mut BufWriter<File>> {
        match &mut self.state {
            WriterState::Open(sink) => Ok(sink),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("writer for {} is closed", self.path),
            )),
        }
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink()?.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink()?.flush()
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        if matches!(self.state, WriterState::Open(_)) {
            if let Err(e) = self.close() {
                warn!("Failed to close writer for {}: {}", self.path, e);
            }
        }
    }
}
