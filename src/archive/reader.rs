use crate::archive::entry::DirectoryEntry;
use crate::archive::index::ArchiveIndex;
use crate::archive::trailer::Trailer;
use crate::error::{CabinError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only view of an archive's directory
///
/// Runs the same open protocol as [`crate::Archive`] but holds only a read
/// handle: there is no cursor and nothing is ever written. The directory is
/// a snapshot taken at open; later writes by another handle are not seen.
pub struct DirectoryReader {
    path: PathBuf,
    file: File,
    index: ArchiveIndex,
    trailer: Trailer,
}

impl DirectoryReader {
    /// Open an archive file and load its directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();

        let (index, trailer) = ArchiveIndex::load(&mut file, file_len)?;

        debug!("Loaded read-only directory of {:?} ({} entries)", path, index.len());

        Ok(Self {
            path,
            file,
            index,
            trailer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Trailer as read from disk (zeroed for an empty archive)
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// Get number of entries in archive
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Entries in directory order
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> + '_ {
        self.index.iter()
    }

    /// List all file paths in the archive
    pub fn list_files(&self) -> Vec<&String> {
        self.index.paths().collect()
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    /// Get entry information without reading data
    pub fn get_entry(&self, path: &str) -> Option<&DirectoryEntry> {
        self.index.get(path)
    }

    /// Paths starting with `prefix`
    pub fn list_prefix(&self, prefix: &str) -> Vec<&String> {
        self.index
            .paths()
            .filter(|path| path.starts_with(prefix))
            .collect()
    }

    /// Read a file from the archive
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(path)
            .ok_or_else(|| CabinError::NotFound(path.to_string()))?;

        self.file.seek(SeekFrom::Start(entry.offset))?;
        let mut data = vec![0u8; entry.length as usize];
        self.file
            .read_exact(&mut data)
            .map_err(|e| CabinError::from_decode(e, &format!("payload of {}", path)))?;
        Ok(data)
    }

    /// Directory listing as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<&DirectoryEntry> = self.index.iter().collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}
