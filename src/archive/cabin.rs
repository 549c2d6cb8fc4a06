use crate::archive::cursor::AllocationCursor;
use crate::archive::entry::{validate_path, DirectoryEntry};
use crate::archive::index::ArchiveIndex;
use crate::archive::mapped::{MappedView, MappedViewMut};
use crate::archive::stream::{EntryReader, EntryWriter};
use crate::archive::trailer::{Trailer, TRAILER_SIZE};
use crate::config::CabinOptions;
use crate::error::{CabinError, Result};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read/write handle on a cabin archive
///
/// The directory and allocation cursor live in memory while the handle is
/// open and are written back by [`Archive::close`]. Dropping the handle
/// without closing it discards every index change made in this session.
pub struct Archive {
    path: PathBuf,
    file: File,
    index: ArchiveIndex,
    cursor: AllocationCursor,
    options: CabinOptions,
    dirty: bool,
}

impl Archive {
    /// Open (or create) an archive with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, CabinOptions::default())
    }

    /// Open an archive with explicit options
    ///
    /// Loads the trailer and directory if the file has one. Opening never
    /// writes to the file.
    pub fn open_with<P: AsRef<Path>>(path: P, options: CabinOptions) -> Result<Self> {
        options.validate()?;

        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(options.create)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let (index, _trailer) = ArchiveIndex::load(&mut file, file_len)?;
        let cursor = AllocationCursor::recover(&index);

        debug!(
            "Opened archive {:?} (size: {} bytes, entries: {}, cursor: {})",
            path,
            file_len,
            index.len(),
            cursor.position()
        );

        Ok(Self {
            path,
            file,
            index,
            cursor,
            options,
            dirty: false,
        })
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &CabinOptions {
        &self.options
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    /// Next free offset in the data region
    pub fn cursor(&self) -> u64 {
        self.cursor.position()
    }

    /// Number of live entries
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    /// Get entry placement without touching the data
    pub fn get_entry(&self, path: &str) -> Option<&DirectoryEntry> {
        self.index.get(path)
    }

    /// Live entries in allocation order
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> + '_ {
        self.index.iter()
    }

    /// Live paths in allocation order
    pub fn list_files(&self) -> Vec<&String> {
        self.index.paths().collect()
    }

    /// Live paths starting with `prefix`
    pub fn list_prefix(&self, prefix: &str) -> Vec<&String> {
        self.index
            .paths()
            .filter(|path| path.starts_with(prefix))
            .collect()
    }

    /// Reserve `length` bytes at the cursor and make them the live entry for `path`
    ///
    /// Both write paths go through here. Any previous entry for the path
    /// becomes dead space.
    pub(crate) fn allocate(&mut self, path: &str, length: u64) -> Result<DirectoryEntry> {
        let offset = self.cursor.allocate(length)?;
        let entry = DirectoryEntry::new(offset, length, path);

        if let Some(old) = self.index.add_entry(entry.clone()) {
            debug!(
                "Replaced {} ({} bytes at {} now dead)",
                path, old.length, old.offset
            );
        }
        self.dirty = true;

        debug!("Allocated {} bytes for {} at {}", length, path, offset);
        Ok(entry)
    }

    fn lookup(&self, path: &str) -> Result<DirectoryEntry> {
        self.index
            .get(path)
            .cloned()
            .ok_or_else(|| CabinError::NotFound(path.to_string()))
    }

    /// Refuse to map a range the file does not actually contain
    fn check_mapped_range(&self, entry: &DirectoryEntry) -> Result<()> {
        let file_len = self.file.metadata()?.len();
        if entry.end() > file_len {
            return Err(CabinError::MalformedEntry(format!(
                "Entry {} ends at {} but file is {} bytes",
                entry.path,
                entry.end(),
                file_len
            )));
        }
        Ok(())
    }

    /// Open a bounded streaming reader over an entry
    pub fn open_reader(&self, path: &str) -> Result<EntryReader> {
        let entry = self.lookup(path)?;
        EntryReader::open(&self.path, entry, self.options.stream_buffer_size)
    }

    /// Open an append writer; the entry is registered when the writer closes
    pub fn open_writer(&mut self, path: &str) -> Result<EntryWriter<'_>> {
        validate_path(path)?;
        EntryWriter::new(self, path)
    }

    /// Map an entry for reading
    ///
    /// The view borrows the handle: the archive cannot be closed or modified
    /// until every view is released.
    pub fn direct_read(&self, path: &str) -> Result<MappedView<'_>> {
        let entry = self.lookup(path)?;
        self.check_mapped_range(&entry)?;
        MappedView::map(&self.file, entry)
    }

    /// Map several entries at once
    ///
    /// Fails without mapping anything if any path is missing.
    pub fn direct_read_batch<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<HashMap<String, MappedView<'_>>> {
        let entries = paths
            .iter()
            .map(|path| self.lookup(path.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut views = HashMap::with_capacity(entries.len());
        for entry in entries {
            if views.contains_key(&entry.path) {
                continue;
            }
            self.check_mapped_range(&entry)?;
            views.insert(entry.path.clone(), MappedView::map(&self.file, entry)?);
        }
        Ok(views)
    }

    /// Pre-allocate `length` bytes for `path` and map them for writing
    ///
    /// The entry is live as soon as this returns, before any payload bytes
    /// are written. The view holds the handle mutably until it is released;
    /// other readers of the file in the meantime see whatever the range
    /// currently holds.
    pub fn direct_write(&mut self, path: &str, length: u64) -> Result<MappedViewMut<'_>> {
        validate_path(path)?;

        let end = self
            .cursor
            .position()
            .checked_add(length)
            .ok_or(CabinError::Bounds {
                requested: length,
                remaining: u64::MAX - self.cursor.position(),
            })?;

        if self.file.metadata()?.len() < end {
            self.file.set_len(end)?;
        }

        let entry = self.allocate(path, length)?;
        MappedViewMut::map(&self.file, entry)
    }

    /// Remove a path's live entry; its bytes stay on disk unreferenced
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let entry = self.index.remove(path)?;
        self.dirty = true;
        debug!("Deleted {} ({} bytes at {})", path, entry.length, entry.offset);
        Ok(())
    }

    /// Append a complete file through the streaming path
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<DirectoryEntry> {
        let mut writer = self.open_writer(path)?;
        writer.write_all(data)?;
        writer.close()
    }

    /// Stream a file from disk into the archive
    pub fn add_file_from_disk(&mut self, archive_path: &str, disk_path: &Path) -> Result<DirectoryEntry> {
        let mut source = File::open(disk_path)?;
        let mut writer = self.open_writer(archive_path)?;
        std::io::copy(&mut source, &mut writer)?;
        writer.close()
    }

    /// Read a whole entry into memory
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open_reader(path)?;
        let mut data = Vec::with_capacity(reader.remaining() as usize);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Write the directory and trailer, then release the handle
    ///
    /// The directory goes at the cursor, followed by the trailer, and the file
    /// is cut off right after the trailer. On failure the new directory is not
    /// persisted.
    pub fn close(mut self) -> Result<()> {
        self.write_directory()?;
        self.dirty = false;
        Ok(())
    }

    fn write_directory(&mut self) -> Result<()> {
        let directory_offset = self.cursor.position();
        let entry_count = u32::try_from(self.index.len()).map_err(|_| {
            CabinError::MalformedEntry(format!("Too many entries: {}", self.index.len()))
        })?;

        self.file.seek(SeekFrom::Start(directory_offset))?;

        let mut writer = BufWriter::with_capacity(self.options.stream_buffer_size, &self.file);
        let directory_len = self.index.write_directory(&mut writer)?;
        Trailer::new(directory_offset, entry_count).write_to(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?;

        self.file
            .set_len(directory_offset + directory_len + TRAILER_SIZE as u64)?;

        if self.options.sync_on_close {
            self.file.sync_all()?;
        }

        info!(
            "Wrote directory for {:?}: {} entries at {}",
            self.path, entry_count, directory_offset
        );
        Ok(())
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                "Archive {:?} dropped without close; directory changes were not saved",
                self.path
            );
        }
    }
}
