use crate::archive::entry::DirectoryEntry;
use crate::archive::trailer::{Trailer, TRAILER_SIZE};
use crate::error::{CabinError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

/// In-memory directory with O(1) path lookup
///
/// `entries` holds live entries keyed by allocation sequence number, so
/// iterating it yields allocation order. `lookup` maps each live path to its
/// sequence number. Both are updated together; a path is present in one
/// exactly when it is present in the other.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries: BTreeMap<u64, DirectoryEntry>,
    lookup: HashMap<String, u64>,
    next_seq: u64,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryEntry> {
        self.lookup.get(path).and_then(|seq| self.entries.get(seq))
    }

    /// Live paths in allocation order
    pub fn paths(&self) -> impl Iterator<Item = &String> + '_ {
        self.entries.values().map(|entry| &entry.path)
    }

    /// Live entries in allocation order
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> + '_ {
        self.entries.values()
    }

    /// Most recently allocated live entry
    pub fn last(&self) -> Option<&DirectoryEntry> {
        self.entries.values().next_back()
    }

    /// Register an entry, replacing any live entry for the same path
    ///
    /// The replaced entry's bytes stay in the data region as dead space. The
    /// new entry always goes to the end of the allocation order.
    pub fn add_entry(&mut self, entry: DirectoryEntry) -> Option<DirectoryEntry> {
        let replaced = self.take(&entry.path);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.lookup.insert(entry.path.clone(), seq);
        self.entries.insert(seq, entry);
        replaced
    }

    /// Remove a path's live entry, leaving its bytes on disk unreferenced
    pub fn remove(&mut self, path: &str) -> Result<DirectoryEntry> {
        self.take(path)
            .ok_or_else(|| CabinError::NotFound(path.to_string()))
    }

    fn take(&mut self, path: &str) -> Option<DirectoryEntry> {
        let seq = self.lookup.remove(path)?;
        self.entries.remove(&seq)
    }

    /// Encoded size of the whole directory
    pub fn directory_len(&self) -> u64 {
        self.iter().map(|e| e.encoded_len() as u64).sum()
    }

    /// Write every live entry in allocation order
    pub fn write_directory<W: Write>(&self, mut writer: W) -> Result<u64> {
        let mut written = 0u64;
        for entry in self.iter() {
            written += entry.write_to(&mut writer)? as u64;
        }
        Ok(written)
    }

    /// Load the directory of an archive file
    ///
    /// Reads the trailer from the last 12 bytes, then decodes `entry_count`
    /// entries starting at the directory offset. Files shorter than a trailer
    /// are empty archives. The reader is only read from.
    pub fn load<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<(Self, Trailer)> {
        if file_len < TRAILER_SIZE as u64 {
            debug!("Archive shorter than trailer ({} bytes), treating as empty", file_len);
            return Ok((Self::new(), Trailer::default()));
        }

        reader.seek(SeekFrom::Start(file_len - TRAILER_SIZE as u64))?;
        let trailer = Trailer::read_from(&mut *reader)?;
        let directory_len = trailer.validate(file_len)?;

        reader.seek(SeekFrom::Start(trailer.directory_offset))?;
        let mut directory = vec![0u8; directory_len as usize];
        reader
            .read_exact(&mut directory)
            .map_err(|e| CabinError::from_decode(e, "directory"))?;

        let index = Self::decode_directory(&directory, &trailer)?;

        debug!(
            "Loaded directory at {} with {} entries",
            trailer.directory_offset,
            index.len()
        );

        Ok((index, trailer))
    }

    /// Decode a raw directory region
    pub fn decode_directory(directory: &[u8], trailer: &Trailer) -> Result<Self> {
        let mut cursor = directory;
        let mut index = Self::new();

        for _ in 0..trailer.entry_count {
            let entry = DirectoryEntry::read_from(&mut cursor)?;

            if entry.end() > trailer.directory_offset {
                return Err(CabinError::MalformedEntry(format!(
                    "Entry {} ends at {}, past data region end {}",
                    entry.path,
                    entry.end(),
                    trailer.directory_offset
                )));
            }

            if index.contains(&entry.path) {
                return Err(CabinError::MalformedEntry(format!(
                    "Duplicate path in directory: {}",
                    entry.path
                )));
            }

            index.add_entry(entry);
        }

        if !cursor.is_empty() {
            return Err(CabinError::MalformedEntry(format!(
                "{} trailing bytes after {} directory entries",
                cursor.len(),
                trailer.entry_count
            )));
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn image(data_len: u64, entries: &[DirectoryEntry]) -> Vec<u8> {
        let mut buf = vec![0xAAu8; data_len as usize];
        for entry in entries {
            entry.write_to(&mut buf).unwrap();
        }
        Trailer::new(data_len, entries.len() as u32)
            .write_to(&mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn test_add_entry_keeps_lookup_and_order_in_step() {
        let mut index = ArchiveIndex::new();
        index.add_entry(DirectoryEntry::new(0, 5, "a"));
        index.add_entry(DirectoryEntry::new(5, 3, "b"));

        let replaced = index.add_entry(DirectoryEntry::new(8, 7, "a"));
        assert_eq!(replaced, Some(DirectoryEntry::new(0, 5, "a")));

        assert_eq!(index.len(), 2);
        assert_eq!(index.paths().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(index.get("a").unwrap().offset, 8);
        assert_eq!(index.last().unwrap().path, "a");
    }

    #[test]
    fn test_remove() {
        let mut index = ArchiveIndex::new();
        index.add_entry(DirectoryEntry::new(0, 5, "a"));

        assert_eq!(index.remove("a").unwrap().length, 5);
        assert!(index.is_empty());
        assert!(index.paths().next().is_none());
        assert!(matches!(index.remove("a"), Err(CabinError::NotFound(_))));
    }

    #[test]
    fn test_repeated_overwrites_keep_order() {
        let mut index = ArchiveIndex::new();
        let mut offset = 0;
        for round in 0..1000u64 {
            for path in ["x", "y", "z"] {
                index.add_entry(DirectoryEntry::new(offset, round, path));
                offset += round;
            }
        }
        index.remove("y").unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.paths().collect::<Vec<_>>(), vec!["x", "z"]);
        assert_eq!(index.last().unwrap().path, "z");
        assert_eq!(index.get("x").unwrap().length, 999);
    }

    #[test]
    fn test_load_empty_and_short_files() {
        let (index, trailer) = ArchiveIndex::load(&mut Cursor::new(Vec::new()), 0).unwrap();
        assert!(index.is_empty());
        assert_eq!(trailer, Trailer::default());

        let short = vec![1u8; 11];
        let (index, _) = ArchiveIndex::load(&mut Cursor::new(short), 11).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_preserves_order() {
        let entries = vec![
            DirectoryEntry::new(0, 5, "a"),
            DirectoryEntry::new(5, 3, "b"),
        ];
        let buf = image(8, &entries);
        let len = buf.len() as u64;

        let (index, trailer) = ArchiveIndex::load(&mut Cursor::new(buf), len).unwrap();
        assert_eq!(trailer.entry_count, 2);
        assert_eq!(index.iter().cloned().collect::<Vec<_>>(), entries);
    }

    #[test]
    fn test_entry_past_data_region_is_malformed() {
        let buf = image(8, &[DirectoryEntry::new(4, 10, "a")]);
        let len = buf.len() as u64;
        let result = ArchiveIndex::load(&mut Cursor::new(buf), len);
        assert!(matches!(result, Err(CabinError::MalformedEntry(_))));
    }

    #[test]
    fn test_duplicate_path_is_malformed() {
        let buf = image(
            8,
            &[DirectoryEntry::new(0, 4, "a"), DirectoryEntry::new(4, 4, "a")],
        );
        let len = buf.len() as u64;
        let result = ArchiveIndex::load(&mut Cursor::new(buf), len);
        assert!(matches!(result, Err(CabinError::MalformedEntry(_))));
    }

    #[test]
    fn test_write_directory_size() {
        let mut index = ArchiveIndex::new();
        index.add_entry(DirectoryEntry::new(0, 1, "abc"));
        index.add_entry(DirectoryEntry::new(1, 1, "de"));

        let mut buf = Vec::new();
        let written = index.write_directory(&mut buf).unwrap();
        assert_eq!(written, buf.len() as u64);
        assert_eq!(written, index.directory_len());
        assert_eq!(written, 18 + 3 + 18 + 2);
    }
}
