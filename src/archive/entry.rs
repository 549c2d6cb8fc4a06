use crate::error::{CabinError, Result};
use serde::Serialize;
use std::io::{Read, Write};

/// Maximum encoded path length in bytes (UTF-8, u16 length prefix)
pub const MAX_PATH_LENGTH: usize = u16::MAX as usize;

/// Fixed part of an encoded entry: offset (8) + length (8) + path length (2)
pub const ENTRY_FIXED_SIZE: usize = 18;

/// Placement of one logical file inside the data region
///
/// Encoded in the directory as:
/// - Offset: uint64 BE (8 bytes)
/// - Length: uint64 BE (8 bytes)
/// - Path length: uint16 BE (2 bytes)
/// - Path: UTF-8 (path length bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub offset: u64,
    pub length: u64,
    pub path: String,
}

impl DirectoryEntry {
    pub fn new(offset: u64, length: u64, path: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            path: path.into(),
        }
    }

    /// First byte past the end of this entry's payload
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Size of this entry once encoded in the directory
    pub fn encoded_len(&self) -> usize {
        ENTRY_FIXED_SIZE + self.path.len()
    }

    /// Write entry to the directory
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        validate_path(&self.path)?;

        writer.write_all(&self.offset.to_be_bytes())?;
        writer.write_all(&self.length.to_be_bytes())?;

        let path_bytes = self.path.as_bytes();
        writer.write_all(&(path_bytes.len() as u16).to_be_bytes())?;
        writer.write_all(path_bytes)?;

        Ok(self.encoded_len())
    }

    /// Read entry from the directory
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let offset = read_u64(&mut reader).map_err(|e| CabinError::from_decode(e, "entry offset"))?;
        let length = read_u64(&mut reader).map_err(|e| CabinError::from_decode(e, "entry length"))?;
        let path_len =
            read_u16(&mut reader).map_err(|e| CabinError::from_decode(e, "entry path length"))?;

        let mut path_buf = vec![0u8; path_len as usize];
        reader.read_exact(&mut path_buf).map_err(|e| {
            CabinError::from_decode(e, &format!("entry path ({} bytes declared)", path_len))
        })?;

        let path = String::from_utf8(path_buf)
            .map_err(|e| CabinError::MalformedEntry(format!("Invalid UTF-8 in path: {}", e)))?;

        offset.checked_add(length).ok_or_else(|| {
            CabinError::MalformedEntry(format!(
                "Entry {} overflows: offset {} + length {}",
                path, offset, length
            ))
        })?;

        Ok(Self {
            offset,
            length,
            path,
        })
    }
}

/// Reject paths that cannot be encoded with a u16 length prefix
pub fn validate_path(path: &str) -> Result<()> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(CabinError::InvalidPath(format!(
            "Path too long: {} bytes (max {})",
            path.len(),
            MAX_PATH_LENGTH
        )));
    }
    Ok(())
}

// Helper functions for reading primitive types
pub(crate) fn read_u16<R: Read>(mut reader: R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(mut reader: R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(mut reader: R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}
