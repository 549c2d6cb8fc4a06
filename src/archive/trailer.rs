use crate::archive::entry::{read_u32, read_u64};
use crate::error::{CabinError, Result};
use std::io::{Read, Write};

/// Trailer size in bytes (fixed)
pub const TRAILER_SIZE: usize = 12;

/// Directory locator
///
/// Always the last 12 bytes of a non-empty archive. Lets the opener find the
/// directory by reading from the end of the file without scanning the data region.
///
/// Structure (12 bytes fixed, big-endian):
/// - Directory Offset: uint64 (8 bytes)
/// - Entry Count: uint32 (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trailer {
    pub directory_offset: u64,
    pub entry_count: u32,
}

impl Trailer {
    pub fn new(directory_offset: u64, entry_count: u32) -> Self {
        Self {
            directory_offset,
            entry_count,
        }
    }

    /// Write trailer to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(&self.directory_offset.to_be_bytes())?;
        writer.write_all(&self.entry_count.to_be_bytes())?;
        Ok(TRAILER_SIZE)
    }

    /// Read trailer from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let directory_offset =
            read_u64(&mut reader).map_err(|e| CabinError::from_decode(e, "trailer offset"))?;
        let entry_count =
            read_u32(&mut reader).map_err(|e| CabinError::from_decode(e, "trailer count"))?;

        Ok(Self {
            directory_offset,
            entry_count,
        })
    }

    /// Check the trailer against the file it was read from
    ///
    /// The directory must start inside the file and end before the trailer, and
    /// must be large enough to hold `entry_count` fixed entry headers.
    pub fn validate(&self, file_len: u64) -> Result<u64> {
        let trailer_start = file_len.checked_sub(TRAILER_SIZE as u64).ok_or_else(|| {
            CabinError::MalformedEntry(format!("File too short for trailer: {} bytes", file_len))
        })?;

        if self.directory_offset > trailer_start {
            return Err(CabinError::MalformedEntry(format!(
                "Directory offset {} beyond trailer at {}",
                self.directory_offset, trailer_start
            )));
        }

        let directory_len = trailer_start - self.directory_offset;
        let minimum = self.entry_count as u64 * super::entry::ENTRY_FIXED_SIZE as u64;
        if directory_len < minimum {
            return Err(CabinError::MalformedEntry(format!(
                "Directory of {} bytes cannot hold {} entries",
                directory_len, self.entry_count
            )));
        }

        Ok(directory_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_roundtrip() {
        let trailer = Trailer::new(1024, 10);

        let mut buf = Vec::new();
        let written = trailer.write_to(&mut buf).unwrap();

        assert_eq!(written, TRAILER_SIZE);
        assert_eq!(buf.len(), TRAILER_SIZE);
        assert_eq!(&buf[..8], &1024u64.to_be_bytes());
        assert_eq!(&buf[8..], &10u32.to_be_bytes());

        let parsed = Trailer::read_from(&buf[..]).unwrap();
        assert_eq!(parsed, trailer);
    }

    #[test]
    fn test_truncated_trailer() {
        let buf = [0u8; 7];
        let result = Trailer::read_from(&buf[..]);
        assert!(matches!(result, Err(CabinError::MalformedEntry(_))));
    }

    #[test]
    fn test_validate_against_file_len() {
        // Empty directory directly before the trailer
        assert_eq!(Trailer::new(100, 0).validate(112).unwrap(), 0);

        // Two minimal entries fit exactly
        assert_eq!(Trailer::new(0, 2).validate(36 + 12).unwrap(), 36);

        // Offset past trailer
        assert!(Trailer::new(200, 0).validate(112).is_err());

        // Count too large for directory bytes
        assert!(Trailer::new(100, 1).validate(112).is_err());

        // File shorter than a trailer
        assert!(Trailer::new(0, 0).validate(4).is_err());
    }
}
