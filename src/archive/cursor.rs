use crate::archive::index::ArchiveIndex;
use crate::error::{CabinError, Result};

/// Next free byte offset in the data region
///
/// Only moves forward. Space released by deletes or overwrites is never
/// handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationCursor {
    next: u64,
}

impl AllocationCursor {
    pub fn new(next: u64) -> Self {
        Self { next }
    }

    /// Cursor for a freshly loaded index: end of the last live entry, or 0
    pub fn recover(index: &ArchiveIndex) -> Self {
        Self::new(index.last().map_or(0, |entry| entry.end()))
    }

    /// Current position
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Reserve `length` bytes, returning where they start
    pub fn allocate(&mut self, length: u64) -> Result<u64> {
        let offset = self.next;
        self.next = offset.checked_add(length).ok_or(CabinError::Bounds {
            requested: length,
            remaining: u64::MAX - offset,
        })?;
        Ok(offset)
    }
}
