//! Memory-mapped access to a single entry
//!
//! A view borrows the archive handle it was mapped from, so the handle cannot
//! be closed, truncated or written through while the view is alive. Views
//! unmap when released or dropped. A zero-length entry produces a view with
//! no mapping behind it.

use crate::archive::entry::DirectoryEntry;
use crate::error::{CabinError, Result};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use tracing::debug;

fn map_len(entry: &DirectoryEntry) -> Result<usize> {
    usize::try_from(entry.length).map_err(|_| {
        CabinError::MalformedEntry(format!(
            "Entry {} too large to map: {} bytes",
            entry.path, entry.length
        ))
    })
}

fn check_position(position: u64, len: usize) -> Result<usize> {
    if position > len as u64 {
        return Err(CabinError::Bounds {
            requested: position,
            remaining: len as u64,
        });
    }
    Ok(position as usize)
}

fn seek_target(pos: SeekFrom, current: usize, len: usize) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::Current(delta) => (current as u64).checked_add_signed(delta),
        SeekFrom::End(delta) => (len as u64).checked_add_signed(delta),
    };
    target.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative or overflowing position",
        )
    })
}

/// Read-only mapped view of exactly one entry's bytes
///
/// The view lives no longer than the borrow of the archive it came from:
///
/// ```compile_fail
/// use cabin_rs::Archive;
///
/// let archive = Archive::open("example.cabin")?;
/// let view = archive.direct_read("a.txt")?;
/// archive.close()?;
/// println!("{}", view.len());
/// # Ok::<(), cabin_rs::CabinError>(())
/// ```
///
/// ```compile_fail
/// use cabin_rs::Archive;
///
/// let mut archive = Archive::open("example.cabin")?;
/// let view = archive.direct_read("a.txt")?;
/// archive.delete("a.txt")?;
/// println!("{}", view.len());
/// # Ok::<(), cabin_rs::CabinError>(())
/// ```
pub struct MappedView<'a> {
    entry: DirectoryEntry,
    map: Option<Mmap>,
    position: usize,
    mark: usize,
    _file: PhantomData<&'a File>,
}

impl<'a> MappedView<'a> {
    pub(crate) fn map(file: &'a File, entry: DirectoryEntry) -> Result<Self> {
        let len = map_len(&entry)?;
        let map = if len == 0 {
            None
        } else {
            // SAFETY: the range lies inside the file and the view borrows the
            // handle, so close (the only truncation) cannot run until the view
            // is gone. Other processes or handles resizing the file are outside
            // the single-owner model.
            #[allow(unsafe_code)]
            let map = unsafe { MmapOptions::new().offset(entry.offset).len(len).map(file)? };
            Some(map)
        };

        debug!("Mapped {} for reading ({} bytes at {})", entry.path, len, entry.offset);

        Ok(Self {
            entry,
            map,
            position: 0,
            mark: 0,
            _file: PhantomData,
        })
    }

    /// The directory entry this view covers
    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entire entry contents, independent of the read position
    pub fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the read position; the end of the view is a valid position
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = check_position(position, self.len())?;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.position
    }

    /// Remember the current position for a later `reset`
    pub fn mark(&mut self) {
        self.mark = self.position;
    }

    /// Return to the last marked position (the start if never marked)
    pub fn reset(&mut self) {
        self.position = self.mark;
    }

    /// Bytes readable without blocking on page faults
    ///
    /// Reports `remaining()` when every page backing the unread part of the
    /// view is resident, otherwise 0. This is an estimate: pages can be evicted
    /// right after the check.
    pub fn available(&self) -> usize {
        let rest = &self.as_slice()[self.position..];
        if rest.is_empty() || !pages_resident(rest) {
            return 0;
        }
        rest.len()
    }

    /// Hint the kernel to start reading the view's pages
    pub fn prefetch(&self) -> Result<()> {
        #[cfg(unix)]
        if let Some(map) = &self.map {
            map.advise(memmap2::Advice::WillNeed)?;
        }
        Ok(())
    }

    /// Unmap the view
    pub fn release(self) {
        debug!("Released read view of {}", self.entry.path);
    }
}

impl std::fmt::Debug for MappedView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedView")
            .field("entry", &self.entry)
            .field("position", &self.position)
            .field("mark", &self.mark)
            .finish()
    }
}

impl Read for MappedView<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = &self.as_slice()[self.position..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Seek for MappedView<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = seek_target(pos, self.position, self.len())?;
        self.set_position(target)?;
        Ok(target)
    }
}

/// Writable mapped view over a pre-allocated entry
///
/// Writes are bounds-checked against the entry length. Writing fewer bytes
/// than the length is not detected; the untouched tail keeps whatever the
/// file held there before. The archive stays mutably borrowed until the view
/// is released:
///
/// ```compile_fail
/// use cabin_rs::Archive;
/// use std::io::Write;
///
/// let mut archive = Archive::open("example.cabin")?;
/// let mut view = archive.direct_write("fixed.bin", 4)?;
/// archive.write_file("other.txt", b"abc")?;
/// view.write_all(&[1, 2, 3, 4])?;
/// # Ok::<(), cabin_rs::CabinError>(())
/// ```
pub struct MappedViewMut<'a> {
    entry: DirectoryEntry,
    map: Option<MmapMut>,
    position: usize,
    _file: PhantomData<&'a File>,
}

impl<'a> MappedViewMut<'a> {
    pub(crate) fn map(file: &'a File, entry: DirectoryEntry) -> Result<Self> {
        let len = map_len(&entry)?;
        let map = if len == 0 {
            None
        } else {
            // SAFETY: the caller extended the file to cover the range and holds
            // the archive mutably for the view's lifetime, so nothing else maps
            // or truncates it.
            #[allow(unsafe_code)]
            let map = unsafe {
                MmapOptions::new()
                    .offset(entry.offset)
                    .len(len)
                    .map_mut(file)?
            };
            Some(map)
        };

        debug!("Mapped {} for writing ({} bytes at {})", entry.path, len, entry.offset);

        Ok(Self {
            entry,
            map,
            position: 0,
            _file: PhantomData,
        })
    }

    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = check_position(position, self.len())?;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.position
    }

    /// Direct access to the whole mapped range
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.map.as_deref_mut().unwrap_or(&mut [])
    }

    /// Copy `bytes` at the current position
    ///
    /// Fails without writing anything if `bytes` does not fit in the
    /// remaining capacity.
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(CabinError::Bounds {
                requested: bytes.len() as u64,
                remaining: remaining as u64,
            });
        }

        let start = self.position;
        self.as_mut_slice()[start..start + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    /// Flush outstanding changes and unmap the view
    pub fn release(mut self) -> Result<()> {
        self.flush()?;
        debug!(
            "Released write view of {} ({} of {} bytes written)",
            self.entry.path,
            self.position,
            self.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for MappedViewMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedViewMut")
            .field("entry", &self.entry)
            .field("position", &self.position)
            .finish()
    }
}

impl Write for MappedViewMut<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.put(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.map {
            Some(map) => map.flush(),
            None => Ok(()),
        }
    }
}

impl Seek for MappedViewMut<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = seek_target(pos, self.position, self.len())?;
        self.set_position(target)?;
        Ok(target)
    }
}

#[cfg(target_os = "linux")]
fn pages_resident(data: &[u8]) -> bool {
    #[allow(unsafe_code)]
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page <= 0 {
        return false;
    }
    let page = page as usize;

    let start = data.as_ptr() as usize;
    let aligned = start & !(page - 1);
    let span = start + data.len() - aligned;
    let mut residency = vec![0u8; span.div_ceil(page)];

    // SAFETY: [aligned, aligned + span) is covered by the live mapping backing
    // `data`, and `residency` has one byte per page in that range.
    #[allow(unsafe_code)]
    let rc = unsafe {
        libc::mincore(
            aligned as *mut libc::c_void,
            span,
            residency.as_mut_ptr(),
        )
    };

    rc == 0 && residency.iter().all(|page| page & 1 == 1)
}

#[cfg(not(target_os = "linux"))]
fn pages_resident(_data: &[u8]) -> bool {
    false
}
