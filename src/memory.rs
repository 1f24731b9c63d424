//! Byte buffers backing address-space blocks.
//!
//! A [`MemoryView`] holds exactly one of:
//! - memory owned by someone else (typically the emulator core's RAM),
//!   wrapped through [`MemoryView::open_external`];
//! - an anonymous mapping owned by the view;
//! - a read/write mapping of a file, owned by the view.
//!
//! Owned mappings are released when the view is closed or dropped. Moving a
//! view moves the buffer; [`MemoryView::try_clone`] is the only deep copy.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::ptr::NonNull;
use std::slice;

use memmap2::MmapMut;

use crate::error::Result;

#[derive(Debug, Default)]
enum Backing {
    #[default]
    Empty,
    External {
        ptr: NonNull<u8>,
        len: usize,
    },
    Anonymous(MmapMut),
    File {
        map: MmapMut,
        file: File,
    },
}

#[derive(Debug, Default)]
pub struct MemoryView {
    backing: Backing,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `len` zeroed bytes.
    pub fn open_anonymous(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self::new());
        }
        let map = MmapMut::map_anon(len)?;
        Ok(MemoryView {
            backing: Backing::Anonymous(map),
        })
    }

    /// Allocate an owned copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut view = Self::open_anonymous(bytes.len())?;
        view.as_mut_slice().copy_from_slice(bytes);
        Ok(view)
    }

    /// Map `path` read/write, creating it if needed and resizing it to
    /// `size` bytes when given.
    pub fn open_file(path: impl AsRef<Path>, size: Option<usize>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if let Some(size) = size {
            file.set_len(size as u64)?;
        }
        if file.metadata()?.len() == 0 {
            return Ok(Self::new());
        }
        // SAFETY: the mapping is owned by this view together with the file
        // handle. Concurrent modification of the file by other processes is
        // outside what this type supports.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(MemoryView {
            backing: Backing::File { map, file },
        })
    }

    /// Wrap `len` bytes at `ptr` without taking ownership. A null pointer or
    /// zero length yields an empty view.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes for as long as
    /// the view (or any address space holding it) is used, and must not be
    /// accessed through another alias while a slice or datum borrowed from
    /// the view is alive.
    pub unsafe fn open_external(ptr: *mut u8, len: usize) -> Self {
        let backing = match NonNull::new(ptr) {
            Some(ptr) if len > 0 => Backing::External { ptr, len },
            _ => Backing::Empty,
        };
        MemoryView { backing }
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Empty => 0,
            Backing::External { len, .. } => *len,
            Backing::Anonymous(map) | Backing::File { map, .. } => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the view owns its buffer.
    pub fn is_managed(&self) -> bool {
        matches!(self.backing, Backing::Anonymous(_) | Backing::File { .. })
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self.backing, Backing::File { .. })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Empty => &[],
            // SAFETY: upheld by the caller of `open_external`.
            Backing::External { ptr, len } => unsafe { slice::from_raw_parts(ptr.as_ptr(), *len) },
            Backing::Anonymous(map) | Backing::File { map, .. } => &map[..],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::Empty => &mut [],
            // SAFETY: upheld by the caller of `open_external`.
            Backing::External { ptr, len } => unsafe {
                slice::from_raw_parts_mut(ptr.as_ptr(), *len)
            },
            Backing::Anonymous(map) | Backing::File { map, .. } => &mut map[..],
        }
    }

    /// Make this view an owned copy of `src`. An owned buffer of the same
    /// size is overwritten in place; anything else is released and replaced
    /// by a fresh anonymous buffer.
    pub fn clone_from_slice(&mut self, src: &[u8]) -> Result<()> {
        if self.is_managed() && self.len() == src.len() {
            self.as_mut_slice().copy_from_slice(src);
        } else {
            *self = Self::from_bytes(src)?;
        }
        Ok(())
    }

    pub fn try_clone(&self) -> Result<Self> {
        Self::from_bytes(self.as_slice())
    }

    /// Replace a borrowed buffer with an owned copy of its current contents.
    pub fn detach(&mut self) -> Result<()> {
        if let Backing::External { .. } = self.backing {
            *self = Self::from_bytes(self.as_slice())?;
        }
        Ok(())
    }

    /// Move the buffer out, leaving this view empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn flush(&self) -> Result<()> {
        if let Backing::File { map, .. } = &self.backing {
            map.flush()?;
        }
        Ok(())
    }

    /// Flush a file mapping and release whatever the view holds.
    pub fn close(&mut self) -> Result<()> {
        let flushed = self.flush();
        self.backing = Backing::Empty;
        flushed
    }
}
