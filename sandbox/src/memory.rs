//! Bounds-checked view over guest linear memory.
//!
//! Every host-side touch of guest memory goes through [`MemoryView`]. The
//! range is validated before any byte is read or written, so an
//! out-of-range request never produces a partial copy. Reads return an
//! owned copy; nothing handed back to the host aliases guest memory.

use std::ops::Range;

use bridge_hostapi::BoundsError;

/// Size of one wasm page.
pub const PAGE_SIZE: usize = 65536;

/// Largest memory whose every byte a non-negative i32 offset can address
/// (2 GiB). Guest pointers arrive as i32 and negative values are rejected,
/// so pages beyond this would be unreachable from the bridge.
pub const MAX_MEMORY_PAGES: u32 = 32768;

/// Borrowed, bounds-checked access to an instance's linear memory.
///
/// The view never owns the buffer; it lives only as long as the borrow
/// the engine hands out for one import call or one inspection.
#[derive(Debug)]
pub struct MemoryView<'a> {
    data: &'a mut [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Current size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Copy `length` bytes starting at `offset` out of guest memory.
    pub fn read(&self, offset: i32, length: i32) -> Result<Vec<u8>, BoundsError> {
        let range = checked_range(self.data.len(), offset, i64::from(length))?;
        Ok(self.data[range].to_vec())
    }

    /// Copy `bytes` into guest memory starting at `offset`.
    ///
    /// Bytes outside `[offset, offset + bytes.len())` are left untouched.
    pub fn write(&mut self, offset: i32, bytes: &[u8]) -> Result<(), BoundsError> {
        let length = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        let range = checked_range(self.data.len(), offset, length)?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Read-only access to the whole region.
    pub fn as_slice(&self) -> &[u8] {
        self.data
    }
}

/// Validate `[offset, offset + length)` against `capacity`.
fn checked_range(capacity: usize, offset: i32, length: i64) -> Result<Range<usize>, BoundsError> {
    let err = || BoundsError::new(i64::from(offset), length, capacity);
    if offset < 0 || length < 0 {
        return Err(err());
    }
    let start = usize::try_from(offset).map_err(|_| err())?;
    let len = usize::try_from(length).map_err(|_| err())?;
    let end = start.checked_add(len).ok_or_else(err)?;
    if end > capacity {
        return Err(err());
    }
    Ok(start..end)
}
