//! A bump allocator over a single fixed memory region
//!
//! Meant to serve allocations before anything fancier is available. Memory is handed out in
//! address order and never reclaimed: [RegionAllocator::deallocate] only validates its argument.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
mod header;
use core::{
    fmt::{self, Display},
    mem,
    ptr::NonNull,
};
use header::Header;

/// Natural word size. Every block is at least word-aligned.
pub const WORD: usize = mem::size_of::<usize>();

const fn align_up(val: usize, align: usize) -> Option<usize> {
    assert!(align.is_power_of_two());
    match val.checked_add(align - 1) {
        Some(val) => Some(val & !(align - 1)),
        None => None,
    }
}

/// Errors a [RegionAllocator] can hand back
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionError {
    /// Not enough room left in the region
    OutOfMemory,
    /// Requested alignment is not a power of two
    InvalidAlignment,
}

impl Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "region exhausted"),
            Self::InvalidAlignment => write!(f, "alignment is not a power of two"),
        }
    }
}

/// Upward-growing allocator bound to `[start, end)`
#[derive(Debug)]
pub struct RegionAllocator {
    start: usize,
    end: usize,
    cursor: usize,
}

impl RegionAllocator {
    /// Create an allocator over `len` bytes starting at `base`
    ///
    /// # Safety
    /// The region must be valid for reads and writes for as long as the allocator, or any block
    /// it handed out, is in use. Nothing else may write to the region.
    pub unsafe fn new(base: *mut u8, len: usize) -> Self {
        let start = base as usize;
        Self {
            start,
            end: start.saturating_add(len),
            cursor: start,
        }
    }

    /// Allocate `size` bytes with word alignment
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, RegionError> {
        self.allocate_aligned(WORD, size)
    }

    /// Allocate `size` bytes aligned to `align`
    ///
    /// Alignments below [WORD] are rounded up to [WORD].
    ///
    /// # Returns
    /// The address of the first usable byte
    pub fn allocate_aligned(
        &mut self,
        align: usize,
        size: usize,
    ) -> Result<NonNull<u8>, RegionError> {
        if !align.is_power_of_two() {
            return Err(RegionError::InvalidAlignment);
        }
        let align = align.max(WORD);

        // Room for the header, then the data at the requested alignment
        let data = self
            .cursor
            .checked_add(Header::SIZE)
            .and_then(|val| align_up(val, align))
            .ok_or(RegionError::OutOfMemory)?;
        let new_cursor = align_up(size, WORD)
            .and_then(|size| data.checked_add(size))
            .ok_or(RegionError::OutOfMemory)?;
        if new_cursor > self.end {
            return Err(RegionError::OutOfMemory);
        }

        // SAFETY: `data - Header::SIZE` is word-aligned and lies inside the unused part of the
        // region, which we own
        unsafe { Header { size }.write(data as *mut u8) };
        self.cursor = new_cursor;

        NonNull::new(data as *mut u8).ok_or(RegionError::OutOfMemory)
    }

    /// Give a block back
    ///
    /// The memory is not reused. Callers must not rely on freed memory coming back.
    ///
    /// # Returns
    /// The usable size of the block
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>) -> usize {
        debug_assert!(self.owns(ptr.as_ptr()), "Address not in region");
        // SAFETY: upheld by caller
        unsafe { self.usable_size(ptr) }
    }

    /// Usable size of a block, as requested at allocation time
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        // SAFETY: every block returned by this allocator is preceded by a header
        unsafe { Header::read(ptr.as_ptr()).size }
    }

    /// Largest `size` that [RegionAllocator::allocate_aligned] would accept right now for
    /// `align`
    ///
    /// Returns zero if not even an empty block fits, or if `align` is not a power of two.
    pub fn largest_block(&self, align: usize) -> usize {
        if !align.is_power_of_two() {
            return 0;
        }
        let data = self
            .cursor
            .checked_add(Header::SIZE)
            .and_then(|val| align_up(val, align.max(WORD)));
        match data {
            Some(data) if data <= self.end => (self.end - data) & !(WORD - 1),
            _ => 0,
        }
    }

    /// True if `ptr` lies inside the region
    pub fn owns(&self, ptr: *const u8) -> bool {
        (self.start..self.end).contains(&(ptr as usize))
    }

    /// Total size of the region in bytes
    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    /// Bytes consumed so far, headers and padding included
    pub fn used(&self) -> usize {
        self.cursor - self.start
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }
}
