//! The production allocator seam
//!
//! Everything that talks to an external allocator library lives under this module.
use crate::errors::HandoffResult;
use alloc_abi::RawAllocator;

#[cfg(feature = "talc")]
pub mod talc;

/// Where a production allocator gets its memory from during setup
pub trait ArenaSource: RawAllocator {
    /// Largest block [RawAllocator::allocate_aligned] would currently hand out at `align`
    fn largest_block(&self, align: usize) -> usize;
}

/// A full-featured allocator that takes over once thread-local storage is available
///
/// # Safety
/// Implementors must uphold the [RawAllocator] contract once [ProductionAllocator::setup] has
/// returned `Ok`, and [ProductionAllocator::owns] must be true for every pointer they hand out
/// that lies inside the boot region.
pub unsafe trait ProductionAllocator: RawAllocator + Sync {
    /// Smallest extent the allocator is comfortable with
    ///
    /// Handles built on smaller extents still work, but allocations may fail.
    fn min_arena_size(&self) -> usize;

    /// One-time setup
    ///
    /// `source` is the handle being switched over. Memory requested from it during setup is
    /// served by the boot region.
    ///
    /// # Safety
    /// Must be called at most once, before any other operation
    unsafe fn setup(&self, source: &dyn ArenaSource) -> HandoffResult;

    /// True if `ptr` lies in memory this allocator manages
    fn owns(&self, ptr: *const u8) -> bool;
}
