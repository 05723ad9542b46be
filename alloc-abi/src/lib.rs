//! Common allocator interface between callers and allocator backends
//!
//! Mirrors the classic C allocator surface: allocation calls return null on failure, and the
//! POSIX aligned variant reports failure through a [Status] code.
#![cfg_attr(not(test), no_std)]
mod error;
mod status;
pub use error::AllocAbiError;
pub use status::{check_posix_alignment, Status};

/// The six-operation allocator interface
///
/// # Safety
///
/// Implementors must return either null or a pointer to at least `size` bytes that stay valid and
/// unaliased until passed to [RawAllocator::free] or [RawAllocator::reallocate] on the same
/// allocator.
pub unsafe trait RawAllocator {
    /// Allocate `size` bytes with natural word alignment
    fn allocate(&self, size: usize) -> *mut u8;

    /// Allocate `nelem * elem_size` zero-filled bytes
    ///
    /// Returns null if the multiplication overflows.
    fn allocate_zeroed(&self, nelem: usize, elem_size: usize) -> *mut u8;

    /// Resize an allocation, moving it if needed
    ///
    /// A null `ptr` behaves like [RawAllocator::allocate].
    ///
    /// # Safety
    /// `ptr` must be null or a live allocation from this allocator
    unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8;

    /// Allocate `size` bytes aligned to `align`
    fn allocate_aligned(&self, align: usize, size: usize) -> *mut u8;

    /// Allocate `size` bytes aligned to `align`, storing the result in `memptr`
    ///
    /// `memptr` is left untouched on failure.
    fn posix_allocate_aligned(&self, memptr: &mut *mut u8, align: usize, size: usize) -> Status;

    /// Release an allocation. Null is ignored.
    ///
    /// # Safety
    /// `ptr` must be null or a live allocation from this allocator
    unsafe fn free(&self, ptr: *mut u8);
}
