//! Build-time configuration

/// Page size. Extents at or below this are rejected, and handle metadata is rounded up to it.
pub const PAGE_SIZE: usize = 4096;

/// Arena size requested by the talc adapter unless told otherwise
///
/// Extents smaller than this still work, but large production allocations may fail.
pub const DEFAULT_ARENA_SIZE: usize = 256 * 1024 * 1024;
