//! Error and Result type for use in this crate
use core::result::Result;
use derive_more::Display;

/// Error type for construction and production setup
#[derive(Debug, Display, PartialEq, Eq)]
pub enum HandoffError {
    /// Extent can't even hold allocator metadata
    #[display("Extent of {len} B is not larger than one page ({page_size} B)")]
    ExtentTooSmall {
        /// Length that was supplied
        len: usize,
        /// Page size in effect
        page_size: usize,
    },
    /// A handle already exists
    #[display("Handoff allocator already initialized (max number of instances: 1)")]
    AlreadyInitialized,
    /// Handle metadata doesn't fit in the extent
    #[display("Not enough space for allocator: {required} B required but only {usable} B usable")]
    InsufficientMetadataSpace {
        /// Page-rounded metadata size
        required: usize,
        /// Length that was supplied
        usable: usize,
    },
    /// Extent base can't hold the handle
    #[display("Extent base {base:#x} is not aligned to {align}")]
    MisalignedBase {
        /// Supplied base address
        base: usize,
        /// Alignment the handle needs
        align: usize,
    },
    /// The boot region couldn't provide a production arena
    #[display("Could not obtain a production arena ({size} B requested)")]
    ArenaUnavailable {
        /// Arena size that was asked for
        size: usize,
    },
    /// The production allocator rejected its arena
    #[display("Production allocator setup failed")]
    SetupFailed,
}

/// Result type for use in this crate
pub type HandoffResult<T = ()> = Result<T, HandoffError>;
