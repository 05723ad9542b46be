//! The process-visible allocation interface
//!
//! A [Handoff] lives at the start of the extent it was built on; the rest of the extent becomes
//! the boot region. Operations are dispatched on the phase stored in the handle's
//! [InstanceSlot]: boot bindings until `Production` is published, the production allocator
//! afterwards.
use crate::{
    adapter::{ArenaSource, ProductionAllocator},
    boot::{BootRegion, BootStats},
    config::PAGE_SIZE,
    errors::{HandoffError, HandoffResult},
    gate::Phase,
    probe::ContextProbe,
    singleton::InstanceSlot,
    util::align_up,
};
use alloc_abi::{RawAllocator, Status};
use core::{
    mem,
    ptr::{self, NonNull},
    sync::atomic::{AtomicBool, Ordering},
};
use log::{error, info, warn};

/// Which backend an operation goes to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Backend {
    Boot,
    Production,
}

/// Allocator handle that starts on a boot region and hands off to `P`
pub struct Handoff<P, R> {
    slot: &'static InstanceSlot,
    base: usize,
    len: usize,
    undersized: bool,
    setup_failed: AtomicBool,
    boot: BootRegion,
    production: P,
    probe: R,
}

impl<P: ProductionAllocator, R: ContextProbe> Handoff<P, R> {
    /// Size reserved for the handle at the start of the extent
    pub const METADATA_LEN: usize = align_up::<PAGE_SIZE>(mem::size_of::<Self>());

    /// Build the process-wide handle on `[base, base + len)`
    ///
    /// Fails if the extent is a page or less, if the handle doesn't fit, or if a handle already
    /// exists. An extent whose boot region can't hold a page-aligned arena of
    /// `production.min_arena_size()` bytes is accepted with a warning.
    ///
    /// # Safety
    /// The extent must be valid for reads and writes for the rest of the program and must not be
    /// used by anything else.
    pub unsafe fn init(
        base: *mut u8,
        len: usize,
        production: P,
        probe: R,
    ) -> HandoffResult<&'static Self>
    where
        Self: 'static,
    {
        // SAFETY: upheld by caller
        unsafe { Self::init_in(InstanceSlot::process(), base, len, production, probe) }
    }

    /// Same as [Handoff::init], but claims `slot` instead of the process-wide slot
    ///
    /// # Safety
    /// See [Handoff::init]
    pub unsafe fn init_in(
        slot: &'static InstanceSlot,
        base: *mut u8,
        len: usize,
        production: P,
        probe: R,
    ) -> HandoffResult<&'static Self>
    where
        Self: 'static,
    {
        // The first region may be a single page; that's not enough for anything
        if len <= PAGE_SIZE {
            let err = HandoffError::ExtentTooSmall {
                len,
                page_size: PAGE_SIZE,
            };
            error!("{err}");
            return Err(err);
        }

        if slot.is_claimed() {
            error!("{}", HandoffError::AlreadyInitialized);
            return Err(HandoffError::AlreadyInitialized);
        }

        let metalen = Self::METADATA_LEN;
        if metalen > len {
            let err = HandoffError::InsufficientMetadataSpace {
                required: metalen,
                usable: len,
            };
            error!("{err}");
            return Err(err);
        }

        let align = mem::align_of::<Self>();
        if base as usize % align != 0 {
            let err = HandoffError::MisalignedBase {
                base: base as usize,
                align,
            };
            error!("{err}");
            return Err(err);
        }

        // Metadata goes on the heap, just before the boot region
        // SAFETY: the extent is ours and `metalen <= len`
        let boot = unsafe { BootRegion::new(base.add(metalen), len - metalen) };

        // Not fatal: production allocations will just return null
        let min_arena = production.min_arena_size();
        let usable = boot.largest_block(PAGE_SIZE);
        let undersized = usable < min_arena;
        if undersized {
            warn!(
                "Not enough space to allocate arena: {min_arena} bytes required but only {usable} bytes usable"
            );
        }

        if !slot.claim() {
            error!("{}", HandoffError::AlreadyInitialized);
            return Err(HandoffError::AlreadyInitialized);
        }

        info!("Initialize handoff allocator (early boot time mode) @ {base:p}, len {len}");

        // SAFETY: the extent is ours and `base` is aligned for `Self`
        unsafe {
            let handle = base as *mut Self;
            handle.write(Self {
                slot,
                base: base as usize,
                len,
                undersized,
                setup_failed: AtomicBool::new(false),
                boot,
                production,
                probe,
            });
            Ok(&*handle)
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.slot.phase()
    }

    /// True once production setup has been started, whether or not it finished
    ///
    /// See [Handoff::setup_failed] to tell a failed setup from one still underway.
    pub fn is_initialized(&self) -> bool {
        self.phase() >= Phase::Transitioning
    }

    /// True if production setup ran and failed
    ///
    /// The handle then stays in [Phase::Transitioning] for good and keeps serving from the boot
    /// region.
    pub fn setup_failed(&self) -> bool {
        self.setup_failed.load(Ordering::Acquire)
    }

    /// True if the boot region couldn't hold the production allocator's minimum arena
    pub fn is_undersized(&self) -> bool {
        self.undersized
    }

    /// Base address and length of the extent this handle was built on
    pub fn extent(&self) -> (*const u8, usize) {
        (self.base as *const u8, self.len)
    }

    /// Usage of the boot region
    pub fn boot_stats(&self) -> BootStats {
        self.boot.stats()
    }

    /// True if `ptr` was handed out by the boot region
    ///
    /// The production arena is carved out of the boot region too, but doesn't count.
    pub fn owns_boot_memory(&self, ptr: *const u8) -> bool {
        self.boot.owns(ptr) && !self.production.owns(ptr)
    }

    /// The production allocator
    pub fn production(&self) -> &P {
        &self.production
    }

    /// The readiness probe
    pub fn probe(&self) -> &R {
        &self.probe
    }

    pub(crate) fn slot(&self) -> &InstanceSlot {
        self.slot
    }

    pub(crate) fn boot(&self) -> &BootRegion {
        &self.boot
    }

    pub(crate) fn mark_setup_failed(&self) {
        self.setup_failed.store(true, Ordering::Release);
    }

    fn backend(&self) -> Backend {
        match self.phase() {
            Phase::Production => Backend::Production,
            _ => Backend::Boot,
        }
    }

    // The boot region has no calloc, so allocate and clear
    fn zeroed_compat(&self, nelem: usize, elem_size: usize) -> *mut u8 {
        let Some(size) = nelem.checked_mul(elem_size) else {
            return ptr::null_mut();
        };
        let ptr = self.allocate(size);
        if !ptr.is_null() {
            // SAFETY: `ptr` points to at least `size` fresh bytes
            unsafe { ptr.write_bytes(0, size) };
        }
        ptr
    }

    // The boot region has no realloc, so allocate, copy and free
    //
    // SAFETY: `ptr` must be null or a live boot allocation
    unsafe fn reallocate_compat(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        let Some(old) = NonNull::new(ptr) else {
            return self.allocate(size);
        };
        if size == 0 {
            unsafe { self.free(ptr) };
            return ptr::null_mut();
        }

        let new = self.allocate(size);
        if new.is_null() {
            return new;
        }
        // SAFETY: `old` is a live boot allocation and `new` has room for `size` bytes
        unsafe {
            let len = self.boot.usable_size(old).min(size);
            ptr::copy_nonoverlapping(old.as_ptr(), new, len);
            self.free(ptr);
        }
        new
    }
}

impl<P: ProductionAllocator, R: ContextProbe> ArenaSource for Handoff<P, R> {
    fn largest_block(&self, align: usize) -> usize {
        match self.backend() {
            Backend::Boot => self.boot.largest_block(align),
            // The production allocator doesn't say
            Backend::Production => 0,
        }
    }
}

// SAFETY: every operation forwards to the boot region or the production allocator
unsafe impl<P: ProductionAllocator, R: ContextProbe> RawAllocator for Handoff<P, R> {
    fn allocate(&self, size: usize) -> *mut u8 {
        match self.backend() {
            Backend::Boot => self.gated_allocate(size),
            Backend::Production => self.production.allocate(size),
        }
    }

    fn allocate_zeroed(&self, nelem: usize, elem_size: usize) -> *mut u8 {
        match self.backend() {
            Backend::Boot => self.zeroed_compat(nelem, elem_size),
            Backend::Production => self.production.allocate_zeroed(nelem, elem_size),
        }
    }

    unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        // Boot memory is never handed to the production allocator; it gets copied out instead
        if self.backend() == Backend::Boot || self.owns_boot_memory(ptr) {
            unsafe { self.reallocate_compat(ptr, size) }
        } else {
            unsafe { self.production.reallocate(ptr, size) }
        }
    }

    fn allocate_aligned(&self, align: usize, size: usize) -> *mut u8 {
        match self.backend() {
            Backend::Boot => self.boot.allocate_aligned(align, size),
            Backend::Production => self.production.allocate_aligned(align, size),
        }
    }

    fn posix_allocate_aligned(&self, memptr: &mut *mut u8, align: usize, size: usize) -> Status {
        match self.backend() {
            Backend::Boot => self.boot.posix_allocate_aligned(memptr, align, size),
            Backend::Production => self.production.posix_allocate_aligned(memptr, align, size),
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        let Some(nonnull) = NonNull::new(ptr) else {
            return;
        };
        if self.backend() == Backend::Boot || self.owns_boot_memory(ptr) {
            unsafe { self.boot.free(nonnull) }
        } else {
            unsafe { self.production.free(ptr) }
        }
    }
}
