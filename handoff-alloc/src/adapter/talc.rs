//! Production allocator backed by the `talc` crate
//!
//! Talc wants a [Layout] back on free, while the handle's interface only passes a pointer, so
//! every block carries a small prefix recording how it was allocated.
use crate::{
    adapter::{ArenaSource, ProductionAllocator},
    config::{DEFAULT_ARENA_SIZE, PAGE_SIZE},
    errors::{HandoffError, HandoffResult},
    util::{align_down, checked_align_up},
};
use alloc_abi::{check_posix_alignment, RawAllocator, Status};
use core::{
    alloc::{GlobalAlloc, Layout},
    mem,
    ptr,
};
use log::{info, warn};
use spin::Once;
use talc::{ErrOnOom, Span, Talc, Talck};

// Minimum alignment of every block
const MIN_ALIGN: usize = 16;

// Stored right before the returned pointer
#[derive(Copy, Clone, Debug)]
struct Prefix {
    // Distance from the start of the talc block to the returned pointer
    offset: usize,
    // Size of the talc block
    size: usize,
    align: usize,
}

impl Prefix {
    const SIZE: usize = mem::size_of::<Prefix>();

    fn layout(self) -> Layout {
        // SAFETY: checked when the block was allocated
        unsafe { Layout::from_size_align_unchecked(self.size, self.align) }
    }

    // SAFETY: `data` must have been returned by `TalcAdapter::allocate_inner`
    unsafe fn read(data: *const u8) -> Self {
        unsafe { (data.sub(Self::SIZE) as *const Self).read() }
    }

    // SAFETY: `data - SIZE` must be inside the block and word-aligned
    unsafe fn write(self, data: *mut u8) {
        unsafe { (data.sub(Self::SIZE) as *mut Self).write(self) }
    }
}

/// Talc behind the handle's malloc-style interface
pub struct TalcAdapter {
    talc: Talck<spin::Mutex<()>, ErrOnOom>,
    arena_size: usize,
    // (base, size) of the claimed arena
    arena: Once<(usize, usize)>,
}

impl TalcAdapter {
    /// Adapter that asks for [DEFAULT_ARENA_SIZE] at setup
    pub const fn new() -> Self {
        Self::with_arena_size(DEFAULT_ARENA_SIZE)
    }

    /// Adapter that asks for `arena_size` bytes at setup
    pub const fn with_arena_size(arena_size: usize) -> Self {
        Self {
            talc: Talc::new(ErrOnOom).lock(),
            arena_size,
            arena: Once::new(),
        }
    }

    /// Base and size of the arena, once set up
    pub fn arena(&self) -> Option<(*const u8, usize)> {
        self.arena
            .get()
            .map(|&(base, size)| (base as *const u8, size))
    }

    fn allocate_inner(&self, align: usize, size: usize) -> *mut u8 {
        let align = align.max(MIN_ALIGN);
        let Some(offset) = checked_align_up(Prefix::SIZE, align) else {
            return ptr::null_mut();
        };
        let Some(total) = offset.checked_add(size) else {
            return ptr::null_mut();
        };
        let Ok(layout) = Layout::from_size_align(total, align) else {
            return ptr::null_mut();
        };

        // SAFETY: `layout` has non-zero size
        let base = unsafe { self.talc.alloc(layout) };
        if base.is_null() {
            return base;
        }
        // SAFETY: `offset <= total`, and `data - Prefix::SIZE` is word-aligned inside the block
        unsafe {
            let data = base.add(offset);
            Prefix {
                offset,
                size: total,
                align,
            }
            .write(data);
            data
        }
    }
}

impl Default for TalcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: blocks come from talc, which only hands out memory from the claimed arena
unsafe impl RawAllocator for TalcAdapter {
    fn allocate(&self, size: usize) -> *mut u8 {
        self.allocate_inner(MIN_ALIGN, size)
    }

    fn allocate_zeroed(&self, nelem: usize, elem_size: usize) -> *mut u8 {
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

    unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        if size == 0 {
            unsafe { self.free(ptr) };
            return ptr::null_mut();
        }

        // SAFETY: `ptr` is a live block from `allocate_inner`
        unsafe {
            let prefix = Prefix::read(ptr);
            let Some(total) = prefix.offset.checked_add(size) else {
                return ptr::null_mut();
            };
            if Layout::from_size_align(total, prefix.align).is_err() {
                return ptr::null_mut();
            }
            let base = ptr.sub(prefix.offset);
            let new_base = self.talc.realloc(base, prefix.layout(), total);
            if new_base.is_null() {
                return new_base;
            }
            let data = new_base.add(prefix.offset);
            Prefix {
                size: total,
                ..prefix
            }
            .write(data);
            data
        }
    }

    fn allocate_aligned(&self, align: usize, size: usize) -> *mut u8 {
        if !align.is_power_of_two() {
            return ptr::null_mut();
        }
        self.allocate_inner(align, size)
    }

    fn posix_allocate_aligned(&self, memptr: &mut *mut u8, align: usize, size: usize) -> Status {
        if let Err(status) = check_posix_alignment(align) {
            return status;
        }
        let ptr = self.allocate_inner(align, size);
        if ptr.is_null() {
            return Status::OutOfMemory;
        }
        *memptr = ptr;
        Status::Ok
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: `ptr` is a live block from `allocate_inner`
        unsafe {
            let prefix = Prefix::read(ptr);
            self.talc.dealloc(ptr.sub(prefix.offset), prefix.layout());
        }
    }
}

// SAFETY: `owns` covers the whole claimed arena
unsafe impl ProductionAllocator for TalcAdapter {
    fn min_arena_size(&self) -> usize {
        self.arena_size
    }

    unsafe fn setup(&self, source: &dyn ArenaSource) -> HandoffResult {
        // Take the arena from the boot region, settling for whatever is left if it's short.
        // Boot allocations racing with us can shrink the region between asking and taking.
        let (base, size) = loop {
            let available = align_down::<PAGE_SIZE>(source.largest_block(PAGE_SIZE));
            let size = available.min(self.arena_size);
            if size == 0 {
                return Err(HandoffError::ArenaUnavailable {
                    size: self.arena_size,
                });
            }
            let base = source.allocate_aligned(PAGE_SIZE, size);
            if !base.is_null() {
                break (base, size);
            }
        };
        if size < self.arena_size {
            warn!(
                "talc arena shrunk to {size} bytes ({} requested); large allocations will fail",
                self.arena_size
            );
        }

        // SAFETY: the block is ours for the rest of the program
        unsafe { self.talc.lock().claim(Span::from_base_size(base, size)) }
            .map_err(|()| HandoffError::SetupFailed)?;
        self.arena.call_once(|| (base as usize, size));
        info!("talc arena @ {base:p}, len {size}");
        Ok(())
    }

    fn owns(&self, ptr: *const u8) -> bool {
        self.arena
            .get()
            .is_some_and(|&(base, size)| (base..base + size).contains(&(ptr as usize)))
    }
}
