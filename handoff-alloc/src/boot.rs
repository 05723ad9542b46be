//! Boot-time allocation from the region that follows the handle metadata
use alloc_abi::{check_posix_alignment, Status};
use core::ptr::{self, NonNull};
use log::{debug, info};
use region_alloc::RegionAllocator;
use spin::Mutex;

/// Usage of the boot region
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BootStats {
    /// Size of the boot region in bytes
    pub capacity: usize,
    /// Bytes handed out so far, bookkeeping included
    pub used: usize,
}

pub(crate) struct BootRegion {
    // Bounds never change, so `owns` doesn't need the lock
    start: usize,
    end: usize,
    region: Mutex<RegionAllocator>,
}

impl BootRegion {
    // SAFETY: same contract as `RegionAllocator::new`
    pub(crate) unsafe fn new(base: *mut u8, len: usize) -> Self {
        let start = base as usize;
        Self {
            start,
            end: start.saturating_add(len),
            region: Mutex::new(unsafe { RegionAllocator::new(base, len) }),
        }
    }

    pub(crate) fn allocate(&self, size: usize) -> *mut u8 {
        debug!("allocating {size} from region allocator");
        self.region
            .lock()
            .allocate(size)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    pub(crate) fn allocate_aligned(&self, align: usize, size: usize) -> *mut u8 {
        debug!("allocating {size} aligned at {align} from region allocator");
        self.region
            .lock()
            .allocate_aligned(align, size)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    pub(crate) fn posix_allocate_aligned(
        &self,
        memptr: &mut *mut u8,
        align: usize,
        size: usize,
    ) -> Status {
        let status = match check_posix_alignment(align) {
            Err(status) => status,
            Ok(()) => match NonNull::new(self.allocate_aligned(align, size)) {
                Some(ptr) => {
                    *memptr = ptr.as_ptr();
                    Status::Ok
                }
                None => Status::OutOfMemory,
            },
        };
        if !status.is_ok() {
            debug!("posix_memalign of {size} aligned at {align} from region allocator: {status}");
        }
        status
    }

    // SAFETY: `ptr` must come from this region
    pub(crate) unsafe fn free(&self, ptr: NonNull<u8>) {
        let size = unsafe { self.region.lock().deallocate(ptr) };
        info!("attempt to free memory during early boot time ({size} bytes not reclaimed)");
    }

    // SAFETY: `ptr` must come from this region
    pub(crate) unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        unsafe { self.region.lock().usable_size(ptr) }
    }

    pub(crate) fn owns(&self, ptr: *const u8) -> bool {
        (self.start..self.end).contains(&(ptr as usize))
    }

    pub(crate) fn largest_block(&self, align: usize) -> usize {
        self.region.lock().largest_block(align)
    }

    pub(crate) fn stats(&self) -> BootStats {
        let region = self.region.lock();
        BootStats {
            capacity: region.capacity(),
            used: region.used(),
        }
    }
}
