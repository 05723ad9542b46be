// Helpers shared by unit tests
use crate::{
    adapter::{ArenaSource, ProductionAllocator},
    config::PAGE_SIZE,
    errors::HandoffError,
    HandoffResult, InstanceSlot,
};
use alloc_abi::{check_posix_alignment, RawAllocator, Status};
use core::{
    cell::RefCell,
    ptr::{self, NonNull},
    sync::atomic::{AtomicUsize, Ordering},
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use region_alloc::RegionAllocator;
use spin::{Mutex, Once};
use std::alloc::{alloc_zeroed, Layout};

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

// Keeps records from the thread that asked for them, so parallel tests don't mix
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let _ = CAPTURED.try_with(|captured| {
            if let Some(lines) = captured.borrow_mut().as_mut() {
                lines.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and collect everything it logs on this thread
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<(Level, String)>) {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let rv = f();
    let lines = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    (rv, lines)
}

/// True if some line at `level` contains `needle`
pub fn logged(lines: &[(Level, String)], level: Level, needle: &str) -> bool {
    lines
        .iter()
        .any(|(line_level, line)| *line_level == level && line.contains(needle))
}

/// Page-aligned host memory that lives for the rest of the test run
pub fn extent(len: usize) -> *mut u8 {
    let layout = Layout::from_size_align(len.max(1), PAGE_SIZE).unwrap();
    let base = unsafe { alloc_zeroed(layout) };
    assert!(!base.is_null());
    base
}

/// A slot of our own, so tests don't fight over the process-wide one
pub fn slot() -> &'static InstanceSlot {
    Box::leak(Box::new(InstanceSlot::new()))
}

/// Production allocator that counts what happens to it
///
/// Its arena comes from the handle at setup time, just like the real thing. `PAD` bloats the
/// type to test metadata that doesn't fit.
pub struct MockProduction<const PAD: usize = 0> {
    min_arena: usize,
    arena_size: usize,
    nested: bool,
    region: Mutex<Option<RegionAllocator>>,
    arena: Once<(usize, usize)>,
    pub setups: AtomicUsize,
    pub calls: AtomicUsize,
    pub nested_ptr: AtomicUsize,
    _pad: [u8; PAD],
}

impl<const PAD: usize> MockProduction<PAD> {
    pub fn new(arena_size: usize) -> Self {
        Self {
            min_arena: arena_size,
            arena_size,
            nested: false,
            region: Mutex::new(None),
            arena: Once::new(),
            setups: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            nested_ptr: AtomicUsize::new(0),
            _pad: [0; PAD],
        }
    }

    /// Also do a plain `allocate` through the handle while setting up
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    pub fn min_arena(mut self, min_arena: usize) -> Self {
        self.min_arena = min_arena;
        self
    }

    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn carve(&self, align: usize, size: usize) -> *mut u8 {
        self.region
            .lock()
            .as_mut()
            .and_then(|region| region.allocate_aligned(align, size).ok())
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}

unsafe impl<const PAD: usize> RawAllocator for MockProduction<PAD> {
    fn allocate(&self, size: usize) -> *mut u8 {
        self.count();
        self.carve(1, size)
    }

    fn allocate_zeroed(&self, nelem: usize, elem_size: usize) -> *mut u8 {
        self.count();
        let Some(size) = nelem.checked_mul(elem_size) else {
            return ptr::null_mut();
        };
        let ptr = self.carve(1, size);
        if !ptr.is_null() {
            unsafe { ptr.write_bytes(0, size) };
        }
        ptr
    }

    unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        self.count();
        let new = self.carve(1, size);
        if let (Some(old), false) = (NonNull::new(ptr), new.is_null()) {
            let len = unsafe { self.region.lock().as_ref().unwrap().usable_size(old) };
            unsafe { ptr::copy_nonoverlapping(ptr, new, len.min(size)) };
        }
        new
    }

    fn allocate_aligned(&self, align: usize, size: usize) -> *mut u8 {
        self.count();
        self.carve(align, size)
    }

    fn posix_allocate_aligned(&self, memptr: &mut *mut u8, align: usize, size: usize) -> Status {
        self.count();
        if let Err(status) = check_posix_alignment(align) {
            return status;
        }
        match NonNull::new(self.carve(align, size)) {
            Some(ptr) => {
                *memptr = ptr.as_ptr();
                Status::Ok
            }
            None => Status::OutOfMemory,
        }
    }

    unsafe fn free(&self, _ptr: *mut u8) {
        self.count();
    }
}

unsafe impl<const PAD: usize> ProductionAllocator for MockProduction<PAD> {
    fn min_arena_size(&self) -> usize {
        self.min_arena
    }

    unsafe fn setup(&self, source: &dyn ArenaSource) -> HandoffResult {
        self.setups.fetch_add(1, Ordering::SeqCst);
        // Give racing callers a chance to pile up behind us
        std::thread::sleep(std::time::Duration::from_millis(5));

        if self.nested {
            let ptr = source.allocate(64);
            assert!(!ptr.is_null());
            self.nested_ptr.store(ptr as usize, Ordering::SeqCst);
        }

        let base = source.allocate(self.arena_size);
        if base.is_null() {
            return Err(HandoffError::ArenaUnavailable {
                size: self.arena_size,
            });
        }
        *self.region.lock() = Some(unsafe { RegionAllocator::new(base, self.arena_size) });
        self.arena.call_once(|| (base as usize, self.arena_size));
        Ok(())
    }

    fn owns(&self, ptr: *const u8) -> bool {
        self.arena
            .get()
            .is_some_and(|&(base, size)| (base..base + size).contains(&(ptr as usize)))
    }
}
