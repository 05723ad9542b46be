//! Readiness of the calling execution context
//!
//! The handoff only needs one bit from the thread subsystem: whether the current context has its
//! thread-local storage in place.
use core::sync::atomic::{AtomicBool, Ordering};

/// Tells whether the calling context has thread-local storage
pub trait ContextProbe: Sync {
    /// True once the current context has private thread-local storage
    fn current_context_ready(&self) -> bool;
}

impl ContextProbe for fn() -> bool {
    fn current_context_ready(&self) -> bool {
        self()
    }
}

/// A readiness flag flipped by whoever installs thread-local storage
#[derive(Debug, Default)]
pub struct TlsSwitch(AtomicBool);

impl TlsSwitch {
    /// A switch that starts out not ready
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Report thread-local storage as installed. There is no way back.
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl ContextProbe for TlsSwitch {
    fn current_context_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
