//! Process-wide instance bookkeeping
//!
//! The production allocator keeps static internal state, so at most one [crate::Handoff] may
//! live per process. An [InstanceSlot] is claimed exactly once and then tracks the life of the
//! handle built on it. It is never released.
use crate::gate::Phase;
use core::sync::atomic::{AtomicU8, Ordering};

static PROCESS_SLOT: InstanceSlot = InstanceSlot::new();

/// Claim token and lifecycle state of one handle
#[derive(Debug, Default)]
pub struct InstanceSlot {
    phase: AtomicU8,
}

impl InstanceSlot {
    /// An unclaimed slot
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Uninitialized as u8),
        }
    }

    /// The slot used by [crate::Handoff::init]
    pub fn process() -> &'static Self {
        &PROCESS_SLOT
    }

    /// Current phase of the handle built on this slot
    pub fn phase(&self) -> Phase {
        Phase::from_raw(self.phase.load(Ordering::Acquire))
    }

    /// True once a handle has been built on this slot
    pub fn is_claimed(&self) -> bool {
        self.phase() != Phase::Uninitialized
    }

    /// Claim the slot for a new handle
    ///
    /// Only one caller ever gets `true`.
    pub(crate) fn claim(&self) -> bool {
        self.advance(Phase::Uninitialized, Phase::Booting)
    }

    /// Move from `from` to `to` if nobody beat us to it
    pub(crate) fn advance(&self, from: Phase, to: Phase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Make `to` visible to every context. Used once the new state is fully in place.
    pub(crate) fn publish(&self, to: Phase) {
        self.phase.store(to as u8, Ordering::Release);
    }
}

/// Phase of the process-wide handle
pub fn process_phase() -> Phase {
    PROCESS_SLOT.phase()
}
