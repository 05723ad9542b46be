//! Switch from the boot region to the production allocator
//!
//! Every boot-phase `allocate` passes through here. The first call that finds its context ready
//! wins the `Booting -> Transitioning` compare-and-swap, runs production setup and publishes
//! `Production`. Anything that loses the race, or that is nested inside setup, keeps being served
//! by the boot region until `Production` becomes visible.
use crate::{adapter::ProductionAllocator, facade::Handoff, probe::ContextProbe};
use alloc_abi::RawAllocator;
use core::fmt::{self, Display};
use log::{debug, error, info};

/// Lifecycle of a handle
///
/// Only ever moves forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// No handle exists
    Uninitialized = 0,
    /// Served by the boot region
    Booting = 1,
    /// Production setup claimed and underway, or failed for good. Still served by the boot
    /// region.
    Transitioning = 2,
    /// Served by the production allocator
    Production = 3,
}

impl Phase {
    pub(crate) const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Booting,
            2 => Self::Transitioning,
            _ => Self::Production,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Booting => "booting",
            Self::Transitioning => "transitioning",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

impl<P: ProductionAllocator, R: ContextProbe> Handoff<P, R> {
    /// Boot-phase `allocate`
    pub(crate) fn gated_allocate(&self, size: usize) -> *mut u8 {
        let ready = self.probe().current_context_ready();
        if ready && self.slot().advance(Phase::Booting, Phase::Transitioning) {
            debug!("leaving early boot-time allocation mode");
            if self.transition() {
                // Serve the triggering request through the rebound table
                return self.allocate(size);
            }
        }

        self.boot().allocate(size)
    }

    // Caller must have won `Booting -> Transitioning`
    fn transition(&self) -> bool {
        // SAFETY: only the winner of the compare-and-swap gets here, so this runs once
        match unsafe { self.production().setup(self) } {
            Ok(()) => {
                self.slot().publish(Phase::Production);
                info!("Successfully initialized production allocator");
                true
            }
            Err(err) => {
                self.mark_setup_failed();
                error!("{err}; staying on the boot-time allocator");
                false
            }
        }
    }
}
