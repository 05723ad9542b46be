//! Boot-time to production allocator handoff
//!
//! A [Handoff] serves allocations from a fixed boot region until the calling context reports
//! thread-local storage. The first allocation that sees a ready context sets up the production
//! allocator and rebinds every operation to it, exactly once.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod adapter;
mod boot;
pub mod config;
pub mod errors;
mod facade;
mod gate;
pub mod probe;
pub mod singleton;
#[cfg(test)]
mod test_support;
pub mod util;

pub use crate::{
    adapter::ProductionAllocator,
    boot::BootStats,
    errors::{HandoffError, HandoffResult},
    facade::Handoff,
    gate::Phase,
    probe::{ContextProbe, TlsSwitch},
    singleton::{process_phase, InstanceSlot},
};
#[cfg(feature = "talc")]
pub use crate::adapter::talc::TalcAdapter;
pub use alloc_abi::{RawAllocator, Status};
