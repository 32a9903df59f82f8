//! RAONTECH mtv818 T-DMB Demodulator Library
//!
//! Control of the T-DMB/DAB demodulator in the mtv818 mobile TV chipset:
//! sub-channel decode slots, ensemble scanning, signal quality metrics and
//! Fast Information Channel reads. The chip is reached through a
//! board-supplied register bus, so the same driver runs on a Cortex-M
//! host or under a Linux-style platform layer.
//!
//! # Architecture
//!
//! The library is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DRIVER LAYER                            │
//! │  Tdmb: lock, channel-changing flags, per-chip state          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    DEMODULATOR LOGIC                         │
//! │  Sub-channels  │  Scan  │  Quality  │  FIC  │  Bring-up      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  REGISTER / HAL LAYER                        │
//! │  PagedBus  │  RegisterBus (board)  │  RfTuner (board)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Owned state**: every chip's bookkeeping lives in the driver value
//! - **Type-driven design**: typed bitsets, chip indices and scan verdicts
//! - **No unsafe code**
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the logging macros are visible to later modules
#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_time;

/// System configuration and constants
pub mod config;

/// Driver errors
pub mod error;

/// Hardware Abstraction Layer
///
/// Register transport and RF tuner traits implemented by the board.
pub mod hal;

/// T-DMB demodulator driver
pub mod tdmb;

/// Shared types used across modules
pub mod types;

pub use error::{Error, TdmbResult, TunerError};
pub use tdmb::{ScanOutcome, ScanReject, Tdmb};

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::error::{Error, TdmbResult, TunerError};
    pub use crate::hal::{Page, RegisterBus, RfTuner};
    pub use crate::tdmb::{ScanOutcome, ScanReject, SubChannelRegistration, Tdmb};
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::delay::DelayNs;

    // Locking: NoopRawMutex for single-executor firmware, the lock spans delays
    pub use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};

    // Embassy
    #[cfg(feature = "embedded")]
    pub use embassy_time::Delay;
}
