//! Hardware configuration planner and register programmer for a PDM
//! digital-microphone capture pipeline: clock-divider/CIC/FIR mode
//! search, fixed-point gain planning, and the register write sequences
//! that bring a multi-controller PDM front end online.
//!
//! The public entry point is [`device::Device`]; everything else
//! ([`solver`], [`gain`], [`catalog`], [`registers`]) is exposed so a
//! caller can drive the planning stages independently (e.g. to preview a
//! chosen mode before committing it to hardware).
// `std` is pulled in under `cfg(test)` only, so `proptest` (used by the
// property tests in `solver`/`gain`) and the rest of the std-only test
// harness are available without the library itself depending on an
// allocator.
#![cfg_attr(not(test), no_std)]

pub mod catalog;
pub mod device;
pub mod error;
pub mod fixedpoint;
pub mod gain;
pub mod io;
pub mod registers;
pub mod solver;
pub mod types;

pub use device::{Command, Device, DeviceState};
pub use error::{Error, InvalidReason, Result};
pub use types::{ActivationMap, ChosenMode, HardwareProfile, IoParams, Lr, ModeCandidate, Request, StreamCfg};
