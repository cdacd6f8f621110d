//! # Clock module
//!
//! Only the part of the clock tree which feeds the DRAM controller is handled here. The rest of
//! the clock tree is expected to be configured by the boot stage before DRAM bring-up.
use crate::time::MegaHertz;

pub mod pll;

/// Frequency of the main crystal oscillator.
pub const HOSC: MegaHertz = MegaHertz::from_raw(24);
