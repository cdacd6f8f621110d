//! # HAL for the DRAM subsystem of the Allwinner T113-S3
//!
//! This crate sits on top of the [t113s3] register definitions and implements the boot-time
//! bring-up of the DRAM controller and its PHY: clocking, timing derivation, geometry
//! auto-detection, PHY training and a simple post-init memory test.
//!
//! All hardware accesses go through the [mmio::RegisterSpace] trait. On the target, the
//! [mmio::Mmio] implementation performs volatile accesses to the absolute register addresses.
//! The delay primitive is any [embedded_hal::delay::DelayNs] implementation.
//!
//! ## Example
//!
//! ```no_run
//! use t113s3_hal::{dram, mmio::Mmio};
//!
//! fn bring_up_dram(delay: impl embedded_hal::delay::DelayNs) -> u32 {
//!     // Safety: The DRAM subsystem is only configured once during boot.
//!     let regs = unsafe { Mmio::steal() };
//!     let mut ctrl = dram::DramController::new(regs, delay);
//!     let mut params = dram::DramParameters::t113s3_ddr3();
//!     dram::init_dram_or_zero(&mut ctrl, &mut params)
//! }
//! ```
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod clocks;
pub mod dram;
pub mod mmio;
pub mod time;

pub use t113s3 as pac;
