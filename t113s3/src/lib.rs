//! # PAC for the DRAM subsystem of the Allwinner T113-S3
//!
//! Register addresses and register layouts of the blocks which take part in DRAM bring-up:
//!
//! - [ccu]: DDR PLL, MBUS and DRAM clock/reset control.
//! - [sys_cfg]: LDO voltage and ZQ pad configuration.
//! - [sid]: eFuse values (LDO calibration, DDR eFuse type, mark ID).
//! - [prcm]: always-on R_PRCM and RTC registers.
//! - [msi]: memory system interface ("mctl_com") with work mode, master enable and address
//!   remap registers.
//! - [dramc]: DRAM controller and PHY ("mctl_phy").
//!
//! Only fields which are actually understood are modelled as bitfields. Everything else is
//! exposed as a plain register offset.
#![no_std]

pub mod ccu;
pub mod dramc;
pub mod msi;
pub mod prcm;
pub mod sid;
pub mod sys_cfg;

/// Base address of the DRAM as seen by the CPU.
pub const SDRAM_BASE: usize = 0x4000_0000;
