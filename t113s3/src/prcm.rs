//! Always-on R_PRCM and RTC registers touched during DRAM bring-up.

pub const RTC_BASE_ADDR: usize = 0x0700_0000;
pub const R_PRCM_BASE_ADDR: usize = 0x0701_0000;

/// RTC general purpose register which flags the PHY latch workaround.
pub const RTC_DRAM_FLAGS: usize = RTC_BASE_ADDR + 0x5D4;
/// Pad hold / latch control of the DRAM pads.
pub const PAD_HOLD_CTRL: usize = R_PRCM_BASE_ADDR + 0x250;
/// External ZQ resistor calibration control.
pub const RES_CAL_CTRL: usize = R_PRCM_BASE_ADDR + 0x254;

#[bitbybit::bitfield(u32, debug)]
pub struct RtcDramFlags {
    /// Set on silicon which requires the pad latch workaround sequence during PHY init.
    #[bit(16, r)]
    phy_latch_workaround: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PadHoldControl {
    #[bit(1, rw)]
    latch_b: bool,
    #[bit(0, rw)]
    latch_a: bool,
}
