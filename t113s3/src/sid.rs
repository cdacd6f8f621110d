//! Security ID (SID) eFuse block.
use arbitrary_int::u4;

pub const SID_BASE_ADDR: usize = 0x0300_6200;

pub const MARK_ID: usize = SID_BASE_ADDR;
pub const LDO_B_CAL: usize = SID_BASE_ADDR + 0x1C;
pub const DDR_EFUSE: usize = SID_BASE_ADDR + 0x28;

#[bitbybit::bitfield(u32, debug)]
pub struct MarkId {
    #[bits(8..=15, r)]
    mark: u8,
}

#[bitbybit::bitfield(u32, debug)]
pub struct LdoBCalibration {
    #[bits(8..=15, r)]
    value: u8,
}

#[bitbybit::bitfield(u32, debug)]
pub struct DdrEfuse {
    /// Selects the PHY address/command pin remapping of the package.
    #[bits(8..=11, r)]
    ddr_type: u4,
}
