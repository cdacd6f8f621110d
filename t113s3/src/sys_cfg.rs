//! System configuration block: DRAM supply LDO and ZQ pad control.

pub const SYS_CFG_BASE_ADDR: usize = 0x0300_0000;

pub const LDO_CTRL: usize = SYS_CFG_BASE_ADDR + 0x150;
pub const ZQ_CAL_CTRL: usize = SYS_CFG_BASE_ADDR + 0x160;
pub const ZQ_RES_CTRL: usize = SYS_CFG_BASE_ADDR + 0x168;
pub const ZQ_VALUE: usize = SYS_CFG_BASE_ADDR + 0x16C;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct LdoControl {
    #[bit(21, rw)]
    ldo_b_bypass: bool,
    /// LDO B output voltage code used for the DRAM supply.
    #[bits(8..=15, rw)]
    ldo_b_voltage: u8,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct ZqCalControl {
    /// Use the internal ZQ resistor only.
    #[bit(8, rw)]
    internal_res: bool,
    #[bit(3, rw)]
    res_bypass: bool,
    #[bit(1, rw)]
    pad_enable: bool,
    #[bit(0, rw)]
    cal_enable: bool,
}
