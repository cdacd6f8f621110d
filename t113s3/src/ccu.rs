//! Clock control unit (CCU) registers used for the DRAM clock tree.
use arbitrary_int::u2;

pub const CCU_BASE_ADDR: usize = 0x0200_1000;

pub const PLL_CPU_CTRL: usize = CCU_BASE_ADDR;
pub const PLL_DDR_CTRL: usize = CCU_BASE_ADDR + 0x010;
pub const MBUS_CLK: usize = CCU_BASE_ADDR + 0x540;
pub const DRAM_CLK: usize = CCU_BASE_ADDR + 0x800;
pub const DRAM_BGR: usize = CCU_BASE_ADDR + 0x80C;

/// Bit 27 of [PLL_CPU_CTRL] is set after the DDR PLL locked.
pub const PLL_CPU_CTRL_OUTPUT_GATE: u32 = 1 << 27;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PllDdrControl {
    #[bit(31, rw)]
    enable: bool,
    #[bit(30, rw)]
    ldo_enable: bool,
    #[bit(29, rw)]
    lock_enable: bool,
    #[bit(28, r)]
    locked: bool,
    #[bit(27, rw)]
    output_gate: bool,
    /// Reserved bits which must be cleared when the divider is written.
    #[bits(16..=18, rw)]
    reserved: arbitrary_int::u3,
    /// VCO multiplier N minus one. The VCO runs at `24 MHz * N`.
    #[bits(8..=15, rw)]
    n_minus_one: u8,
    #[bit(1, rw)]
    m1: bool,
    #[bit(0, rw)]
    m0: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct MbusClock {
    /// MBUS reset, active low.
    #[bit(30, rw)]
    reset_n: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramClock {
    #[bit(31, rw)]
    gate: bool,
    /// SDRAM domain reset, active low.
    #[bit(30, rw)]
    reset_n: bool,
    /// Latches new divider and source settings.
    #[bit(27, rw)]
    update: bool,
    #[bits(24..=25, rw)]
    src_sel: u2,
    #[bits(8..=9, rw)]
    div_n: u2,
    #[bits(0..=1, rw)]
    div_m: u2,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DramBusGateReset {
    /// DRAM bus reset, active low.
    #[bit(16, rw)]
    reset_n: bool,
    #[bit(0, rw)]
    gate: bool,
}
