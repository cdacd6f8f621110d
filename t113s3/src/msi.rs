//! Memory system interface (MSI), also known as `mctl_com`.
//!
//! Holds the per-rank work mode registers which describe the DRAM geometry to the address
//! decoder, the bus master enables and the PHY address/command remap registers.
use arbitrary_int::{u2, u3, u4};

pub const MSI_BASE_ADDR: usize = 0x0310_2000;

pub const WORK_MODE0: usize = MSI_BASE_ADDR;
pub const WORK_MODE1: usize = MSI_BASE_ADDR + 0x004;
pub const MC_R1: usize = MSI_BASE_ADDR + 0x008;
pub const MC_CLK_DIV: usize = MSI_BASE_ADDR + 0x00C;
pub const MC_R5: usize = MSI_BASE_ADDR + 0x014;
pub const MASTER_EN0: usize = MSI_BASE_ADDR + 0x020;
pub const MASTER_EN1: usize = MSI_BASE_ADDR + 0x024;
pub const MASTER_EN2: usize = MSI_BASE_ADDR + 0x028;
pub const REMAP0: usize = MSI_BASE_ADDR + 0x500;
pub const REMAP1: usize = MSI_BASE_ADDR + 0x504;
pub const REMAP2: usize = MSI_BASE_ADDR + 0x508;
pub const REMAP3: usize = MSI_BASE_ADDR + 0x50C;

/// Work mode registers of a second interface instance. The size scan programs these when it
/// advances to the second rank.
pub const ALT_WORK_MODE0: usize = 0x0320_2000;
pub const ALT_WORK_MODE1: usize = 0x0320_2004;

/// Bit commiting the remap configuration when written to [REMAP0].
pub const REMAP0_COMMIT: u32 = 1;

/// Fields cleared before the row scan mode is programmed.
pub const ROW_SCAN_KEEP_MASK: u32 = 0xFFFF_F0F3;
/// Fields cleared before the bank and page scan modes are programmed.
pub const GEOMETRY_KEEP_MASK: u32 = 0xFFFF_F003;

/// Maximum row address width with 4 banks and a 512 byte page, used to scan the row count.
pub const ROW_SCAN_MODE: WorkMode = WorkMode::new_with_raw_value(0)
    .with_page_code(u4::new(6))
    .with_row_bits_minus_one(u4::new(0xF))
    .with_bank_code(u2::new(0));
/// 8 banks, 11 rows and a 512 byte page. BA2 ends up at address bit 22.
pub const BANK_SCAN_MODE: WorkMode = WorkMode::new_with_raw_value(0)
    .with_page_code(u4::new(6))
    .with_row_bits_minus_one(u4::new(0xA))
    .with_bank_code(u2::new(1));
/// 8 KB page, 11 rows and 4 banks, used to scan the column address width.
pub const PAGE_SCAN_MODE: WorkMode = WorkMode::new_with_raw_value(0)
    .with_page_code(u4::new(0xA))
    .with_row_bits_minus_one(u4::new(0xA))
    .with_bank_code(u2::new(0));

static_assertions::const_assert_eq!(ROW_SCAN_MODE.raw_value(), 0x6F0);
static_assertions::const_assert_eq!(BANK_SCAN_MODE.raw_value(), 0x6A4);
static_assertions::const_assert_eq!(PAGE_SCAN_MODE.raw_value(), 0xAA0);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct WorkMode {
    /// Board specific extension bits, taken from bits 0..=1 of `tpr4`.
    #[bits(25..=26, rw)]
    tpr4_cfg: u2,
    #[bit(22, rw)]
    enable: bool,
    /// 1T command timing. LPDDR2 and LPDDR3 always use 1T.
    #[bit(19, rw)]
    one_t_timing: bool,
    #[bits(16..=18, rw)]
    dram_type: u3,
    /// Cleared for a half-width (8 bit) data bus.
    #[bit(12, rw)]
    full_dq: bool,
    /// Column address width minus 3, in bytes: page size `2^(code + 3)`.
    #[bits(8..=11, rw)]
    page_code: u4,
    #[bits(4..=7, rw)]
    row_bits_minus_one: u4,
    /// Bank address width minus 2.
    #[bits(2..=3, rw)]
    bank_code: u2,
    /// 0 for a single rank, 1 for two ranks.
    #[bits(0..=1, rw)]
    rank: u2,
}

impl WorkMode {
    /// Size in MB addressed by this work mode for a single rank.
    pub fn rank_size_mb(&self) -> u32 {
        let bits = u32::from(self.page_code().value())
            + u32::from(self.row_bits_minus_one().value())
            + u32::from(self.bank_code().value());
        // 1 MB is 20 address bits, the fields above are offset by 3 + 1 + 2.
        1 << bits.saturating_sub(14)
    }
}
