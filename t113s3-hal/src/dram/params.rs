//! DRAM configuration record.
//!
//! The layout follows the parameter block which boards hand to the DRAM bring-up code. The
//! packed fields (geometry, control flags) keep their raw 32-bit encoding because they are
//! copied verbatim into controller registers and persisted by the boot chain.
use arbitrary_int::{u2, u4};

use crate::time::MHz;

/// Supported memory technologies and their type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[repr(u32)]
pub enum DramType {
    Ddr2 = 2,
    Ddr3 = 3,
    Lpddr2 = 6,
    Lpddr3 = 7,
}

impl DramType {
    /// LPDDR devices always use 1T command timing.
    #[inline]
    pub const fn is_lpddr(&self) -> bool {
        matches!(self, DramType::Lpddr2 | DramType::Lpddr3)
    }
}

#[bitbybit::bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq, Eq)]
pub enum DqsGatingMode {
    /// Hardware gate training.
    Auto = 0b00,
    /// Gate training which is evaluated by software, used by the rank and width probe.
    Probe = 0b01,
    /// Fixed gating delay taken from [ControlFlags::fixed_gating_delay].
    Fixed = 0b10,
    /// Handled like [DqsGatingMode::Auto].
    __Reserved = 0b11,
}

/// Flags controlling the whole bring-up algorithm.
///
/// Bits 16..=20 double as the fixed DQS gating delay when [DqsGatingMode::Fixed] is selected, see
/// [ControlFlags::fixed_gating_delay].
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug, PartialEq, Eq)]
pub struct ControlFlags {
    /// Report the lane states when rank and width detection fails.
    #[bit(29, rw)]
    verbose_rank_width: bool,
    /// Run the write/read self test after initialization.
    #[bit(28, rw)]
    self_test: bool,
    /// Any non-zero value forces the remap table used on the reference board.
    #[bits(18..=19, rw)]
    force_remap: u2,
    #[bit(17, rw)]
    skip_vref_init: bool,
    /// Only the internal ZQ resistor is available.
    #[bit(16, rw)]
    internal_zq_only: bool,
    /// Do not mark the geometry as known after a successful auto scan.
    #[bit(15, rw)]
    keep_scan_flags: bool,
    #[bit(14, rw)]
    skip_rank_width_scan: bool,
    #[bit(13, rw)]
    auto_scan_done: bool,
    /// Set the training bits of PGCR0 after initialization.
    #[bit(9, rw)]
    pgcr0_training_bits: bool,
    /// Mirror the ZQ control register into the VT compensation register after initialization.
    #[bit(8, rw)]
    vtf_mirror: bool,
    /// Program the PLL from `tpr[9]` instead of the DRAM clock.
    #[bit(6, rw)]
    pll_clock_from_tpr9: bool,
    /// 1T command timing for DDR2 and DDR3.
    #[bit(5, rw)]
    one_t_timing: bool,
    #[bits(2..=3, rw)]
    dqs_gating_mode: DqsGatingMode,
    /// Unpack the timing parameters from `tpr[0..=2]` instead of computing them.
    #[bit(1, rw)]
    use_timing_overrides: bool,
    /// The geometry is known, skip all auto detection.
    #[bit(0, rw)]
    skip_auto_scan: bool,
}

/// Flags which mark the geometry as known after a successful auto scan.
pub const SCAN_DONE_FLAGS: u32 = 0x6003;

impl ControlFlags {
    /// Fixed DQS gating delay, bits 16..=20.
    #[inline]
    pub const fn fixed_gating_delay(&self) -> u32 {
        (self.raw_value() >> 16) & 0x1F
    }
}

/// Geometry of a single rank as stored in [GeometryPrimary].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankGeometry {
    /// Page size in KB. 0 means 512 bytes.
    pub page_size_kb: u4,
    /// Number of row address bits.
    pub row_bits: u8,
    /// 0 for 4 banks, 1 for 8 banks.
    pub bank_code: u4,
}

impl RankGeometry {
    #[inline]
    pub const fn banks(&self) -> u32 {
        if self.bank_code.value() & 0b1 != 0 {
            8
        } else {
            4
        }
    }
}

/// Per-rank geometry, 16 bits per rank. Also known as `para1`.
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug, PartialEq, Eq)]
pub struct GeometryPrimary {
    #[bits(28..=31, rw)]
    rank1_bank_code: u4,
    #[bits(20..=27, rw)]
    rank1_row_bits: u8,
    #[bits(16..=19, rw)]
    rank1_page_size_kb: u4,
    #[bits(12..=15, rw)]
    rank0_bank_code: u4,
    #[bits(4..=11, rw)]
    rank0_row_bits: u8,
    #[bits(0..=3, rw)]
    rank0_page_size_kb: u4,
}

impl GeometryPrimary {
    /// Geometry of rank 0 for `index == 0`, of rank 1 otherwise.
    pub fn rank(&self, index: usize) -> RankGeometry {
        if index == 0 {
            RankGeometry {
                page_size_kb: self.rank0_page_size_kb(),
                row_bits: self.rank0_row_bits(),
                bank_code: self.rank0_bank_code(),
            }
        } else {
            RankGeometry {
                page_size_kb: self.rank1_page_size_kb(),
                row_bits: self.rank1_row_bits(),
                bank_code: self.rank1_bank_code(),
            }
        }
    }

    pub fn with_rank(&self, index: usize, geometry: RankGeometry) -> Self {
        if index == 0 {
            self.with_rank0_page_size_kb(geometry.page_size_kb)
                .with_rank0_row_bits(geometry.row_bits)
                .with_rank0_bank_code(geometry.bank_code)
        } else {
            self.with_rank1_page_size_kb(geometry.page_size_kb)
                .with_rank1_row_bits(geometry.row_bits)
                .with_rank1_bank_code(geometry.bank_code)
        }
    }

    /// Both ranks use the same geometry.
    #[inline]
    pub const fn ranks_equal(&self) -> bool {
        (self.raw_value() & 0xFFFF) == (self.raw_value() >> 16)
    }
}

/// Rank, width and capacity information. Also known as `para2`.
#[bitbybit::bitfield(u32, default = 0x0)]
#[derive(Debug, PartialEq, Eq)]
pub struct GeometrySecondary {
    /// The capacity field holds a preset value which is used as is.
    #[bit(31, rw)]
    capacity_preset: bool,
    /// Total capacity in MB.
    #[bits(16..=30, rw)]
    capacity_mb: arbitrary_int::u15,
    /// 0 for a single rank, 1 for two ranks. Copied into the work mode registers.
    #[bits(12..=15, rw)]
    rank_code: u4,
    /// The second rank uses a different geometry than the first one.
    #[bit(8, rw)]
    asymmetric_ranks: bool,
    /// 8 bit data bus.
    #[bit(0, rw)]
    half_dq: bool,
}

impl GeometrySecondary {
    #[inline]
    pub fn rank_count(&self) -> u32 {
        if self.rank_code().value() != 0 { 2 } else { 1 }
    }

    /// Store a computed capacity. This also clears the preset flag.
    #[inline]
    pub const fn with_computed_capacity(&self, size_mb: u32) -> Self {
        Self::new_with_raw_value((self.raw_value() & 0xFFFF) | (size_mb << 16))
    }
}

/// Board supplied DRAM parameters.
///
/// The bring-up refines the geometry, mode register and clock fields in place. The updated
/// record can be persisted to skip auto detection on the next boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramParameters {
    /// DRAM clock in MHz. Updated with the achieved clock after the PLL was programmed.
    pub clock_mhz: u32,
    /// Raw type code, see [DramType]. Unknown codes select a conservative fallback timing.
    pub dram_type: u32,
    pub zq: u32,
    pub odt_en: u32,
    pub geometry_primary: GeometryPrimary,
    pub geometry_secondary: GeometrySecondary,
    /// MR0 to MR3. A value with zero upper 16 bits is filled by the timing derivation.
    pub mode_registers: [u32; 4],
    /// Timing and tuning parameters `tpr0` to `tpr12`.
    ///
    /// - `tpr[0..=2]`: packed timing values, see [super::timing::DerivedTiming::from_packed].
    /// - `tpr[4]`: work mode extension bits and refresh interval selection.
    /// - `tpr[5]`, `tpr[6]`: Vref values for IOCVR0 and IOCVR1.
    /// - `tpr[9]`: alternative PLL clock.
    /// - `tpr[10]` to `tpr[12]`: eye delay compensation nibbles.
    pub tpr: [u32; 13],
    /// Also known as `tpr13`.
    pub flags: ControlFlags,
}

impl DramParameters {
    /// Known good parameters for the DDR3 device used with the T113-S3.
    pub const fn t113s3_ddr3() -> Self {
        Self {
            clock_mhz: 792,
            dram_type: DramType::Ddr3 as u32,
            zq: 0x007B_7BFB,
            odt_en: 0x01,
            geometry_primary: GeometryPrimary::new_with_raw_value(0x10D2),
            geometry_secondary: GeometrySecondary::new_with_raw_value(0x0000),
            mode_registers: [0x1C70, 0x42, 0x18, 0x00],
            tpr: [
                0x004A_2195,
                0x0242_3190,
                0x0008_B061,
                0xB478_7896,
                0x0,
                0x4848_4848,
                0x48,
                0x1620_121E,
                0x0,
                0x0,
                0x0,
                0x0034_0000,
                0x46,
            ],
            flags: ControlFlags::new_with_raw_value(0x3400_0100),
        }
    }

    /// Typed memory technology, [None] for unknown type codes.
    #[inline]
    pub fn technology(&self) -> Option<DramType> {
        DramType::try_from(self.dram_type).ok()
    }

    #[inline]
    pub fn clock(&self) -> MHz {
        MHz::from_raw(self.clock_mhz)
    }
}
