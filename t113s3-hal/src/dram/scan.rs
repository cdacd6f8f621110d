//! Geometry auto detection.
//!
//! The rank count and the data bus width are detected with a DQS gate training run on an
//! assumed dual rank device. The row, bank and page geometry is found by writing a pattern to
//! the start of the DRAM and looking for the address bit at which the pattern shows up again.
use core::ops::{Deref, DerefMut, RangeInclusive};

use arbitrary_int::u4;
use embedded_hal::delay::DelayNs;
use t113s3::{SDRAM_BASE, dramc, msi};

use super::{
    DramController, DramError, WaitEvent,
    params::{
        ControlFlags, DramParameters, GeometryPrimary, GeometrySecondary, RankGeometry,
        SCAN_DONE_FLAGS,
    },
};
use crate::mmio::RegisterSpace;

/// Number of pattern words used to detect aliasing.
pub const PATTERN_WORDS: usize = 64;

/// Placeholder geometry used during the rank and width probe: 11 row bits for both ranks.
pub const PROBE_GEOMETRY: u32 = 0x00B0_00B0;

/// Rank count and data bus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankWidth {
    SingleRankFullWidth,
    SingleRankHalfWidth,
    DualRankHalfWidth,
    DualRankFullWidth,
}

impl RankWidth {
    /// Decode the result of a gate training run on an assumed dual rank device.
    pub fn decode(pgsr0: dramc::Pgsr0, dx0_state: u8, dx1_state: u8) -> Result<Self, DramError> {
        // Both ranks on both byte lanes passed.
        if !pgsr0.qs_gate_error() {
            return Ok(RankWidth::DualRankFullWidth);
        }
        match (dx0_state, dx1_state) {
            (dramc::DX_GATE_STATE_SINGLE_RANK, dramc::DX_GATE_STATE_SINGLE_RANK) => {
                Ok(RankWidth::SingleRankFullWidth)
            }
            (dramc::DX_GATE_STATE_SINGLE_RANK, _) => Ok(RankWidth::SingleRankHalfWidth),
            (dramc::DX_GATE_STATE_NONE, _) => Ok(RankWidth::DualRankHalfWidth),
            (dx0, dx1) => Err(DramError::RankWidthDetect { dx0, dx1 }),
        }
    }

    #[inline]
    pub const fn dual_rank(&self) -> bool {
        matches!(
            self,
            RankWidth::DualRankHalfWidth | RankWidth::DualRankFullWidth
        )
    }

    #[inline]
    pub const fn half_width(&self) -> bool {
        matches!(
            self,
            RankWidth::SingleRankHalfWidth | RankWidth::DualRankHalfWidth
        )
    }

    /// Store the result in the rank and width fields.
    pub const fn apply(&self, geometry: GeometrySecondary) -> GeometrySecondary {
        let raw = geometry.raw_value();
        let raw = match self {
            RankWidth::SingleRankFullWidth => raw & 0xFFFF_0FF0,
            RankWidth::SingleRankHalfWidth => (raw & 0xFFFF_0FF0) | 0x1,
            RankWidth::DualRankHalfWidth => (raw & !0xF) | 0x1001,
            RankWidth::DualRankFullWidth => (raw & !0xF) | 0x1000,
        };
        GeometrySecondary::new_with_raw_value(raw)
    }
}

/// Temporary modification of the parameters for a probe run.
///
/// The control flags and the per-rank geometry are restored when the scope is dropped. All other
/// fields keep the values written during the probe.
pub struct ProbeScope<'a> {
    params: &'a mut DramParameters,
    saved_flags: ControlFlags,
    saved_geometry_primary: GeometryPrimary,
}

impl<'a> ProbeScope<'a> {
    pub fn new(params: &'a mut DramParameters) -> Self {
        let saved_flags = params.flags;
        let saved_geometry_primary = params.geometry_primary;
        Self {
            params,
            saved_flags,
            saved_geometry_primary,
        }
    }
}

impl Deref for ProbeScope<'_> {
    type Target = DramParameters;

    fn deref(&self) -> &Self::Target {
        self.params
    }
}

impl DerefMut for ProbeScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.params
    }
}

impl Drop for ProbeScope<'_> {
    fn drop(&mut self) {
        self.params.flags = self.saved_flags;
        self.params.geometry_primary = self.saved_geometry_primary;
    }
}

/// Pattern word at index `index`. Odd words hold the complement of their own address.
#[inline]
pub const fn pattern_word(index: usize) -> u32 {
    let addr = (SDRAM_BASE + 4 * index) as u32;
    if index & 1 != 0 { !addr } else { addr }
}

/// Page size in KB for the first aliasing column bit.
#[inline]
pub const fn page_size_kb(column_bit: u32) -> u8 {
    if column_bit <= 9 {
        0
    } else {
        1 << (column_bit - 10)
    }
}

impl<R: RegisterSpace, D: DelayNs> DramController<R, D> {
    /// Detect the geometry as selected by the control flags.
    ///
    /// On success, the scan done flags are set unless [ControlFlags::keep_scan_flags] is set.
    pub fn auto_scan_config(&mut self, params: &mut DramParameters) -> Result<(), DramError> {
        if !params.flags.skip_rank_width_scan() {
            self.auto_scan_rank_width(params).inspect_err(|e| {
                log::error!("auto scan of the DRAM rank and width failed: {e}");
            })?;
        }
        if !params.flags.skip_auto_scan() {
            self.auto_scan_size(params).inspect_err(|e| {
                log::error!("auto scan of the DRAM size failed: {e}");
            })?;
        }
        if !params.flags.keep_scan_flags() {
            params.flags =
                ControlFlags::new_with_raw_value(params.flags.raw_value() | SCAN_DONE_FLAGS);
        }
        Ok(())
    }

    /// Detect the rank count and the data bus width with a probe mode gate training run.
    ///
    /// Only the rank and width fields of [DramParameters::geometry_secondary] are updated.
    pub fn auto_scan_rank_width(
        &mut self,
        params: &mut DramParameters,
    ) -> Result<RankWidth, DramError> {
        let mut scope = ProbeScope::new(params);
        let verbose = scope.flags.verbose_rank_width();
        scope.geometry_primary = GeometryPrimary::new_with_raw_value(PROBE_GEOMETRY);
        scope.geometry_secondary = GeometrySecondary::new_with_raw_value(
            (scope.geometry_secondary.raw_value() & 0xFFFF_FFF0) | 0x1000,
        );
        // Probe gating mode and no further auto detection.
        scope.flags = ControlFlags::new_with_raw_value((scope.flags.raw_value() & !0x8) | 0x5);

        match self.core_init(&mut scope) {
            // Training errors are evaluated below.
            Ok(()) | Err(DramError::ZqCalibration) => (),
            Err(e) => return Err(e),
        }

        let pgsr0 = dramc::Pgsr0::new_with_raw_value(self.regs.read32(dramc::PGSR0));
        if pgsr0.zcal_error() {
            log::error!("ZQ calibration error during rank and width detection");
            return Err(DramError::ZqCalibration);
        }
        let dx0 = dramc::DxGsr0::new_with_raw_value(self.regs.read32(dramc::DX0GSR0))
            .gate_state()
            .value();
        let dx1 = dramc::DxGsr0::new_with_raw_value(self.regs.read32(dramc::DX1GSR0))
            .gate_state()
            .value();
        let rank_width = RankWidth::decode(pgsr0, dx0, dx1).inspect_err(|_| {
            if verbose {
                log::error!("DX0 state: {}", dx0);
                log::error!("DX1 state: {}", dx1);
            }
        })?;
        log::debug!("auto scan: {:?}", rank_width);
        scope.geometry_secondary = rank_width.apply(scope.geometry_secondary);
        Ok(rank_width)
    }

    /// Detect the row, bank and page geometry of each rank.
    pub fn auto_scan_size(&mut self, params: &mut DramParameters) -> Result<(), DramError> {
        self.core_init(params)?;

        let ranks = if params.geometry_secondary.raw_value() & 0xF000 != 0 {
            2
        } else {
            1
        };

        for i in 0..PATTERN_WORDS {
            self.regs.write32(SDRAM_BASE + 4 * i, pattern_word(i));
        }

        let mut work_mode = msi::WORK_MODE0;
        for rank in 0..ranks {
            self.set_work_mode_checked(work_mode, msi::ROW_SCAN_KEEP_MASK, msi::ROW_SCAN_MODE)?;
            let row_bits = self
                .first_alias(11..=16, |i| 1 << (i + 11))
                .unwrap_or(16);
            log::debug!("auto scan: rank {} row = {}", rank, row_bits);

            if rank == 1 {
                self.regs.masked_set_bits32(
                    msi::WORK_MODE0,
                    msi::GEOMETRY_KEEP_MASK,
                    msi::BANK_SCAN_MODE.raw_value(),
                );
            }
            self.set_work_mode_checked(work_mode, msi::GEOMETRY_KEEP_MASK, msi::BANK_SCAN_MODE)?;
            // BA2 is the first bit above the scan rows.
            let bank_code = if self.aliases(1 << 22) { 0 } else { 1 };
            log::debug!("auto scan: rank {} bank = {}", rank, 4 << bank_code);

            if rank == 1 {
                self.regs.masked_set_bits32(
                    msi::WORK_MODE0,
                    msi::GEOMETRY_KEEP_MASK,
                    msi::PAGE_SCAN_MODE.raw_value(),
                );
            }
            self.set_work_mode_checked(work_mode, msi::GEOMETRY_KEEP_MASK, msi::PAGE_SCAN_MODE)?;
            let column_bit = self.first_alias(9..=13, |i| 1 << i).unwrap_or(13);
            let page_size_kb = page_size_kb(column_bit);
            log::debug!("auto scan: rank {} page size = {} KB", rank, page_size_kb);

            params.geometry_primary = params.geometry_primary.with_rank(
                rank,
                RankGeometry {
                    page_size_kb: u4::new(page_size_kb),
                    row_bits: row_bits as u8,
                    bank_code: u4::new(bank_code),
                },
            );

            if rank + 1 < ranks {
                self.prepare_second_rank_scan();
                work_mode = msi::WORK_MODE1;
            }
        }

        if ranks == 2 {
            let equal = params.geometry_primary.ranks_equal();
            if !equal {
                log::debug!("rank 1 geometry differs from rank 0");
            }
            params.geometry_secondary = GeometrySecondary::new_with_raw_value(
                params.geometry_secondary.raw_value() & 0xFFFF_F0FF,
            )
            .with_asymmetric_ranks(!equal);
        }
        Ok(())
    }

    /// Hardware-empirical, purpose unconfirmed: puts the work mode registers of the second
    /// interface instance into the row scan mode.
    fn prepare_second_rank_scan(&mut self) {
        for addr in [msi::ALT_WORK_MODE0, msi::ALT_WORK_MODE1] {
            self.regs.masked_set_bits32(
                addr,
                msi::GEOMETRY_KEEP_MASK,
                msi::ROW_SCAN_MODE.raw_value(),
            );
        }
    }

    fn set_work_mode_checked(
        &mut self,
        addr: usize,
        keep_mask: u32,
        mode: msi::WorkMode,
    ) -> Result<(), DramError> {
        let value = (self.regs.read32(addr) & keep_mask) | mode.raw_value();
        self.regs.write32(addr, value);
        self.poll(WaitEvent::WorkModeReadback, addr, |v| v == value)
            .map(|_| ())
    }

    /// The pattern is visible at `offset` bytes from the DRAM start.
    fn aliases(&mut self, offset: usize) -> bool {
        (0..PATTERN_WORDS)
            .all(|i| self.regs.read32(SDRAM_BASE + offset + 4 * i) == pattern_word(i))
    }

    /// First candidate whose offset aliases with the pattern.
    fn first_alias(
        &mut self,
        candidates: RangeInclusive<u32>,
        offset: impl Fn(u32) -> usize,
    ) -> Option<u32> {
        candidates.into_iter().find(|&i| self.aliases(offset(i)))
    }
}
