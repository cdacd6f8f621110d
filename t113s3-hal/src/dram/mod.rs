//! # DRAM module
//!
//! Bring-up of the DRAM controller and PHY for DDR2, DDR3, LPDDR2 and LPDDR3 devices.
//!
//! The complete initialization is performed by [DramController::init_dram]:
//!
//!  1. ZQ pad setup and DRAM supply voltage.
//!  2. Optional geometry auto detection ([scan]). This runs partial controller initializations
//!     to find the rank count, the data bus width and the row, bank and page geometry.
//!  3. The final controller and PHY initialization ([ll]), including the timing derivation
//!     ([timing]).
//!  4. Capacity readback, post-init register settings and an optional self test.
//!
//! Hardware polls are bounded by a [PollBudget]. A device which never responds results in a
//! [DramError::Timeout] instead of a hang.
use embedded_hal::delay::DelayNs;
use t113s3::{SDRAM_BASE, dramc, msi, prcm, sid, sys_cfg};

use crate::{clocks::pll::PllConfigCtorError, mmio::RegisterSpace};

pub mod ll;
pub mod memtest;
pub mod params;
pub mod scan;
#[cfg(test)]
pub(crate) mod sim;
pub mod timing;

pub use memtest::MemTestError;
pub use params::{
    ControlFlags, DqsGatingMode, DramParameters, DramType, GeometryPrimary, GeometrySecondary,
    RankGeometry,
};
pub use scan::RankWidth;

/// LDO-B output code programmed for the DRAM supply.
pub const LDO_B_SUPPLY_CODE: u8 = 25;

/// Hardware events which are polled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitEvent {
    PllLock,
    PhyInitDone,
    ControllerNormal,
    /// The controller state field did not reach the given value.
    ControllerState(u8),
    WorkModeReadback,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum DramError {
    #[error("hardware did not respond: {0:?}")]
    Timeout(WaitEvent),
    #[error("ZQ calibration error, check the external 240 ohm resistor")]
    ZqCalibration,
    #[error("rank and width detection failed, DX0 state {dx0}, DX1 state {dx1}")]
    RankWidthDetect { dx0: u8, dx1: u8 },
    #[error("simple write/read test failed: {0}")]
    SelfTest(#[from] MemTestError),
    #[error("self test not possible while the pad latch workaround is active")]
    SelfTestUnavailable,
    #[error("ddr pll configuration error: {0}")]
    Pll(#[from] PllConfigCtorError),
}

/// Maximum number of register reads for a single hardware poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget(pub u32);

impl PollBudget {
    pub const DEFAULT: Self = Self(0x0100_0000);
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// DRAM location and size after a successful initialization.
///
/// Sizes and addresses are 64 bit wide. The geometry encoding allows capacities which reach
/// beyond the 32-bit physical address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramInfo {
    pub size_mb: u32,
    /// First address after the DRAM.
    pub top: u64,
}

impl DramInfo {
    pub const fn new(size_mb: u32) -> Self {
        Self {
            size_mb,
            top: SDRAM_BASE as u64 + ((size_mb as u64) << 20),
        }
    }

    #[inline]
    pub const fn size_bytes(&self) -> u64 {
        (self.size_mb as u64) << 20
    }

    /// The whole DRAM is addressable with 32-bit addresses.
    #[inline]
    pub const fn fits_32bit(&self) -> bool {
        self.top <= 1 << 32
    }
}

/// Driver for the DRAM controller bring-up.
pub struct DramController<R: RegisterSpace, D: DelayNs> {
    regs: R,
    delay: D,
    budget: PollBudget,
}

impl<R: RegisterSpace, D: DelayNs> DramController<R, D> {
    pub fn new(regs: R, delay: D) -> Self {
        Self::new_with_poll_budget(regs, delay, PollBudget::DEFAULT)
    }

    pub fn new_with_poll_budget(regs: R, delay: D, budget: PollBudget) -> Self {
        Self {
            regs,
            delay,
            budget,
        }
    }

    #[inline]
    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn release(self) -> (R, D) {
        (self.regs, self.delay)
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Read the register at `addr` until `done` returns true or the budget is exhausted.
    fn poll(
        &mut self,
        event: WaitEvent,
        addr: usize,
        mut done: impl FnMut(u32) -> bool,
    ) -> Result<u32, DramError> {
        for _ in 0..self.budget.0 {
            let value = self.regs.read32(addr);
            if done(value) {
                return Ok(value);
            }
            core::hint::spin_loop();
        }
        Err(DramError::Timeout(event))
    }

    /// Complete DRAM initialization. Returns the DRAM capacity in MB.
    ///
    /// The parameters are updated with the detected geometry, the achieved clock and the derived
    /// timing values.
    pub fn init_dram(&mut self, params: &mut DramParameters) -> Result<u32, DramError> {
        self.zq_setup(params);
        self.voltage_set(params);

        if !params.flags.skip_auto_scan() {
            self.auto_scan_config(params).inspect_err(|e| {
                log::error!("auto scan of the DRAM configuration failed: {e}");
            })?;
        }

        log::info!("DRAM CLK = {} MHz", params.clock_mhz);
        log::info!("DRAM Type = {} (2:DDR2, 3:DDR3, 6:LPDDR2, 7:LPDDR3)", params.dram_type);
        if params.odt_en & 0x1 == 0 {
            log::info!("DRAMC read ODT off");
        } else {
            log::info!("DRAMC ZQ value: {:#x}", params.zq);
        }
        let mr1 = params.mode_registers[1];
        if mr1 & 0x44 == 0 {
            log::info!("DRAM ODT off");
        } else {
            log::info!("DRAM ODT value: {:#x}", mr1);
        }

        self.core_init(params).inspect_err(|e| {
            log::error!("DRAM initialisation error: {e}");
        })?;

        let size_mb = self.capacity(params);
        self.post_init_settings(params);
        self.enable_all_masters();

        if params.flags.self_test() {
            self.self_test(size_mb)?;
        }
        Ok(size_mb)
    }

    /// [Self::init_dram] which also provides the DRAM location.
    pub fn init_dram_info(&mut self, params: &mut DramParameters) -> Result<DramInfo, DramError> {
        self.init_dram(params).map(DramInfo::new)
    }

    fn modify_zq_cal_ctrl(
        &mut self,
        f: impl FnOnce(sys_cfg::ZqCalControl) -> sys_cfg::ZqCalControl,
    ) {
        self.regs.modify32(sys_cfg::ZQ_CAL_CTRL, |v| {
            f(sys_cfg::ZqCalControl::new_with_raw_value(v)).raw_value()
        });
    }

    fn zq_setup(&mut self, params: &DramParameters) {
        if params.flags.internal_zq_only() {
            log::debug!("DRAM only has the internal ZQ resistor");
            self.modify_zq_cal_ctrl(|zq| zq.with_internal_res(true));
            self.regs.write32(sys_cfg::ZQ_RES_CTRL, 0);
            self.delay_us(10);
        } else {
            self.modify_zq_cal_ctrl(|zq| zq.with_cal_enable(false).with_pad_enable(false));
            self.regs
                .write32(prcm::RES_CAL_CTRL, params.flags.raw_value() & (1 << 16));
            self.delay_us(10);
            self.modify_zq_cal_ctrl(|zq| {
                zq.with_internal_res(false)
                    .with_res_bypass(false)
                    .with_pad_enable(true)
            });
            self.delay_us(10);
            self.modify_zq_cal_ctrl(|zq| zq.with_cal_enable(true));
            self.delay_us(20);
            let zq = self.regs.read32(sys_cfg::ZQ_VALUE);
            log::debug!("ZQ value = {:#x}", zq);
        }
    }

    /// Set the DRAM supply voltage and apply the LDO-B eFuse calibration.
    fn voltage_set(&mut self, params: &DramParameters) {
        let nominal: u8 = match params.technology() {
            Some(DramType::Ddr2) => 47,
            Some(DramType::Ddr3) => 25,
            _ => 0,
        };
        // All known boards use the same supply code, independent of the technology.
        let vol = LDO_B_SUPPLY_CODE;
        if nominal != vol {
            log::debug!("LDO-B code {} used instead of {}", vol, nominal);
        }
        self.regs.modify32(sys_cfg::LDO_CTRL, |v| {
            sys_cfg::LdoControl::new_with_raw_value(v)
                .with_ldo_b_bypass(false)
                .with_ldo_b_voltage(vol)
                .raw_value()
        });
        self.delay_us(1);

        let cal = sid::LdoBCalibration::new_with_raw_value(self.regs.read32(sid::LDO_B_CAL));
        let mut cal = cal.value();
        if cal != 0 {
            match params.technology() {
                Some(DramType::Ddr2) => (),
                Some(DramType::Ddr3) => {
                    if cal > 0x20 {
                        cal -= 0x16;
                    }
                }
                _ => cal = 0,
            }
            self.regs.modify32(sys_cfg::LDO_CTRL, |v| {
                sys_cfg::LdoControl::new_with_raw_value(v)
                    .with_ldo_b_voltage(cal)
                    .raw_value()
            });
        }
    }

    /// Total capacity in MB. A preset capacity is used as is, otherwise the capacity is computed
    /// from the work mode registers and stored in the parameters.
    fn capacity(&mut self, params: &mut DramParameters) -> u32 {
        let geometry = params.geometry_secondary;
        if geometry.capacity_preset() {
            return u32::from(geometry.capacity_mb().value());
        }
        let size_mb = self.dram_size();
        log::info!("DRAM size: {} MB", size_mb);
        params.geometry_secondary = geometry.with_computed_capacity(size_mb);
        size_mb
    }

    /// Capacity in MB described by the work mode registers.
    pub fn dram_size(&mut self) -> u32 {
        let wm0 = msi::WorkMode::new_with_raw_value(self.regs.read32(msi::WORK_MODE0));
        let size0 = wm0.rank_size_mb();
        if wm0.rank().value() == 0 {
            return size0;
        }
        let wm1 = msi::WorkMode::new_with_raw_value(self.regs.read32(msi::WORK_MODE1));
        if wm1.rank().value() == 0 {
            // Two identical ranks.
            return 2 * size0;
        }
        size0 + wm1.rank_size_mb()
    }

    fn post_init_settings(&mut self, params: &DramParameters) {
        let flags = params.flags;
        // Disable auto refresh power down and leave self refresh.
        self.regs.clear_bits32(dramc::PWRTMG, 0x0000_FFFF);
        self.regs.clear_bits32(dramc::PWRCTL, 0x1);

        let pgcr0 = self.regs.read32(dramc::PGCR0) & !0xF000;
        if flags.pgcr0_training_bits() {
            self.regs.write32(dramc::PGCR0, pgcr0 | 0x5000);
        } else if params.technology() != Some(DramType::Lpddr2) {
            self.regs.write32(dramc::PGCR0, pgcr0);
        }

        self.regs.set_bits32(dramc::ZQCR, dramc::ZQCR_DONE);
        if flags.vtf_mirror() {
            self.mirror_zqcr_to_vtfcr();
        }

        if flags.internal_zq_only() {
            self.regs.clear_bits32(dramc::PGCR2, 1 << 13);
        } else {
            self.regs.set_bits32(dramc::PGCR2, 1 << 13);
        }

        if params.technology() == Some(DramType::Lpddr3) {
            self.lpddr3_dramtmg9_setting();
        }
    }

    /// Hardware-empirical, purpose unconfirmed: copies ZQCR with bits 8 and 9 set into VTFCR.
    fn mirror_zqcr_to_vtfcr(&mut self) {
        let zqcr = self.regs.read32(dramc::ZQCR);
        self.regs.write32(dramc::VTFCR, zqcr | 0x300);
    }

    /// Hardware-empirical, purpose unconfirmed.
    fn lpddr3_dramtmg9_setting(&mut self) {
        self.regs
            .masked_set_bits32(dramc::DRAMTMG9, 0xFFF0_FFFF, 0x0000_1000);
    }

    pub(crate) fn enable_all_masters(&mut self) {
        self.regs.write32(msi::MASTER_EN0, 0xFFFF_FFFF);
        self.regs.write32(msi::MASTER_EN1, 0xFF);
        self.regs.write32(msi::MASTER_EN2, 0xFFFF);
        self.delay_us(10);
    }

    pub(crate) fn disable_all_masters(&mut self) {
        self.regs.write32(msi::MASTER_EN0, 1);
        self.regs.write32(msi::MASTER_EN1, 0);
        self.regs.write32(msi::MASTER_EN2, 0);
        self.delay_us(10);
    }

    fn self_test(&mut self, size_mb: u32) -> Result<(), DramError> {
        let flags =
            prcm::RtcDramFlags::new_with_raw_value(self.regs.read32(prcm::RTC_DRAM_FLAGS));
        if flags.phy_latch_workaround() {
            log::error!("DRAM self test not possible with the pad latch workaround active");
            return Err(DramError::SelfTestUnavailable);
        }
        match memtest::simple_write_read_test(&mut self.regs, size_mb, memtest::SIMPLE_TEST_WORDS) {
            Ok(()) => {
                log::info!("DRAM simple test OK");
                Ok(())
            }
            Err(e) => {
                log::error!("DRAM simple test FAIL: {e}");
                Err(e.into())
            }
        }
    }
}

/// Initialize the DRAM, returning the capacity in MB or 0 on failure.
///
/// The error is logged. Callers are expected to halt or reset the system on failure.
pub fn init_dram_or_zero<R: RegisterSpace, D: DelayNs>(
    ctrl: &mut DramController<R, D>,
    params: &mut DramParameters,
) -> u32 {
    match ctrl.init_dram(params) {
        Ok(size_mb) => size_mb,
        Err(e) => {
            log::error!("DRAM init failed: {e}");
            0
        }
    }
}
