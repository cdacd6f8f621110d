//! Low-level controller and PHY sequencer.
//!
//! One call of [DramController::core_init] performs a complete controller initialization pass:
//! clocks and resets, Vref/ZQ, the common work mode configuration, the PHY address/command
//! remapping, the timing registers and finally the PHY training handshake.
use arbitrary_int::{u2, u3, u4};
use embedded_hal::delay::DelayNs;
use t113s3::{ccu, dramc, msi, prcm, sid};

use super::{
    DramController, DramError, WaitEvent,
    params::{DqsGatingMode, DramParameters, DramType},
    timing,
};
use crate::{
    clocks::{HOSC, pll::DdrPllConfig},
    mmio::RegisterSpace,
    time::MHz,
};

/// Number of remappable PHY address/command lines.
pub const REMAP_LINES: usize = 22;

pub type RemapTable = [u8; REMAP_LINES];

/// Used for DDR eFuse types 13 and 14.
pub const REMAP_NONE: RemapTable = [0; REMAP_LINES];
pub const REMAP_DEFAULT: RemapTable = [
    1, 9, 3, 7, 8, 18, 4, 13, 5, 6, 10, 2, 14, 12, 0, 0, 21, 17, 20, 19, 11, 22,
];
pub const REMAP_EFUSE_8: RemapTable = [
    4, 9, 3, 7, 8, 18, 1, 13, 2, 6, 10, 5, 14, 12, 0, 0, 21, 17, 20, 19, 11, 22,
];
pub const REMAP_EFUSE_9: RemapTable = [
    1, 7, 8, 12, 10, 18, 4, 13, 5, 6, 3, 2, 9, 0, 0, 0, 21, 17, 20, 19, 11, 22,
];
pub const REMAP_EFUSE_11: RemapTable = [
    4, 12, 10, 7, 8, 18, 1, 13, 2, 6, 3, 5, 9, 0, 0, 0, 21, 17, 20, 19, 11, 22,
];
pub const REMAP_EFUSE_10: RemapTable = [
    13, 2, 7, 9, 12, 19, 5, 1, 6, 3, 4, 8, 10, 0, 0, 0, 21, 22, 18, 17, 11, 20,
];
pub const REMAP_DDR2: RemapTable = [
    3, 10, 7, 13, 9, 11, 1, 2, 4, 6, 8, 5, 12, 0, 0, 0, 20, 1, 0, 21, 22, 17,
];
/// Selected with [super::ControlFlags::force_remap].
pub const REMAP_FORCED: RemapTable = [
    3, 2, 4, 7, 9, 1, 17, 12, 18, 14, 13, 8, 15, 6, 10, 5, 19, 22, 16, 21, 20, 11,
];

/// Remap table for the given parameters and DDR eFuse type. [None] if no remapping is done.
pub fn select_remap_table(params: &DramParameters, efuse_type: u8) -> Option<&'static RemapTable> {
    let table = if params.flags.force_remap().value() != 0 {
        &REMAP_FORCED
    } else {
        match efuse_type {
            8 => &REMAP_EFUSE_8,
            9 => &REMAP_EFUSE_9,
            10 => &REMAP_EFUSE_10,
            11 => &REMAP_EFUSE_11,
            13 | 14 => &REMAP_NONE,
            _ => &REMAP_DEFAULT,
        }
    };
    match params.technology() {
        Some(DramType::Ddr2) if efuse_type == 15 => None,
        Some(DramType::Ddr2) => Some(&REMAP_DDR2),
        Some(DramType::Ddr3) => Some(table),
        _ => None,
    }
}

/// Values of the four remap registers. The commit bit of REMAP0 is not included.
pub fn remap_words(t: &RemapTable) -> [u32; 4] {
    let c = |i: usize| u32::from(t[i]);
    [
        c(4) << 25 | c(3) << 20 | c(2) << 15 | c(1) << 10 | c(0) << 5,
        c(10) << 25 | c(9) << 20 | c(8) << 15 | c(7) << 10 | c(6) << 5 | c(5),
        c(15) << 20 | c(14) << 15 | c(13) << 10 | c(12) << 5 | c(11),
        c(21) << 25 | c(20) << 20 | c(19) << 15 | c(18) << 10 | c(17) << 5 | c(16),
    ]
}

/// Work mode page size code for a page size in KB.
#[inline]
pub const fn page_code(page_size_kb: u8) -> u8 {
    match page_size_kb {
        8 => 0xA,
        4 => 0x9,
        2 => 0x8,
        1 => 0x7,
        _ => 0x6,
    }
}

/// Delay nibble of an IO configuration register.
#[inline]
const fn iocr_delay(word: u32, shift: u32, pos: u32, mask: u32) -> u32 {
    ((word >> shift) << pos) & mask
}

impl<R: RegisterSpace, D: DelayNs> DramController<R, D> {
    /// Complete controller and PHY initialization pass.
    pub fn core_init(&mut self, params: &mut DramParameters) -> Result<(), DramError> {
        self.sys_init(params)?;
        self.vrefzq_init(params);
        self.com_init(params);
        self.phy_ac_remap(params);
        timing::auto_set_timing(&mut self.regs, params);
        self.channel_init(params)
    }

    /// Clocks and resets of the DRAM domain. Updates the DRAM clock with the achieved value.
    fn sys_init(&mut self, params: &mut DramParameters) -> Result<(), DramError> {
        // Assert MBUS reset.
        self.regs.modify32(ccu::MBUS_CLK, |v| {
            ccu::MbusClock::new_with_raw_value(v)
                .with_reset_n(false)
                .raw_value()
        });
        // Turn off the DRAM clock gate and assert the DRAM reset.
        self.regs.modify32(ccu::DRAM_BGR, |v| {
            ccu::DramBusGateReset::new_with_raw_value(v)
                .with_reset_n(false)
                .with_gate(false)
                .raw_value()
        });
        self.regs.modify32(ccu::DRAM_CLK, |v| {
            ccu::DramClock::new_with_raw_value(v)
                .with_gate(false)
                .with_reset_n(false)
                .with_update(true)
                .raw_value()
        });
        self.delay_us(10);

        let pll = self.set_pll_ddr_clk(params)?;
        params.clock_mhz = pll.dram_clock().raw();
        self.delay_us(100);
        self.disable_all_masters();

        // Release the DRAM reset, then the MBUS reset.
        self.regs.modify32(ccu::DRAM_BGR, |v| {
            ccu::DramBusGateReset::new_with_raw_value(v)
                .with_reset_n(true)
                .raw_value()
        });
        self.regs.modify32(ccu::MBUS_CLK, |v| {
            ccu::MbusClock::new_with_raw_value(v)
                .with_reset_n(true)
                .raw_value()
        });
        self.regs.modify32(ccu::DRAM_CLK, |v| {
            ccu::DramClock::new_with_raw_value(v)
                .with_reset_n(true)
                .raw_value()
        });
        self.delay_us(5);

        self.regs.modify32(ccu::DRAM_BGR, |v| {
            ccu::DramBusGateReset::new_with_raw_value(v)
                .with_gate(true)
                .raw_value()
        });
        // Clock gate on and latch the new clock configuration.
        self.regs.modify32(ccu::DRAM_CLK, |v| {
            ccu::DramClock::new_with_raw_value(v)
                .with_gate(true)
                .with_update(true)
                .raw_value()
        });
        self.delay_us(5);

        self.regs.write32(dramc::CLKEN, 0x8000);
        self.delay_us(10);
        Ok(())
    }

    /// Program and lock the DDR PLL.
    fn set_pll_ddr_clk(&mut self, params: &DramParameters) -> Result<DdrPllConfig, DramError> {
        let target = if params.flags.pll_clock_from_tpr9() {
            params.tpr[9]
        } else {
            params.clock_mhz
        };
        let pll = DdrPllConfig::new_from_target_clock(HOSC, MHz::from_raw(target))?;

        self.regs.modify32(ccu::PLL_DDR_CTRL, |v| {
            ccu::PllDdrControl::new_with_raw_value(v)
                .with_m0(false)
                .with_m1(false)
                .with_reserved(u3::new(0))
                .with_n_minus_one(pll.n_minus_one())
                .with_enable(true)
                .with_ldo_enable(true)
                .with_lock_enable(true)
                .raw_value()
        });
        self.poll(WaitEvent::PllLock, ccu::PLL_DDR_CTRL, |v| {
            ccu::PllDdrControl::new_with_raw_value(v).locked()
        })?;
        self.delay_us(20);

        self.pll_cpu_output_gate();

        self.regs.modify32(ccu::DRAM_CLK, |v| {
            ccu::DramClock::new_with_raw_value(v)
                .with_src_sel(u2::new(0))
                .with_div_n(u2::new(0))
                .with_div_m(u2::new(0))
                .with_gate(true)
                .raw_value()
        });
        log::debug!("DDR PLL N = {}, PLL clock {} MHz", pll.n(), pll.pll_clock().raw());
        Ok(pll)
    }

    /// Hardware-empirical, purpose unconfirmed: sets bit 27 of the CPU PLL register after the
    /// DDR PLL locked.
    fn pll_cpu_output_gate(&mut self) {
        self.regs
            .set_bits32(ccu::PLL_CPU_CTRL, ccu::PLL_CPU_CTRL_OUTPUT_GATE);
    }

    fn vrefzq_init(&mut self, params: &DramParameters) {
        let flags = params.flags;
        if flags.skip_vref_init() {
            return;
        }
        self.regs
            .masked_set_bits32(dramc::IOCVR0, 0x8080_8080, params.tpr[5]);
        if !flags.internal_zq_only() {
            self.regs
                .masked_set_bits32(dramc::IOCVR1, 0xFFFF_FF80, params.tpr[6] & 0x7F);
        }
    }

    /// Common configuration: memory type, bus width, command timing and per-rank geometry.
    fn com_init(&mut self, params: &DramParameters) {
        let geometry = params.geometry_secondary;
        let lpddr = params.technology().is_some_and(|t| t.is_lpddr());

        self.regs.masked_set_bits32(msi::MC_R1, 0xFFFF_C0FF, 0x2000);

        let work_mode =
            msi::WorkMode::new_with_raw_value(self.regs.read32(msi::WORK_MODE0) & 0xFF00_0FFF)
                .with_dram_type(u3::new((params.dram_type & 0x7) as u8))
                .with_full_dq(!geometry.half_dq())
                .with_one_t_timing(lpddr || params.flags.one_t_timing())
                .with_enable(true);
        self.regs.write32(msi::WORK_MODE0, work_mode.raw_value());

        // Only ranks with a different geometry use the second work mode register.
        let ranks = if geometry.asymmetric_ranks() && geometry.rank_code().value() != 1 {
            2
        } else {
            1
        };
        let rank_code = u2::new(geometry.rank_code().value() & 0b11);
        for rank in 0..ranks {
            let addr = msi::WORK_MODE0 + 4 * rank;
            let rank_geometry = params.geometry_primary.rank(rank);
            let work_mode =
                msi::WorkMode::new_with_raw_value(self.regs.read32(addr) & 0xFFFF_F000)
                    .with_rank(rank_code)
                    .with_bank_code(u2::new(rank_geometry.bank_code.value() & 0b1))
                    .with_row_bits_minus_one(u4::new(rank_geometry.row_bits.wrapping_sub(1) & 0xF))
                    .with_page_code(u4::new(page_code(rank_geometry.page_size_kb.value())));
            self.regs.write32(addr, work_mode.raw_value());
        }

        let two_ranks = self.regs.read32(msi::WORK_MODE0) & 0x1 != 0;
        self.regs
            .write32(dramc::ODTMAP, if two_ranks { 0x303 } else { 0x201 });

        if geometry.half_dq() {
            self.regs.write32(dramc::DX1GCR0, 0);
        }

        let tpr4 = params.tpr[4];
        if tpr4 != 0 {
            self.regs.modify32(msi::WORK_MODE0, |v| {
                let work_mode = msi::WorkMode::new_with_raw_value(v);
                let cfg = work_mode.tpr4_cfg().value() | (tpr4 & 0b11) as u8;
                work_mode.with_tpr4_cfg(u2::new(cfg)).raw_value()
            });
            self.regs
                .set_bits32(msi::WORK_MODE1, ((tpr4 >> 2) << 12) & 0x001F_F000);
        }
    }

    /// PHY address/command line remapping, selected by the DDR eFuse type.
    fn phy_ac_remap(&mut self, params: &DramParameters) {
        let efuse = sid::DdrEfuse::new_with_raw_value(self.regs.read32(sid::DDR_EFUSE));
        let efuse_type = efuse.ddr_type().value();
        log::debug!("ddr_efuse_type: {:#x}", efuse_type);
        let mark_id = sid::MarkId::new_with_raw_value(self.regs.read32(sid::MARK_ID));
        log::debug!("mark_id: {:#x}", mark_id.mark());

        let Some(table) = select_remap_table(params, efuse_type) else {
            return;
        };
        let words = remap_words(table);
        self.regs.write32(msi::REMAP0, words[0]);
        self.regs.write32(msi::REMAP1, words[1]);
        self.regs.write32(msi::REMAP2, words[2]);
        self.regs.write32(msi::REMAP3, words[3]);
        self.regs.write32(msi::REMAP0, words[0] | msi::REMAP0_COMMIT);
    }

    fn latch_workaround_active(&mut self) -> bool {
        prcm::RtcDramFlags::new_with_raw_value(self.regs.read32(prcm::RTC_DRAM_FLAGS))
            .phy_latch_workaround()
    }

    fn wait_phy_init_done(&mut self) -> Result<(), DramError> {
        self.poll(WaitEvent::PhyInitDone, dramc::PGSR0, |v| {
            dramc::Pgsr0::new_with_raw_value(v).idone()
        })
        .map(|_| ())
    }

    fn wait_controller_state(&mut self, state: u8) -> Result<(), DramError> {
        self.poll(WaitEvent::ControllerState(state), dramc::STATR, |v| {
            dramc::Statr::new_with_raw_value(v).state().value() == state
        })
        .map(|_| ())
    }

    /// Channel configuration and PHY training.
    fn channel_init(&mut self, params: &DramParameters) -> Result<(), DramError> {
        let flags = params.flags;
        let gating_mode = flags.dqs_gating_mode();
        let probe = gating_mode == DqsGatingMode::Probe;
        let clk = params.clock_mhz;
        let ddr3 = params.technology() == Some(DramType::Ddr3);

        // Controller clock at half the DRAM clock.
        self.regs
            .masked_set_bits32(msi::MC_CLK_DIV, 0xFFFF_F000, (clk >> 1).wrapping_sub(1));
        self.regs.masked_set_bits32(dramc::PGCR2, 0xFFFF_F0FF, 0x300);

        let odt_off = (!params.odt_en & 0x1) << 5;
        let dxgcr0_keep = if clk > 672 { 0xFFFF_09C1 } else { 0xFFFF_0FC1 };
        self.regs.modify32(dramc::DX0GCR0, |v| v & dxgcr0_keep);
        self.regs.set_bits32(dramc::DX0GCR0, odt_off);
        if clk > 672 {
            self.regs.set_bits32(dramc::DX0GCR0, 0x400);
        }
        self.regs.modify32(dramc::DX1GCR0, |v| v & dxgcr0_keep);
        self.regs.set_bits32(dramc::DX1GCR0, odt_off);

        self.regs.set_bits32(dramc::ACIOCR0, 1 << 1);

        self.eye_delay_compensation(params);

        match gating_mode {
            DqsGatingMode::Probe => {
                self.regs.clear_bits32(dramc::PGCR2, 0xC0);
                self.regs.clear_bits32(dramc::DQSGMR, 0x107);
            }
            DqsGatingMode::Fixed => {
                self.regs.masked_set_bits32(dramc::PGCR2, !0xC0, 0x80);
                self.regs.masked_set_bits32(
                    dramc::DQSGMR,
                    0xFFFF_FEF8,
                    flags.fixed_gating_delay().wrapping_sub(2) | 0x100,
                );
                self.regs
                    .masked_set_bits32(dramc::DXCCR, 0x7FFF_FFFF, 0x0800_0000);
            }
            DqsGatingMode::Auto | DqsGatingMode::__Reserved => {
                self.regs.clear_bits32(dramc::PGCR2, 0x40);
                self.delay_us(10);
                self.regs.set_bits32(dramc::PGCR2, 0xC0);
            }
        }

        if params.technology().is_some_and(|t| t.is_lpddr()) {
            if probe {
                self.regs
                    .masked_set_bits32(dramc::DXCCR, 0xF7FF_FF3F, 0x8000_0000);
            } else {
                self.regs
                    .masked_set_bits32(dramc::DXCCR, 0x88FF_FFFF, 0x2200_0000);
            }
        }

        let dual_rank = params.geometry_secondary.raw_value() & (1 << 12) != 0;
        self.regs.masked_set_bits32(
            dramc::DTCR,
            0xF000_0000,
            if dual_rank { 0x0300_0001 } else { 0x0100_0007 },
        );

        let workaround = self.latch_workaround_active();
        if workaround {
            self.regs.modify32(prcm::PAD_HOLD_CTRL, |v| {
                prcm::PadHoldControl::new_with_raw_value(v)
                    .with_latch_b(false)
                    .raw_value()
            });
            self.delay_us(10);
        }

        self.regs.masked_set_bits32(
            dramc::ZQCR,
            0xFC00_0000,
            (params.zq & 0x00FF_FFFF) | 0x0200_0000,
        );

        let pir = if probe {
            self.regs
                .write32(dramc::PIR, dramc::PIR_PHY_INIT_GO.raw_value());
            self.wait_phy_init_done()?;
            self.delay_us(10);
            if ddr3 {
                dramc::PIR_GATE_TRAINING_DDR3
            } else {
                dramc::PIR_GATE_TRAINING
            }
        } else if !workaround {
            if ddr3 {
                dramc::PIR_FULL_INIT_DDR3
            } else {
                dramc::PIR_FULL_INIT
            }
        } else {
            dramc::PIR_LATCH_WORKAROUND_INIT
        };
        self.regs.write32(dramc::PIR, pir.raw_value());
        self.regs.modify32(dramc::PIR, |v| {
            dramc::Pir::new_with_raw_value(v).with_init(true).raw_value()
        });
        self.delay_us(10);
        self.wait_phy_init_done()?;

        if workaround {
            self.pad_latch_release(probe)?;
        }

        let pgsr0 = dramc::Pgsr0::new_with_raw_value(self.regs.read32(dramc::PGSR0));
        if pgsr0.has_errors() && pgsr0.zcal_error() {
            log::error!("ZQ calibration error, check the external 240 ohm resistor");
            return Err(DramError::ZqCalibration);
        }

        self.poll(WaitEvent::ControllerNormal, dramc::STATR, |v| {
            dramc::Statr::new_with_raw_value(v).normal()
        })?;

        self.refresh_control_pulse();
        self.mc_r5_set();

        self.regs.clear_bits32(dramc::PGCR3, 0x0600_0000);
        if probe {
            self.regs.masked_set_bits32(dramc::DXCCR, 0xFFFF_FF3F, 0x40);
        }
        Ok(())
    }

    /// Self refresh entry and exit around the release of the pad latch.
    fn pad_latch_release(&mut self, probe: bool) -> Result<(), DramError> {
        self.regs
            .masked_set_bits32(dramc::PGCR3, 0xF9FF_FFFF, 0x0400_0000);
        self.delay_us(10);

        self.regs.set_bits32(dramc::PWRCTL, 0x1);
        self.wait_controller_state(dramc::STATR_SELF_REFRESH)?;

        self.regs.modify32(prcm::PAD_HOLD_CTRL, |v| {
            prcm::PadHoldControl::new_with_raw_value(v)
                .with_latch_a(false)
                .raw_value()
        });
        self.delay_us(10);

        self.regs.clear_bits32(dramc::PWRCTL, 0x1);
        self.wait_controller_state(dramc::STATR_NORMAL)?;
        self.delay_us(15);

        if probe {
            self.regs.clear_bits32(dramc::PGCR2, 0xC0);
            self.regs
                .masked_set_bits32(dramc::PGCR3, 0xF9FF_FFFF, 0x0200_0000);
            self.delay_us(1);
            self.regs
                .write32(dramc::PIR, dramc::PIR_GATE_RETRAIN_GO.raw_value());
            self.wait_phy_init_done()?;
        }
        Ok(())
    }

    /// Hardware-empirical, purpose unconfirmed: pulses bit 31 of RFSHCTL0.
    fn refresh_control_pulse(&mut self) {
        self.regs.set_bits32(dramc::RFSHCTL0, 1 << 31);
        self.delay_us(10);
        self.regs.clear_bits32(dramc::RFSHCTL0, 1 << 31);
        self.delay_us(10);
    }

    /// Hardware-empirical, purpose unconfirmed: sets bit 31 of MSI register 0x14.
    fn mc_r5_set(&mut self) {
        self.regs.set_bits32(msi::MC_R5, 1 << 31);
        self.delay_us(10);
    }

    /// Per-pin delay compensation from the `tpr[10..=12]` nibbles.
    fn eye_delay_compensation(&mut self, params: &DramParameters) {
        let [tpr10, tpr11, tpr12] = [params.tpr[10], params.tpr[11], params.tpr[12]];
        let dq_delay = |shift: u32| {
            iocr_delay(tpr11, shift, 9, 0x1E00) | iocr_delay(tpr12, shift, 1, 0x001E)
        };

        let lane0 = dq_delay(0);
        for addr in (dramc::DATX0_IOCR_START..dramc::DATX0_IOCR_END).step_by(4) {
            self.regs.set_bits32(addr, lane0);
        }
        let lane1 = dq_delay(4);
        for addr in (dramc::DATX1_IOCR_START..dramc::DATX1_IOCR_END).step_by(4) {
            self.regs.set_bits32(addr, lane1);
        }

        self.regs
            .clear_bits32(dramc::PGCR0, dramc::PGCR0_AC_FIFO_RESET_N);

        let dqs0 = dq_delay(16);
        self.regs.set_bits32(dramc::DATX0_DQS_IOCR, dqs0);
        self.regs.set_bits32(dramc::DATX0_DQSN_IOCR, dqs0);
        let dqs1 = dq_delay(20);
        self.regs.set_bits32(dramc::DATX1_DQS_IOCR, dqs1);
        self.regs.set_bits32(dramc::DATX1_DQSN_IOCR, dqs1);
        self.regs
            .set_bits32(dramc::DATX0_DM_IOCR, iocr_delay(tpr11, 16, 25, 0x1E00_0000));
        self.regs
            .set_bits32(dramc::DATX1_DM_IOCR, iocr_delay(tpr11, 20, 25, 0x1E00_0000));

        self.regs
            .set_bits32(dramc::PGCR0, dramc::PGCR0_AC_FIFO_RESET_N);
        self.delay_us(1);

        let addr_delay = iocr_delay(tpr10, 4, 8, 0x0F00);
        for addr in (dramc::ACIOCR_ADDR1_START..dramc::ACIOCR_ADDR1_END).step_by(4) {
            self.regs.set_bits32(addr, addr_delay);
        }
        for addr in (dramc::ACIOCR_ADDR0_START..dramc::ACIOCR_ADDR0_END).step_by(4) {
            self.regs.set_bits32(addr, addr_delay);
        }
        let clk_delay = iocr_delay(tpr10, 0, 8, 0x0F00);
        self.regs.set_bits32(dramc::ACIOCR_CK, clk_delay);
        self.regs.set_bits32(dramc::ACIOCR_CKN, clk_delay);
        self.regs
            .set_bits32(dramc::ACIOCR_CS, iocr_delay(tpr10, 12, 8, 0x0F00));
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::dram::{
        ControlFlags, GeometryPrimary, GeometrySecondary,
        sim::{NoDelay, SimDevice, SimSoc},
    };

    fn ctrl() -> DramController<SimSoc, NoDelay> {
        DramController::new(SimSoc::new(SimDevice::ddr3_single_128mb()), NoDelay)
    }

    #[test]
    fn test_remap_table_selection() {
        let mut params = DramParameters::t113s3_ddr3();
        assert_eq!(select_remap_table(&params, 0), Some(&REMAP_DEFAULT));
        assert_eq!(select_remap_table(&params, 12), Some(&REMAP_DEFAULT));
        assert_eq!(select_remap_table(&params, 8), Some(&REMAP_EFUSE_8));
        assert_eq!(select_remap_table(&params, 10), Some(&REMAP_EFUSE_10));
        assert_eq!(select_remap_table(&params, 14), Some(&REMAP_NONE));
        params.flags.set_force_remap(u2::new(1));
        assert_eq!(select_remap_table(&params, 8), Some(&REMAP_FORCED));

        params.dram_type = DramType::Ddr2 as u32;
        assert_eq!(select_remap_table(&params, 8), Some(&REMAP_DDR2));
        assert_eq!(select_remap_table(&params, 15), None);
        params.dram_type = DramType::Lpddr3 as u32;
        assert_eq!(select_remap_table(&params, 8), None);
    }

    #[test]
    fn test_remap_words() {
        let words = remap_words(&REMAP_FORCED);
        assert_eq!(words[0], 9 << 25 | 7 << 20 | 4 << 15 | 2 << 10 | 3 << 5);
        assert_eq!(
            words[1],
            13 << 25 | 14 << 20 | 18 << 15 | 12 << 10 | 17 << 5 | 1
        );
        assert_eq!(words[2], 5 << 20 | 10 << 15 | 6 << 10 | 15 << 5 | 8);
        assert_eq!(
            words[3],
            11 << 25 | 20 << 20 | 21 << 15 | 16 << 10 | 22 << 5 | 19
        );
        assert_eq!(remap_words(&REMAP_NONE), [0; 4]);
    }

    #[test]
    fn test_remap_commit_write() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.flags.set_force_remap(u2::new(2));
        ctrl.phy_ac_remap(&params);
        let words = remap_words(&REMAP_FORCED);
        let soc = ctrl.regs();
        assert_eq!(soc.read32(msi::REMAP0), words[0] | msi::REMAP0_COMMIT);
        assert_eq!(soc.read32(msi::REMAP3), words[3]);
        assert_eq!(soc.write_count(msi::REMAP0), 2);
    }

    #[test]
    fn test_page_codes() {
        assert_eq!(page_code(0), 6);
        assert_eq!(page_code(1), 7);
        assert_eq!(page_code(2), 8);
        assert_eq!(page_code(4), 9);
        assert_eq!(page_code(8), 0xA);
        assert_eq!(page_code(3), 6);
    }

    #[test]
    fn test_com_init_single_rank() {
        let mut ctrl = ctrl();
        let params = DramParameters::t113s3_ddr3();
        ctrl.com_init(&params);
        let wm0 = msi::WorkMode::new_with_raw_value(ctrl.regs().read32(msi::WORK_MODE0));
        assert_eq!(wm0.dram_type().value(), 3);
        assert!(wm0.full_dq());
        assert!(wm0.enable());
        assert!(!wm0.one_t_timing());
        assert_eq!(wm0.rank().value(), 0);
        assert_eq!(wm0.page_code().value(), 8);
        assert_eq!(wm0.row_bits_minus_one().value(), 12);
        assert_eq!(wm0.bank_code().value(), 1);
        assert_eq!(wm0.raw_value(), 0x0043_18C4);
        assert_eq!(ctrl.regs().read32(dramc::ODTMAP), 0x201);
        assert_eq!(ctrl.regs().write_count(msi::WORK_MODE1), 0);
    }

    #[test]
    fn test_com_init_asymmetric_ranks() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.dram_type = DramType::Lpddr3 as u32;
        params.geometry_primary = GeometryPrimary::new_with_raw_value(0x00E1_10D2);
        params.geometry_secondary = GeometrySecondary::new_with_raw_value(0x0000_2101);
        ctrl.com_init(&params);
        let wm0 = msi::WorkMode::new_with_raw_value(ctrl.regs().read32(msi::WORK_MODE0));
        let wm1 = msi::WorkMode::new_with_raw_value(ctrl.regs().read32(msi::WORK_MODE1));
        assert!(wm0.one_t_timing());
        assert!(!wm0.full_dq());
        assert_eq!(wm0.rank().value(), 2);
        assert_eq!(wm1.rank().value(), 2);
        assert_eq!(wm1.page_code().value(), 7);
        assert_eq!(wm1.row_bits_minus_one().value(), 13);
        assert_eq!(wm1.bank_code().value(), 0);
        assert_eq!(ctrl.regs().read32(dramc::DX1GCR0), 0);
    }

    #[test]
    fn test_com_init_tpr4_bits() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.tpr[4] = 0x0000_0407;
        ctrl.com_init(&params);
        let wm0 = msi::WorkMode::new_with_raw_value(ctrl.regs().read32(msi::WORK_MODE0));
        assert_eq!(wm0.tpr4_cfg().value(), 0b11);
        assert_eq!(wm0.raw_value() & 0xFFF, 0x8C4);
        assert_eq!(ctrl.regs().read32(msi::WORK_MODE1), 0x0010_1000);
    }

    #[test]
    fn test_vref_init_flags() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        ctrl.regs().write32(dramc::IOCVR0, 0xFFFF_FFFF);
        ctrl.vrefzq_init(&params);
        assert_eq!(ctrl.regs().read32(dramc::IOCVR0), 0xC8C8_C8C8);
        assert_eq!(ctrl.regs().read32(dramc::IOCVR1), 0x48);

        let mut ctrl = self::ctrl();
        params.flags = ControlFlags::new_with_raw_value(0).with_internal_zq_only(true);
        ctrl.vrefzq_init(&params);
        assert_eq!(ctrl.regs().read32(dramc::IOCVR0), 0x4848_4848);
        assert_eq!(ctrl.regs().write_count(dramc::IOCVR1), 0);

        let mut ctrl = self::ctrl();
        params.flags = ControlFlags::new_with_raw_value(0).with_skip_vref_init(true);
        ctrl.vrefzq_init(&params);
        assert_eq!(ctrl.regs().write_count(dramc::IOCVR0), 0);
    }

    #[test]
    fn test_eye_delay_compensation() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.tpr[10] = 0x0000_3021;
        params.tpr[11] = 0x0021_0043;
        params.tpr[12] = 0x0065_0087;
        ctrl.eye_delay_compensation(&params);
        let soc = ctrl.regs();
        assert_eq!(soc.read32(dramc::DATX0_IOCR_START), 3 << 9 | 7 << 1);
        assert_eq!(soc.read32(dramc::DATX0_IOCR_END - 4), 3 << 9 | 7 << 1);
        assert_eq!(soc.read32(dramc::DATX1_IOCR_START), 4 << 9 | 8 << 1);
        assert_eq!(soc.read32(dramc::DATX0_DQS_IOCR), 1 << 9 | 5 << 1);
        assert_eq!(soc.read32(dramc::DATX1_DQSN_IOCR), 2 << 9 | 6 << 1);
        assert_eq!(soc.read32(dramc::DATX0_DM_IOCR), 1 << 25);
        assert_eq!(soc.read32(dramc::DATX1_DM_IOCR), 2 << 25);
        assert_eq!(soc.read32(dramc::ACIOCR_ADDR0_START), 2 << 8);
        assert_eq!(soc.read32(dramc::ACIOCR_ADDR1_END - 4), 2 << 8);
        assert_eq!(soc.read32(dramc::ACIOCR_CK), 1 << 8);
        assert_eq!(soc.read32(dramc::ACIOCR_CS), 3 << 8);
        assert_eq!(
            soc.read32(dramc::PGCR0) & dramc::PGCR0_AC_FIFO_RESET_N,
            dramc::PGCR0_AC_FIFO_RESET_N
        );
    }

    #[test]
    fn test_sys_init_programs_pll() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.clock_mhz = 800;
        ctrl.sys_init(&mut params).unwrap();
        // N = 800 * 2 / 24 = 66, rounded down.
        assert_eq!(params.clock_mhz, 792);
        let pll = ccu::PllDdrControl::new_with_raw_value(ctrl.regs().read32(ccu::PLL_DDR_CTRL));
        assert_eq!(pll.n_minus_one(), 65);
        assert!(pll.enable());
        assert!(pll.ldo_enable());
        assert!(pll.lock_enable());
        let dram_clk = ccu::DramClock::new_with_raw_value(ctrl.regs().read32(ccu::DRAM_CLK));
        assert!(dram_clk.gate());
        assert!(dram_clk.reset_n());
        assert_eq!(ctrl.regs().read32(dramc::CLKEN), 0x8000);
        assert_eq!(ctrl.regs().read32(msi::MASTER_EN0), 1);
    }

    #[test]
    fn test_pll_from_tpr9() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.flags.set_pll_clock_from_tpr9(true);
        params.tpr[9] = 528;
        ctrl.sys_init(&mut params).unwrap();
        assert_eq!(params.clock_mhz, 528);
    }

    #[test]
    fn test_pll_divider_out_of_range() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.clock_mhz = 4000;
        assert!(matches!(
            ctrl.sys_init(&mut params),
            Err(DramError::Pll(_))
        ));
    }

    #[test]
    fn test_pir_recipes() {
        // Full init on DDR3 without the workaround.
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x1F3]);

        // Probe mode on DDR3.
        let mut ctrl = self::ctrl();
        params.flags.set_dqs_gating_mode(DqsGatingMode::Probe);
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x53, 0x5A1]);

        // Workaround path on DDR2 in probe mode.
        let mut soc = SimSoc::new(SimDevice::ddr3_single_128mb());
        soc.latch_workaround = true;
        soc.write32(prcm::PAD_HOLD_CTRL, 0b11);
        let mut ctrl = DramController::new(soc, NoDelay);
        params.dram_type = DramType::Ddr2 as u32;
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x53, 0x521, 0x401]);
        assert_eq!(ctrl.regs().read32(prcm::PAD_HOLD_CTRL) & 0b11, 0);

        // Workaround path in automatic mode.
        let mut soc = SimSoc::new(SimDevice::ddr3_single_128mb());
        soc.latch_workaround = true;
        let mut ctrl = DramController::new(soc, NoDelay);
        params.flags.set_dqs_gating_mode(DqsGatingMode::Auto);
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x63]);
    }

    #[test]
    fn test_lpddr_channel_init() {
        // LPDDR3 with hardware gate training.
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.dram_type = DramType::Lpddr3 as u32;
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x173]);
        assert_eq!(ctrl.regs().read32(dramc::DXCCR), 0x2200_0000);

        // LPDDR2 in probe mode.
        let mut ctrl = self::ctrl();
        params.dram_type = DramType::Lpddr2 as u32;
        params.flags.set_dqs_gating_mode(DqsGatingMode::Probe);
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x53, 0x521]);
        assert_eq!(ctrl.regs().read32(dramc::DXCCR), 0x8000_0040);

        // DDR2 leaves the DX common configuration alone.
        let mut ctrl = self::ctrl();
        params.dram_type = DramType::Ddr2 as u32;
        params.flags.set_dqs_gating_mode(DqsGatingMode::Auto);
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().pir_commands, [0x173]);
        assert_eq!(ctrl.regs().write_count(dramc::DXCCR), 0);
    }

    #[test]
    fn test_fixed_gating_mode() {
        let mut ctrl = ctrl();
        let mut params = DramParameters::t113s3_ddr3();
        params.flags = ControlFlags::new_with_raw_value(0x0005_0008);
        ctrl.channel_init(&params).unwrap();
        assert_eq!(ctrl.regs().read32(dramc::DQSGMR), 0x103);
        assert_eq!(ctrl.regs().read32(dramc::PGCR2) & 0xC0, 0x80);
        assert_eq!(ctrl.regs().read32(dramc::DXCCR), 0x0800_0000);
    }

    #[test]
    fn test_workaround_state_timeout() {
        let mut soc = SimSoc::new(SimDevice::ddr3_single_128mb());
        soc.latch_workaround = true;
        soc.self_refresh_responds = false;
        let mut ctrl =
            DramController::new_with_poll_budget(soc, NoDelay, crate::dram::PollBudget(50));
        let params = DramParameters::t113s3_ddr3();
        assert_eq!(
            ctrl.channel_init(&params),
            Err(DramError::Timeout(WaitEvent::ControllerState(
                dramc::STATR_SELF_REFRESH
            )))
        );
    }

    #[test]
    fn test_channel_init_registers() {
        let mut ctrl = ctrl();
        let params = DramParameters::t113s3_ddr3();
        ctrl.channel_init(&params).unwrap();
        let soc = ctrl.regs();
        assert_eq!(soc.read32(msi::MC_CLK_DIV), 395);
        assert_eq!(soc.read32(dramc::DX0GCR0), 0x400);
        assert_eq!(soc.read32(dramc::DX1GCR0), 0);
        assert_eq!(soc.read32(dramc::DTCR), 0x0100_0007);
        assert_eq!(soc.read32(dramc::ZQCR), 0x027B_7BFB);
        assert_eq!(soc.read32(dramc::RFSHCTL0), 0);
        assert_eq!(soc.read32(msi::MC_R5), 1 << 31);
        assert_eq!(soc.read32(dramc::PGCR2), 0x3C0);
    }
}
