//! Timing derivation.
//!
//! The timing values are either unpacked from the board supplied `tpr[0..=2]` words or computed
//! from the JEDEC constants of the memory technology at the DRAM clock. A second table keyed by
//! the technology provides latencies, mode register values and the initialization delays.
use t113s3::dramc;

use super::params::{DqsGatingMode, DramParameters, DramType};
use crate::mmio::RegisterSpace;

/// Clock cycles for a time in ns at a frequency in MHz, rounded up.
#[inline]
pub const fn cycles(time_ns: u32, freq_mhz: u32) -> u32 {
    time_ns.wrapping_mul(freq_mhz).div_ceil(1000)
}

/// Timing values which can be packed into `tpr[0..=2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreTiming {
    pub tccd: u8,
    pub tfaw: u8,
    pub trrd: u8,
    pub trcd: u8,
    pub trc: u8,
    pub txp: u8,
    pub twtr: u8,
    pub trtp: u8,
    pub twr: u8,
    pub trp: u8,
    pub tras: u8,
    pub trfc: u16,
    pub trefi: u16,
}

impl CoreTiming {
    /// Conservative values for unknown memory technologies.
    pub const FALLBACK: Self = Self {
        tccd: 2,
        tfaw: 16,
        trrd: 3,
        trcd: 6,
        trc: 20,
        txp: 10,
        twtr: 3,
        trtp: 4,
        twr: 8,
        trp: 6,
        tras: 14,
        trfc: 128,
        trefi: 98,
    };

    /// Unpack the timing values from the `tpr0`, `tpr1` and `tpr2` words.
    pub const fn from_packed(tpr: [u32; 3]) -> Self {
        Self {
            tccd: ((tpr[0] >> 21) & 0x7) as u8,
            tfaw: ((tpr[0] >> 15) & 0x3F) as u8,
            trrd: ((tpr[0] >> 11) & 0xF) as u8,
            trcd: ((tpr[0] >> 6) & 0x1F) as u8,
            trc: (tpr[0] & 0x3F) as u8,
            txp: ((tpr[1] >> 23) & 0x1F) as u8,
            twtr: ((tpr[1] >> 20) & 0x7) as u8,
            trtp: ((tpr[1] >> 15) & 0x1F) as u8,
            twr: ((tpr[1] >> 11) & 0xF) as u8,
            trp: ((tpr[1] >> 6) & 0x1F) as u8,
            tras: (tpr[1] & 0x3F) as u8,
            trfc: ((tpr[2] >> 12) & 0x1FF) as u16,
            trefi: (tpr[2] & 0xFFF) as u16,
        }
    }

    /// Pack the timing values into the `tpr0`, `tpr1` and `tpr2` words.
    pub const fn packed(&self) -> [u32; 3] {
        [
            self.trc as u32
                | (self.trcd as u32) << 6
                | (self.trrd as u32) << 11
                | (self.tfaw as u32) << 15
                | (self.tccd as u32) << 21,
            self.tras as u32
                | (self.trp as u32) << 6
                | (self.twr as u32) << 11
                | (self.trtp as u32) << 15
                | (self.twtr as u32) << 20
                | (self.txp as u32) << 23,
            self.trefi as u32 | (self.trfc as u32) << 12,
        ]
    }

    /// Compute the timing values for a technology at the given DRAM clock.
    pub fn compute(technology: Option<DramType>, clock_mhz: u32) -> Self {
        // The controller runs at half the DRAM clock.
        let freq = clock_mhz >> 1;
        let c = |time_ns: u32| cycles(time_ns, freq) as u8;
        let c16 = |time_ns: u32| cycles(time_ns, freq) as u16;
        let mut t = match technology {
            Some(DramType::Ddr3) => {
                let trfc = c16(350);
                let trefi = c16(7800) / 32 + 1;
                let t8 = c(8);
                let mut trcd = c(15);
                let twtr = if t8 < 2 { 2 } else { t8.wrapping_add(2) };
                let twr = trcd.max(2);
                let trrd = c(10).max(2);
                let (tfaw, trc, tras) = if clock_mhz <= 800 {
                    (c(50), c(53), c(38))
                } else {
                    trcd = c(14);
                    (c(35), c(48), c(34))
                };
                Self {
                    tfaw,
                    trrd,
                    trcd,
                    trc,
                    txp: trrd,
                    twtr,
                    twr,
                    trp: trcd,
                    tras,
                    trfc,
                    trefi,
                    ..Self::FALLBACK
                }
            }
            Some(DramType::Ddr2) => {
                let trp = c(15);
                Self {
                    tfaw: c(50),
                    trrd: c(10),
                    trcd: c(20),
                    trc: c(65),
                    twtr: c(8),
                    trp,
                    tras: c(45),
                    trefi: c16(7800) / 32,
                    trfc: c16(328),
                    txp: 2,
                    twr: trp,
                    ..Self::FALLBACK
                }
            }
            Some(DramType::Lpddr2) => {
                let (txp, twtr) = match c(8) {
                    0 => (1, 2),
                    1 => (2, 2),
                    txp => (txp, txp),
                };
                Self {
                    tfaw: c(50).max(4),
                    trrd: c(10).max(1),
                    trcd: c(24).max(2),
                    trc: c(70),
                    txp,
                    twtr,
                    twr: c(15).max(2),
                    trp: c(17),
                    tras: c(42),
                    trefi: c16(3900) / 32,
                    trfc: c16(210),
                    ..Self::FALLBACK
                }
            }
            Some(DramType::Lpddr3) => {
                let twtr = c(8).max(2);
                Self {
                    tfaw: c(50).max(4),
                    trrd: c(10).max(1),
                    trcd: c(24).max(2),
                    trc: c(70),
                    txp: twtr,
                    twtr,
                    twr: c(15).max(2),
                    trp: c(17),
                    tras: c(42),
                    trefi: c16(3900) / 32,
                    trfc: c16(210),
                    ..Self::FALLBACK
                }
            }
            None => Self::FALLBACK,
        };
        t.tccd = 2;
        t.trtp = 4;
        t
    }
}

/// Complete timing set for one controller initialization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedTiming {
    pub core: CoreTiming,
    /// The core values were computed and not unpacked from `tpr[0..=2]`.
    pub computed: bool,
    pub tcksrx: u32,
    pub tckesr: u32,
    pub trd2wr: u32,
    pub trasmax: u32,
    pub twtp: u32,
    pub tcke: u32,
    pub tmod: u32,
    pub tmrd: u32,
    pub tmrw: u32,
    pub tcl: u32,
    pub tcwl: u32,
    pub wr_latency: u32,
    pub t_rdata_en: u32,
    pub twr2rd: u32,
    /// MR0 to MR3 derived for the technology.
    pub mode_registers: [u32; 4],
    /// Initialization delays: 2 in us scaled by the clock, 2 in ns scaled by the clock.
    pub tdinit: [u32; 4],
}

impl DerivedTiming {
    /// Derive the timing set from the parameters. This has no side effects.
    pub fn derive(params: &DramParameters) -> Self {
        let technology = params.technology();
        let freq = params.clock_mhz;
        let computed = !params.flags.use_timing_overrides();
        let core = if computed {
            CoreTiming::compute(technology, freq)
        } else {
            CoreTiming::from_packed([params.tpr[0], params.tpr[1], params.tpr[2]])
        };
        let twr = u32::from(core.twr);
        let twtr = u32::from(core.twtr);
        let [dmr1, dmr3] = [params.mode_registers[1], params.mode_registers[3]];
        let tdinit = |init0_us: u32, init1_ns: u32, init2_us: u32| {
            [
                init0_us.wrapping_mul(freq) + 1,
                init1_ns.wrapping_mul(freq) / 1000 + 1,
                init2_us.wrapping_mul(freq) + 1,
                freq + 1,
            ]
        };
        let mut timing = match technology {
            Some(DramType::Ddr2) => {
                let (tcl, t_rdata_en, mr0) = if freq < 409 {
                    (3, 1, 0x6A3)
                } else {
                    (4, 2, 0xE73)
                };
                Self {
                    core,
                    computed,
                    tcksrx: 5,
                    tckesr: 4,
                    trd2wr: 4,
                    trasmax: freq / 30,
                    twtp: twr + 5,
                    tcke: 3,
                    tmod: 12,
                    tmrd: 2,
                    tmrw: 0,
                    tcl,
                    tcwl: 0,
                    wr_latency: 1,
                    t_rdata_en,
                    twr2rd: twtr + 5,
                    mode_registers: [mr0, dmr1, 0, 0],
                    tdinit: tdinit(200, 100, 200),
                }
            }
            Some(DramType::Ddr3) => {
                let (mr0, tcl, wr_latency, tcwl, mr2) = if freq <= 800 {
                    (0x1C70, 6, 2, 4, 24)
                } else {
                    (0x1E14, 7, 3, 5, 32)
                };
                let probe = params.flags.dqs_gating_mode() == DqsGatingMode::Probe;
                Self {
                    core,
                    computed,
                    tcksrx: 5,
                    tckesr: 4,
                    trd2wr: if probe || freq < 912 { 5 } else { 6 },
                    trasmax: freq / 30,
                    twtp: tcwl + 2 + twtr,
                    tcke: 3,
                    tmod: 12,
                    tmrd: 4,
                    tmrw: 0,
                    tcl,
                    tcwl,
                    wr_latency,
                    t_rdata_en: tcwl,
                    twr2rd: tcwl + twtr,
                    mode_registers: [mr0, dmr1, mr2, 0],
                    tdinit: tdinit(500, 360, 200),
                }
            }
            Some(DramType::Lpddr2) => Self {
                core,
                computed,
                tcksrx: 5,
                tckesr: 5,
                trd2wr: 10,
                trasmax: freq / 60,
                twtp: twr + 5,
                tcke: 2,
                tmod: 5,
                tmrd: 5,
                tmrw: 3,
                tcl: 4,
                tcwl: 2,
                wr_latency: 1,
                t_rdata_en: 1,
                twr2rd: twtr + 5,
                mode_registers: [0, 195, 6, dmr3],
                tdinit: tdinit(200, 100, 11),
            },
            Some(DramType::Lpddr3) => {
                let (tcwl, wr_latency, t_rdata_en, mr2) = if freq < 800 {
                    (4, 3, 6, 12)
                } else {
                    (3, 2, 5, 10)
                };
                Self {
                    core,
                    computed,
                    tcksrx: 5,
                    tckesr: 5,
                    trd2wr: 13,
                    trasmax: freq / 60,
                    twtp: tcwl + 5,
                    tcke: 3,
                    tmod: 12,
                    tmrd: 5,
                    tmrw: 5,
                    tcl: 7,
                    tcwl,
                    wr_latency,
                    t_rdata_en,
                    twr2rd: tcwl + twtr + 5,
                    mode_registers: [0, 195, mr2, dmr3],
                    tdinit: tdinit(400, 500, 11),
                }
            }
            None => Self {
                core,
                computed,
                tcksrx: 4,
                tckesr: 3,
                trd2wr: 4,
                trasmax: 27,
                twtp: 12,
                tcke: 2,
                tmod: 6,
                tmrd: 2,
                tmrw: 0,
                tcl: 3,
                tcwl: 3,
                wr_latency: 1,
                t_rdata_en: 1,
                twr2rd: 8,
                mode_registers: [0; 4],
                tdinit: [0; 4],
            },
        };
        // The read to precharge delay is fixed, also for unpacked values.
        timing.core.trtp = 4;
        timing
    }
}

/// Fill all mode registers whose upper 16 bits are zero with the derived value.
pub fn fill_unset_mode_registers(mode_registers: &mut [u32; 4], derived: &[u32; 4]) {
    for (mr, derived) in mode_registers.iter_mut().zip(derived) {
        if *mr & 0xFFFF_0000 == 0 {
            *mr = *derived;
        }
    }
}

/// Derive the timing set, update the parameters and program the timing registers.
///
/// Computed timing values are written back into `tpr[0..=2]`.
pub fn auto_set_timing<R: RegisterSpace>(regs: &mut R, params: &mut DramParameters) {
    let timing = DerivedTiming::derive(params);
    if timing.computed {
        let [tpr0, tpr1, tpr2] = timing.core.packed();
        params.tpr[0] = tpr0;
        params.tpr[1] = tpr1;
        params.tpr[2] = tpr2;
        match (params.tpr[4] >> 12) & 0xF {
            1 => log::debug!("trefi: 3.9ms"),
            2 => log::debug!("trefi: 1.95ms"),
            _ => log::debug!("trefi: 7.8ms"),
        }
    }
    fill_unset_mode_registers(&mut params.mode_registers, &timing.mode_registers);
    write_timing_registers(regs, params, &timing);
}

/// Program the mode and timing registers.
pub fn write_timing_registers<R: RegisterSpace>(
    regs: &mut R,
    params: &DramParameters,
    timing: &DerivedTiming,
) {
    let t = timing;
    let c = &timing.core;
    regs.write32(dramc::MR0, params.mode_registers[0]);
    regs.write32(dramc::MR1, params.mode_registers[1]);
    regs.write32(dramc::MR2, params.mode_registers[2]);
    regs.write32(dramc::MR3, params.mode_registers[3]);
    regs.write32(dramc::ODT_CFG, (params.odt_en >> 4) & 0x3);

    regs.write32(
        dramc::DRAMTMG0,
        t.twtp << 24 | u32::from(c.tfaw) << 16 | t.trasmax << 8 | u32::from(c.tras),
    );
    regs.write32(
        dramc::DRAMTMG1,
        u32::from(c.txp) << 16 | u32::from(c.trtp) << 8 | u32::from(c.trc),
    );
    regs.write32(
        dramc::DRAMTMG2,
        t.tcwl << 24 | t.tcl << 16 | t.trd2wr << 8 | t.twr2rd,
    );
    regs.write32(dramc::DRAMTMG3, t.tmrw << 16 | t.tmrd << 12 | t.tmod);
    regs.write32(
        dramc::DRAMTMG4,
        u32::from(c.trcd) << 24
            | u32::from(c.tccd) << 16
            | u32::from(c.trrd) << 8
            | u32::from(c.trp),
    );
    regs.write32(
        dramc::DRAMTMG5,
        t.tcksrx << 24 | t.tcksrx << 16 | t.tckesr << 8 | t.tcke,
    );

    // Two rank timing.
    let two_rank = if params.clock_mhz < 800 {
        0xF000_6600
    } else {
        0xF000_7600
    };
    regs.masked_set_bits32(dramc::DRAMTMG8, 0x0FFF_0000, two_rank | 0x10);

    // PHY interface timing.
    regs.write32(
        dramc::PITMG0,
        0x2 << 24 | t.t_rdata_en << 16 | 0x1 << 8 | t.wr_latency,
    );
    regs.write32(dramc::PTR3, t.tdinit[0] | t.tdinit[1] << 20);
    regs.write32(dramc::PTR4, t.tdinit[2] | t.tdinit[3] << 20);

    // Refresh timing.
    let trefi = u32::from(c.trefi);
    regs.write32(dramc::RFSHTMG, trefi << 16 | u32::from(c.trfc));
    regs.write32(dramc::RFSHCTL1, 0x0FFF_0000 & (trefi << 15));
}
