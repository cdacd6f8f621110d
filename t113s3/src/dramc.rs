//! DRAM controller and PHY registers, also known as `mctl_phy`.
//!
//! The PHY is a DesignWare style PUB. Commands are placed into the PHY initialization register
//! [PIR] and their completion is reported in [PGSR0].
use arbitrary_int::{u2, u3};

pub const DRAMC_BASE_ADDR: usize = 0x0310_3000;

/// PHY initialization register.
pub const PIR: usize = DRAMC_BASE_ADDR;
pub const PWRCTL: usize = DRAMC_BASE_ADDR + 0x004;
/// Controller clock enable.
pub const CLKEN: usize = DRAMC_BASE_ADDR + 0x00C;
/// PHY general status register 0.
pub const PGSR0: usize = DRAMC_BASE_ADDR + 0x010;
pub const STATR: usize = DRAMC_BASE_ADDR + 0x018;
pub const ODT_CFG: usize = DRAMC_BASE_ADDR + 0x02C;
pub const MR0: usize = DRAMC_BASE_ADDR + 0x030;
pub const MR1: usize = DRAMC_BASE_ADDR + 0x034;
pub const MR2: usize = DRAMC_BASE_ADDR + 0x038;
pub const MR3: usize = DRAMC_BASE_ADDR + 0x03C;
pub const PTR3: usize = DRAMC_BASE_ADDR + 0x050;
pub const PTR4: usize = DRAMC_BASE_ADDR + 0x054;
pub const DRAMTMG0: usize = DRAMC_BASE_ADDR + 0x058;
pub const DRAMTMG1: usize = DRAMC_BASE_ADDR + 0x05C;
pub const DRAMTMG2: usize = DRAMC_BASE_ADDR + 0x060;
pub const DRAMTMG3: usize = DRAMC_BASE_ADDR + 0x064;
pub const DRAMTMG4: usize = DRAMC_BASE_ADDR + 0x068;
pub const DRAMTMG5: usize = DRAMC_BASE_ADDR + 0x06C;
/// Two rank timing.
pub const DRAMTMG8: usize = DRAMC_BASE_ADDR + 0x078;
pub const DRAMTMG9: usize = DRAMC_BASE_ADDR + 0x07C;
pub const PITMG0: usize = DRAMC_BASE_ADDR + 0x080;
pub const RFSHCTL0: usize = DRAMC_BASE_ADDR + 0x08C;
pub const RFSHTMG: usize = DRAMC_BASE_ADDR + 0x090;
pub const RFSHCTL1: usize = DRAMC_BASE_ADDR + 0x094;
pub const PWRTMG: usize = DRAMC_BASE_ADDR + 0x0A0;
pub const VTFCR: usize = DRAMC_BASE_ADDR + 0x0B8;
/// DQS gating mode register.
pub const DQSGMR: usize = DRAMC_BASE_ADDR + 0x0BC;
/// Data training configuration.
pub const DTCR: usize = DRAMC_BASE_ADDR + 0x0C0;
pub const PGCR0: usize = DRAMC_BASE_ADDR + 0x100;
pub const PGCR2: usize = DRAMC_BASE_ADDR + 0x108;
pub const PGCR3: usize = DRAMC_BASE_ADDR + 0x10C;
pub const IOCVR0: usize = DRAMC_BASE_ADDR + 0x110;
pub const IOCVR1: usize = DRAMC_BASE_ADDR + 0x114;
pub const DXCCR: usize = DRAMC_BASE_ADDR + 0x11C;
pub const ODTMAP: usize = DRAMC_BASE_ADDR + 0x120;
pub const ZQCR: usize = DRAMC_BASE_ADDR + 0x140;
pub const ACIOCR0: usize = DRAMC_BASE_ADDR + 0x208;
pub const ACIOCR_CK: usize = DRAMC_BASE_ADDR + 0x218;
pub const ACIOCR_CKN: usize = DRAMC_BASE_ADDR + 0x21C;
/// Address/command delay lines, first group.
pub const ACIOCR_ADDR0_START: usize = DRAMC_BASE_ADDR + 0x228;
pub const ACIOCR_ADDR0_END: usize = DRAMC_BASE_ADDR + 0x240;
/// Address/command delay lines, second group.
pub const ACIOCR_ADDR1_START: usize = DRAMC_BASE_ADDR + 0x240;
pub const ACIOCR_ADDR1_END: usize = DRAMC_BASE_ADDR + 0x27C;
pub const ACIOCR_CS: usize = DRAMC_BASE_ADDR + 0x280;
/// DATn0IOCR of byte lane 0, n = 0..=8.
pub const DATX0_IOCR_START: usize = DRAMC_BASE_ADDR + 0x310;
pub const DATX0_IOCR_END: usize = DRAMC_BASE_ADDR + 0x334;
pub const DATX0_DQS_IOCR: usize = DRAMC_BASE_ADDR + 0x334;
pub const DATX0_DQSN_IOCR: usize = DRAMC_BASE_ADDR + 0x338;
pub const DATX0_DM_IOCR: usize = DRAMC_BASE_ADDR + 0x33C;
pub const DX0GCR0: usize = DRAMC_BASE_ADDR + 0x344;
pub const DX0GSR0: usize = DRAMC_BASE_ADDR + 0x348;
/// DATn1IOCR of byte lane 1, n = 0..=8.
pub const DATX1_IOCR_START: usize = DRAMC_BASE_ADDR + 0x390;
pub const DATX1_IOCR_END: usize = DRAMC_BASE_ADDR + 0x3B4;
pub const DATX1_DQS_IOCR: usize = DRAMC_BASE_ADDR + 0x3B4;
pub const DATX1_DQSN_IOCR: usize = DRAMC_BASE_ADDR + 0x3B8;
pub const DATX1_DM_IOCR: usize = DRAMC_BASE_ADDR + 0x3BC;
pub const DX1GCR0: usize = DRAMC_BASE_ADDR + 0x3C4;
pub const DX1GSR0: usize = DRAMC_BASE_ADDR + 0x3C8;

static_assertions::const_assert_eq!(DATX0_IOCR_END - DATX0_IOCR_START, 9 * 4);
static_assertions::const_assert_eq!(DATX1_IOCR_END - DATX1_IOCR_START, 9 * 4);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Pir {
    #[bit(10, rw)]
    qs_gate: bool,
    #[bit(8, rw)]
    dram_init: bool,
    #[bit(7, rw)]
    dram_reset: bool,
    #[bit(6, rw)]
    phy_reset: bool,
    #[bit(5, rw)]
    dcal: bool,
    #[bit(4, rw)]
    pll_init: bool,
    #[bit(1, rw)]
    zcal: bool,
    /// Triggers execution of the selected steps.
    #[bit(0, rw)]
    init: bool,
}

/// PHY reset, PLL init and impedance calibration, started right away.
pub const PIR_PHY_INIT_GO: Pir = Pir::new_with_raw_value(0)
    .with_phy_reset(true)
    .with_pll_init(true)
    .with_zcal(true)
    .with_init(true);
/// DQS gate training with DRAM init and delay calibration.
pub const PIR_GATE_TRAINING: Pir = Pir::new_with_raw_value(0)
    .with_qs_gate(true)
    .with_dram_init(true)
    .with_dcal(true);
/// [PIR_GATE_TRAINING] which also issues a DDR3 reset.
pub const PIR_GATE_TRAINING_DDR3: Pir = PIR_GATE_TRAINING.with_dram_reset(true);
/// Full PHY and DRAM initialization.
pub const PIR_FULL_INIT: Pir = Pir::new_with_raw_value(0)
    .with_dram_init(true)
    .with_phy_reset(true)
    .with_dcal(true)
    .with_pll_init(true)
    .with_zcal(true);
/// [PIR_FULL_INIT] which also issues a DDR3 reset.
pub const PIR_FULL_INIT_DDR3: Pir = PIR_FULL_INIT.with_dram_reset(true);
/// PHY reset, delay and impedance calibration for the pad latch workaround.
pub const PIR_LATCH_WORKAROUND_INIT: Pir = Pir::new_with_raw_value(0)
    .with_phy_reset(true)
    .with_dcal(true)
    .with_zcal(true);
/// DQS gate retraining after the pad latch workaround.
pub const PIR_GATE_RETRAIN_GO: Pir = Pir::new_with_raw_value(0)
    .with_qs_gate(true)
    .with_init(true);

static_assertions::const_assert_eq!(PIR_PHY_INIT_GO.raw_value(), 0x53);
static_assertions::const_assert_eq!(PIR_GATE_TRAINING.raw_value(), 0x520);
static_assertions::const_assert_eq!(PIR_GATE_TRAINING_DDR3.raw_value(), 0x5A0);
static_assertions::const_assert_eq!(PIR_FULL_INIT.raw_value(), 0x172);
static_assertions::const_assert_eq!(PIR_FULL_INIT_DDR3.raw_value(), 0x1F2);
static_assertions::const_assert_eq!(PIR_LATCH_WORKAROUND_INIT.raw_value(), 0x62);
static_assertions::const_assert_eq!(PIR_GATE_RETRAIN_GO.raw_value(), 0x401);

/// Mask of the PGSR0 training error bits.
pub const PGSR0_ERROR_MASK: u32 = 0x0FF0_0000;

#[bitbybit::bitfield(u32, debug)]
pub struct Pgsr0 {
    /// DQS gate training error. Set when not all byte lanes and ranks responded.
    #[bit(22, r)]
    qs_gate_error: bool,
    /// Impedance calibration error. Summary bit of the training errors.
    #[bit(20, r)]
    zcal_error: bool,
    /// Initialization done.
    #[bit(0, r)]
    idone: bool,
}

impl Pgsr0 {
    /// Any of the training error bits 20..=27 is set.
    #[inline]
    pub const fn has_errors(&self) -> bool {
        self.raw_value() & PGSR0_ERROR_MASK != 0
    }
}

#[bitbybit::bitfield(u32, debug)]
pub struct Statr {
    #[bits(0..=2, r)]
    state: u3,
}

impl Statr {
    /// Controller is in normal operation.
    #[inline]
    pub fn normal(&self) -> bool {
        self.state().value() & 0b1 != 0
    }
}

/// State values reported by [Statr::state] during the pad latch workaround.
pub const STATR_SELF_REFRESH: u8 = 0x3;
pub const STATR_NORMAL: u8 = 0x1;

#[bitbybit::bitfield(u32, debug)]
pub struct DxGsr0 {
    /// DQS gate training state of the byte lane. 2 means only a single rank responded.
    #[bits(24..=25, r)]
    gate_state: u2,
}

/// Value of [DxGsr0::gate_state] when only rank 0 passed gate training.
pub const DX_GATE_STATE_SINGLE_RANK: u8 = 2;
/// Value of [DxGsr0::gate_state] when the byte lane failed on both ranks.
pub const DX_GATE_STATE_NONE: u8 = 0;

/// Bit 26 of PGCR0 and PGCR3: AC loopback FIFO reset, active low.
pub const PGCR0_AC_FIFO_RESET_N: u32 = 1 << 26;
/// Bit 31 of ZQCR: ZQ calibration done.
pub const ZQCR_DONE: u32 = 1 << 31;
