use crate::time::MegaHertz;

/// The divider field of PLL_DDR is 8 bits wide and holds `N - 1`.
pub const PLL_DDR_N_MAX: u32 = 256;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllConfigCtorError {
    #[error("invalid input")]
    InvalidInput,
    #[error("pll divider value {0} is out of range (1..={PLL_DDR_N_MAX})")]
    DividerOutOfRange(u32),
}

/// DDR PLL configuration.
///
/// The PLL output runs at `HOSC * N`, the DRAM clock is half of the PLL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdrPllConfig {
    hosc: MegaHertz,
    n: u32,
}

impl DdrPllConfig {
    /// Calculate the configuration for a target DRAM clock.
    ///
    /// The PLL is set to twice the target clock. The divider is rounded down, so the achieved
    /// DRAM clock can be lower than the target clock.
    pub fn new_from_target_clock(
        hosc: MegaHertz,
        target_dram_clk: MegaHertz,
    ) -> Result<Self, PllConfigCtorError> {
        if hosc.raw() == 0 {
            return Err(PllConfigCtorError::InvalidInput);
        }
        let n = target_dram_clk.raw().saturating_mul(2) / hosc.raw();
        if !(1..=PLL_DDR_N_MAX).contains(&n) {
            return Err(PllConfigCtorError::DividerOutOfRange(n));
        }
        Ok(Self { hosc, n })
    }

    #[inline]
    pub const fn n(&self) -> u32 {
        self.n
    }

    /// Value of the `N - 1` register field.
    #[inline]
    pub const fn n_minus_one(&self) -> u8 {
        (self.n - 1) as u8
    }

    /// PLL output frequency.
    #[inline]
    pub fn pll_clock(&self) -> MegaHertz {
        MegaHertz::from_raw(self.hosc.raw() * self.n)
    }

    /// Achieved DRAM clock.
    #[inline]
    pub fn dram_clock(&self) -> MegaHertz {
        MegaHertz::from_raw((self.hosc.raw() * self.n) >> 1)
    }
}
