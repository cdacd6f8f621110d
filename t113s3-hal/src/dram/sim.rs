//! Register level model of the DRAM interface used by the unit tests.
//!
//! Registers are plain storage with a few reactive bits: the PLL lock flag, the PHY training
//! handshake, the controller state and the pad latch workaround flag. Accesses to the DRAM are
//! decoded with the work mode register written last and masked with the geometry of the
//! simulated device, so address lines which the device does not have alias.
extern crate std;

use std::{collections::HashMap, vec::Vec};

use embedded_hal::delay::DelayNs;
use t113s3::{SDRAM_BASE, ccu, dramc, msi, prcm};

use crate::mmio::RegisterSpace;

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Geometry and training behaviour of the attached device.
#[derive(Debug, Clone, Copy)]
pub struct SimDevice {
    /// Byte address bits of a page.
    pub column_bits: u32,
    pub row_bits: u32,
    pub bank_bits: u32,
    pub ranks: u32,
    pub half_width: bool,
    /// Bits which always read as one.
    pub stuck_bits: u32,
    /// Gate training states reported instead of the ones matching the device.
    pub lane_states: Option<(u8, u8)>,
}

impl SimDevice {
    /// 2 KB page, 13 rows, 8 banks.
    pub const fn ddr3_single_128mb() -> Self {
        Self {
            column_bits: 11,
            row_bits: 13,
            bank_bits: 3,
            ranks: 1,
            half_width: false,
            stuck_bits: 0,
            lane_states: None,
        }
    }

    /// 4 KB page, 13 rows, 8 banks, two ranks.
    pub const fn ddr3_dual_512mb() -> Self {
        Self {
            column_bits: 12,
            ranks: 2,
            ..Self::ddr3_single_128mb()
        }
    }

    /// PGSR0 error bits and lane gate states after a training run.
    fn training_result(&self, zq_error: bool) -> (u32, u8, u8) {
        if zq_error {
            return (dramc::PGSR0_ERROR_MASK, 0, 0);
        }
        if let Some((dx0, dx1)) = self.lane_states {
            return (1 << 22, dx0, dx1);
        }
        match (self.ranks, self.half_width) {
            (2, false) => (0, 0, 0),
            (2, true) => (1 << 22, 0, 0),
            (_, false) => (1 << 22, 2, 2),
            (_, true) => (1 << 22, 2, 0),
        }
    }
}

#[inline]
const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

pub struct SimSoc {
    device: SimDevice,
    regs: HashMap<usize, u32>,
    dram: HashMap<(u64, u64, u64, u64), u32>,
    writes: HashMap<usize, usize>,
    work_mode: usize,
    pub pll_locks: bool,
    pub phy_responds: bool,
    pub zq_error: bool,
    pub latch_workaround: bool,
    pub self_refresh_responds: bool,
    pub work_mode_readback: bool,
    /// PIR writes which started an operation.
    pub pir_commands: Vec<u32>,
    pub pll_programmed: u32,
    pub dram_reads: usize,
    pub dram_writes: usize,
}

impl SimSoc {
    pub fn new(device: SimDevice) -> Self {
        Self {
            device,
            regs: HashMap::new(),
            dram: HashMap::new(),
            writes: HashMap::new(),
            work_mode: msi::WORK_MODE0,
            pll_locks: true,
            phy_responds: true,
            zq_error: false,
            latch_workaround: false,
            self_refresh_responds: true,
            work_mode_readback: true,
            pir_commands: Vec::new(),
            pll_programmed: 0,
            dram_reads: 0,
            dram_writes: 0,
        }
    }

    pub fn write_count(&self, addr: usize) -> usize {
        self.writes.get(&addr).copied().unwrap_or(0)
    }

    fn stored(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Storage location of a DRAM address: rank, bank, row and column.
    fn decode(&self, addr: usize) -> (u64, u64, u64, u64) {
        let wm = msi::WorkMode::new_with_raw_value(self.stored(self.work_mode));
        let mut a = (addr - SDRAM_BASE) as u64;

        let column_bits = u32::from(wm.page_code().value()) + 3;
        let col = a & mask(column_bits);
        a >>= column_bits;
        let mut bank = a & 0b11;
        a >>= 2;
        let row_bits = u32::from(wm.row_bits_minus_one().value()) + 1;
        let row = a & mask(row_bits);
        a >>= row_bits;
        if wm.bank_code().value() & 0b1 != 0 {
            bank |= (a & 0b1) << 2;
            a >>= 1;
        }
        let rank = if wm.rank().value() != 0 { a & 0b1 } else { 0 };

        let dev = &self.device;
        (
            if dev.ranks > 1 { rank } else { 0 },
            bank & mask(dev.bank_bits),
            row & mask(dev.row_bits),
            col & mask(dev.column_bits) & !0b11,
        )
    }

    fn pir_write(&mut self, value: u32) {
        if value & 0b1 == 0 {
            return;
        }
        self.pir_commands.push(value);
        if !self.phy_responds {
            self.regs.insert(dramc::PGSR0, 0);
            return;
        }
        let (errors, dx0, dx1) = self.device.training_result(self.zq_error);
        self.regs.insert(dramc::PGSR0, errors | 0x1);
        self.regs.insert(dramc::DX0GSR0, u32::from(dx0) << 24);
        self.regs.insert(dramc::DX1GSR0, u32::from(dx1) << 24);
    }
}

impl RegisterSpace for SimSoc {
    fn read32(&mut self, addr: usize) -> u32 {
        if addr >= SDRAM_BASE {
            self.dram_reads += 1;
            let key = self.decode(addr);
            return self.dram.get(&key).copied().unwrap_or(0) | self.device.stuck_bits;
        }
        let value = self.stored(addr);
        match addr {
            ccu::PLL_DDR_CTRL => {
                let pll = ccu::PllDdrControl::new_with_raw_value(value);
                if pll.enable() && self.pll_locks {
                    value | (1 << 28)
                } else {
                    value
                }
            }
            dramc::STATR => {
                if self.stored(dramc::PWRCTL) & 0b1 != 0 && self.self_refresh_responds {
                    u32::from(dramc::STATR_SELF_REFRESH)
                } else {
                    u32::from(dramc::STATR_NORMAL)
                }
            }
            prcm::RTC_DRAM_FLAGS if self.latch_workaround => value | (1 << 16),
            msi::WORK_MODE0 | msi::WORK_MODE1 if !self.work_mode_readback => value ^ (1 << 31),
            _ => value,
        }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        if addr >= SDRAM_BASE {
            self.dram_writes += 1;
            let key = self.decode(addr);
            self.dram.insert(key, value);
            return;
        }
        *self.writes.entry(addr).or_insert(0) += 1;
        self.regs.insert(addr, value);
        match addr {
            ccu::PLL_DDR_CTRL if ccu::PllDdrControl::new_with_raw_value(value).lock_enable() => {
                self.pll_programmed += 1;
            }
            dramc::PIR => self.pir_write(value),
            msi::WORK_MODE0 | msi::WORK_MODE1 => self.work_mode = addr,
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_address_lines_alias() {
        let mut soc = SimSoc::new(SimDevice::ddr3_single_128mb());
        // 4 KB page, 14 rows, 8 banks.
        soc.write32(msi::WORK_MODE0, 0x0000_09D4);
        soc.write32(SDRAM_BASE + 8, 0x55AA);
        // Column bit 11 is not connected.
        assert_eq!(soc.read32(SDRAM_BASE + (1 << 11) + 8), 0x55AA);
        // Row bit 13 is not connected.
        assert_eq!(soc.read32(SDRAM_BASE + (1 << 27) + 8), 0x55AA);
        // Bank bit 0.
        assert_eq!(soc.read32(SDRAM_BASE + (1 << 12) + 8), 0);
        assert_eq!(soc.dram_writes, 1);
        assert_eq!(soc.dram_reads, 3);
    }

    #[test]
    fn test_pll_lock_and_training_handshake() {
        let mut soc = SimSoc::new(SimDevice::ddr3_single_128mb());
        soc.write32(ccu::PLL_DDR_CTRL, 1 << 31);
        assert_ne!(soc.read32(ccu::PLL_DDR_CTRL) & (1 << 28), 0);
        soc.write32(dramc::PIR, 0x1F2);
        assert_eq!(soc.read32(dramc::PGSR0), 0);
        soc.write32(dramc::PIR, 0x1F3);
        assert_eq!(soc.read32(dramc::PGSR0), (1 << 22) | 1);
        assert_eq!(soc.read32(dramc::DX1GSR0), 2 << 24);
        assert_eq!(soc.pir_commands, [0x1F3]);
    }
}
