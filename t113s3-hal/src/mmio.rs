//! Register space access.
//!
//! The DRAM bring-up touches registers spread over six different blocks and also performs
//! plain word accesses to the DRAM itself. Instead of owning a register block per peripheral,
//! all accesses go through a single [RegisterSpace] which operates on absolute addresses.
//! This keeps the bring-up code close to the hardware manual and allows replacing the hardware
//! with a model.

/// 32-bit access to the absolute physical address space.
pub trait RegisterSpace {
    fn read32(&mut self, addr: usize) -> u32;

    fn write32(&mut self, addr: usize, value: u32);

    /// Read-modify-write access.
    #[inline]
    fn modify32(&mut self, addr: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.read32(addr);
        self.write32(addr, f(value));
    }

    #[inline]
    fn set_bits32(&mut self, addr: usize, bits: u32) {
        self.modify32(addr, |v| v | bits);
    }

    #[inline]
    fn clear_bits32(&mut self, addr: usize, bits: u32) {
        self.modify32(addr, |v| v & !bits);
    }

    /// Keep the bits selected by `keep_mask`, clear all others, then set `bits`.
    #[inline]
    fn masked_set_bits32(&mut self, addr: usize, keep_mask: u32, bits: u32) {
        self.modify32(addr, |v| (v & keep_mask) | bits);
    }
}

impl<T: RegisterSpace + ?Sized> RegisterSpace for &mut T {
    #[inline]
    fn read32(&mut self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    #[inline]
    fn write32(&mut self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
}

/// Volatile memory-mapped access to the physical address space.
pub struct Mmio(());

impl Mmio {
    /// Create the register space handle.
    ///
    /// # Safety
    ///
    /// The caller must ensure that there is no other user of the DRAM controller, the DRAM PHY,
    /// the DRAM related CCU registers and the DRAM itself for the lifetime of the handle. The
    /// physical address space must be identity mapped.
    pub const unsafe fn steal() -> Self {
        Self(())
    }
}

impl RegisterSpace for Mmio {
    #[inline]
    fn read32(&mut self, addr: usize) -> u32 {
        // Safety: Exclusive access guaranteed by the creator of the handle.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write32(&mut self, addr: usize, value: u32) {
        // Safety: Exclusive access guaranteed by the creator of the handle.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}
