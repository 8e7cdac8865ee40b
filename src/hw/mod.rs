//! Register Access
//!
//! Drivers never touch raw pointers themselves. They go through a [`Bus`],
//! which is [`Mmio`] on the target and a simulated register file in tests.

pub mod regs;

use core::ptr::{read_volatile, write_volatile};

/// A 32-bit register bus.
///
/// Methods take `&self`: registers are hardware-shared state, and the
/// simulated implementations use interior mutability.
pub trait Bus {
    /// Read the 32-bit register at `addr`.
    fn read32(&self, addr: usize) -> u32;

    /// Write the 32-bit register at `addr`.
    fn write32(&self, addr: usize, value: u32);

    /// Read an 8-bit register.
    fn read8(&self, addr: usize) -> u8 {
        self.read32(addr) as u8
    }

    /// Write an 8-bit register.
    fn write8(&self, addr: usize, value: u8) {
        self.write32(addr, value as u32);
    }

    /// Idle until an interrupt may have become pending.
    ///
    /// Called by the supervisor between polls of the interrupt controller.
    fn wait_for_interrupt(&self) {
        core::hint::spin_loop();
    }
}

impl<T: Bus + ?Sized> Bus for &T {
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }

    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }

    fn write8(&self, addr: usize, value: u8) {
        (**self).write8(addr, value)
    }

    fn wait_for_interrupt(&self) {
        (**self).wait_for_interrupt()
    }
}

/// Memory-mapped I/O at absolute physical addresses.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create the MMIO bus.
    ///
    /// # Safety
    /// Every register window named in [`regs`] (or in the
    /// [`PlatformConfig`](crate::PlatformConfig) in use) must be mapped
    /// device memory for as long as the bus is used.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Bus for Mmio {
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: the window is mapped per the contract of `Mmio::new`;
        // volatile keeps the access from being merged or elided.
        unsafe { read_volatile(addr as *const u32) }
    }

    fn write32(&self, addr: usize, value: u32) {
        // SAFETY: see `read32`
        unsafe { write_volatile(addr as *mut u32, value) }
    }

    fn read8(&self, addr: usize) -> u8 {
        // SAFETY: see `read32`
        unsafe { read_volatile(addr as *const u8) }
    }

    fn write8(&self, addr: usize, value: u8) {
        // SAFETY: see `read32`
        unsafe { write_volatile(addr as *mut u8, value) }
    }

    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    fn wait_for_interrupt(&self) {
        // SAFETY: WFI only suspends until the next interrupt
        unsafe {
            core::arch::asm!("wfi", options(nostack, nomem));
        }
    }
}
