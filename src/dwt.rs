//! Cycle Counter
//!
//! Free-running 32-bit counter of CPU cycles, started and stopped through a
//! control register. It wraps, so intervals are always computed modulo 2^32.

use bitflags::bitflags;

use crate::hw::{regs, Bus};

bitflags! {
    /// Cycle counter control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DwtControl: u32 {
        /// Count cycles.
        const CYCCNTENA = 1 << 0;
    }
}

/// A raw counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycles(pub u32);

impl Cycles {
    /// Cycles from `earlier` to `self`, tolerating one wrap of the counter.
    #[inline]
    pub const fn elapsed_since(self, earlier: Cycles) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Driver for the cycle counter.
pub struct CycleCounter<B: Bus> {
    bus: B,
    base: usize,
}

impl<B: Bus> CycleCounter<B> {
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Zero the counter and start it.
    pub fn enable(&self) {
        self.bus.write32(self.base + regs::dwt::CYCCNT, 0);
        self.bus
            .write32(self.base + regs::dwt::CTRL, DwtControl::CYCCNTENA.bits());
    }

    /// Stop counting. The current value is kept.
    pub fn disable(&self) {
        self.bus
            .write32(self.base + regs::dwt::CTRL, DwtControl::empty().bits());
    }

    pub fn is_enabled(&self) -> bool {
        DwtControl::from_bits_truncate(self.bus.read32(self.base + regs::dwt::CTRL))
            .contains(DwtControl::CYCCNTENA)
    }

    /// Current counter value.
    #[inline]
    pub fn now(&self) -> Cycles {
        Cycles(self.bus.read32(self.base + regs::dwt::CYCCNT))
    }

    /// Run `f` and report how many cycles it took.
    pub fn measure<T>(&self, f: impl FnOnce() -> T) -> (T, u32) {
        let start = self.now();
        let value = f();
        let elapsed = self.now().elapsed_since(start);
        (value, elapsed)
    }
}
