//! Interrupt Controller
//!
//! The controller exposes three registers: DCR (global enable), IAR (reading
//! claims the highest-priority pending line) and EOIR (writing the claimed
//! line retires it). A line that is claimed but never retired blocks every
//! line of the same or lower priority for good.
//!
//! [`InterruptController::acknowledge`] therefore hands out an
//! [`Acknowledged`] guard instead of a bare line number. The guard writes
//! EOIR when it goes out of scope, so every exit path of a handler retires
//! the line exactly once:
//!
//! ```ignore
//! if let Some(ack) = pic.acknowledge() {
//!     handle(ack.line())?; // early return still retires
//! }
//! ```

use core::fmt;

use bitflags::bitflags;

use crate::hw::{regs, Bus};

/// Number of interrupt lines the controller implements.
pub const IRQ_LINES: u32 = 32;

/// A physical interrupt source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct InterruptLine(u32);

impl InterruptLine {
    /// Timer channel 0.
    pub const TMR0: Self = Self(1);
    pub const TMR1: Self = Self(2);
    pub const TMR2: Self = Self(3);
    pub const TMR3: Self = Self(4);
    /// Vertical blanking.
    pub const VBLK: Self = Self(5);
    /// Audio unit.
    pub const APUS: Self = Self(6);
    /// Undefined instruction fault.
    pub const UNDF: Self = Self(7);
    /// Data abort fault.
    pub const DABT: Self = Self(8);
    /// Value read from IAR when nothing is pending.
    pub const SPURIOUS: Self = Self(1023);

    /// Wrap a raw line number.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw line number.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index into per-line tables, if the line is implemented.
    pub const fn index(self) -> Option<usize> {
        if self.0 < IRQ_LINES {
            Some(self.0 as usize)
        } else {
            None
        }
    }

    /// Fault lines report CPU exceptions and cannot be waited on.
    pub const fn is_fault(self) -> bool {
        self.0 == Self::UNDF.0 || self.0 == Self::DABT.0
    }
}

impl fmt::Debug for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq{}", self.0)
    }
}

bitflags! {
    /// Device Control Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceControl: u32 {
        /// Deliver interrupts to the CPU.
        const ENABLE = 1 << 0;
    }
}

/// Driver for the interrupt controller.
pub struct InterruptController<B: Bus> {
    bus: B,
    base: usize,
}

impl<B: Bus> InterruptController<B> {
    /// Bind the controller at `base`.
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Turn on interrupt delivery.
    pub fn enable(&mut self) {
        let dcr = self.control() | DeviceControl::ENABLE;
        self.bus.write32(self.base + regs::pic::DCR, dcr.bits());
    }

    /// Turn off interrupt delivery.
    pub fn disable(&mut self) {
        let dcr = self.control() - DeviceControl::ENABLE;
        self.bus.write32(self.base + regs::pic::DCR, dcr.bits());
    }

    pub fn is_enabled(&self) -> bool {
        self.control().contains(DeviceControl::ENABLE)
    }

    fn control(&self) -> DeviceControl {
        DeviceControl::from_bits_truncate(self.bus.read32(self.base + regs::pic::DCR))
    }

    /// Claim the pending interrupt, if any.
    ///
    /// The returned guard must be alive for as long as the line is being
    /// serviced; dropping it retires the line. While it is alive the
    /// controller is mutably borrowed, so no second claim can be made.
    pub fn acknowledge(&mut self) -> Option<Acknowledged<'_, B>> {
        let raw = self.bus.read32(self.base + regs::pic::IAR);
        let line = InterruptLine(raw);
        if line == InterruptLine::SPURIOUS {
            return None;
        }
        if line.index().is_none() {
            // claimed by the read, so it still has to be retired
            log::warn!("irq: controller reported unknown line {}", raw);
            self.bus.write32(self.base + regs::pic::EOIR, raw);
            return None;
        }
        Some(Acknowledged { pic: self, line })
    }

    /// The bus the controller sits on.
    pub fn bus(&self) -> &B {
        &self.bus
    }
}

/// A claimed interrupt. Retires the line (writes EOIR) on drop.
#[must_use = "dropping the guard retires the interrupt immediately"]
pub struct Acknowledged<'a, B: Bus> {
    pic: &'a mut InterruptController<B>,
    line: InterruptLine,
}

impl<B: Bus> Acknowledged<'_, B> {
    /// The line that fired.
    pub fn line(&self) -> InterruptLine {
        self.line
    }

    /// Retire now rather than at end of scope.
    pub fn retire(self) {}
}

impl<B: Bus> Drop for Acknowledged<'_, B> {
    fn drop(&mut self) {
        let pic = &*self.pic;
        pic.bus.write32(pic.base + regs::pic::EOIR, self.line.0);
    }
}

impl<B: Bus> fmt::Debug for Acknowledged<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acknowledged").field("line", &self.line).finish()
    }
}
