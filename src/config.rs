//! Platform Configuration
//!
//! Compile-time description of where the peripherals live and how many timer
//! channels the part has. [`PlatformConfig::DEFAULT`] matches the register map
//! in [`crate::hw::regs`]; boards that differ override fields with the
//! `const fn` builders.

use crate::hw::regs;
use crate::irq::InterruptLine;

/// Timer channels with an interrupt line of their own (TMR0..=TMR3).
pub const MAX_TIMER_CHANNELS: u32 = InterruptLine::TMR3.raw() - InterruptLine::TMR0.raw() + 1;

/// Base addresses and sizing for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Interrupt controller register window.
    pub pic_base: usize,
    /// Cycle counter register window.
    pub dwt_base: usize,
    /// System information registers (CPU clock).
    pub sysinfo_base: usize,
    /// First timer channel; channels follow at [`regs::tmr::STRIDE`].
    pub timer_base: usize,
    /// Serial FIFO block.
    pub sci_base: usize,
    /// Number of implemented timer channels.
    pub timer_channels: u32,
    /// Interrupt line of timer channel 0; channel `k` uses `base + k`.
    pub timer_irq_base: InterruptLine,
}

impl PlatformConfig {
    /// The reference platform.
    pub const DEFAULT: Self = Self {
        pic_base: regs::pic::BASE,
        dwt_base: regs::dwt::BASE,
        sysinfo_base: regs::inf::BASE,
        timer_base: regs::tmr::BASE,
        sci_base: regs::sci::BASE,
        timer_channels: 4,
        timer_irq_base: InterruptLine::TMR0,
    };

    /// Override the number of timer channels.
    ///
    /// Values above [`MAX_TIMER_CHANNELS`] are clamped.
    pub const fn with_timer_channels(mut self, channels: u32) -> Self {
        self.timer_channels = if channels > MAX_TIMER_CHANNELS {
            MAX_TIMER_CHANNELS
        } else {
            channels
        };
        self
    }

    /// Override the interrupt controller base address.
    pub const fn with_pic_base(mut self, base: usize) -> Self {
        self.pic_base = base;
        self
    }

    /// Override the timer block base address.
    pub const fn with_timer_base(mut self, base: usize) -> Self {
        self.timer_base = base;
        self
    }

    /// Interrupt line for a timer channel, if the channel exists.
    ///
    /// Channels whose line would fall past TMR3 onto another device's line
    /// do not exist.
    pub const fn timer_line(&self, channel: u32) -> Option<InterruptLine> {
        if channel >= self.timer_channels {
            return None;
        }
        match self.timer_irq_base.raw().checked_add(channel) {
            Some(raw) if raw <= InterruptLine::TMR3.raw() => Some(InterruptLine::new(raw)),
            _ => None,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
