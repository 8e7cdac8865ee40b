//! Timer Driver
//!
//! Periodic hardware timers that block the caller until a period elapses.
//!
//! Each channel moves through `Idle -> Configuring -> Armed`; it returns to
//! `Idle` when a wait completes. A periodic channel keeps counting after
//! that (the counter reloads in hardware), so the next [`TimerDriver::wait`]
//! completes one period after the previous one.
//!
//! # Ordering
//! [`TimerDriver::setup`] registers the caller as the line's waiter *before*
//! enabling the channel. Enabling first would let a short period expire
//! before anyone was registered to receive it.
//!
//! ```ignore
//! let mut timers = TimerDriver::new(bus, PlatformConfig::DEFAULT);
//! timers.setup_hz(&mut bridge, 2, 10)?;
//! loop {
//!     timers.wait(&mut bridge, 2)?;
//!     tick();
//! }
//! ```

use bitflags::bitflags;

use crate::config::{PlatformConfig, MAX_TIMER_CHANNELS};
use crate::errno::{Errno, SysResult};
use crate::hw::{regs, Bus};
use crate::irq::InterruptLine;
use crate::syscall::{Bridge, Supervisor};

bitflags! {
    /// Timer channel control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u32 {
        const ENABLE = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Reload and fire again after every period.
    Periodic,
    /// Fire once, then stop.
    OneShot,
}

impl TimerMode {
    const fn bits(self) -> u32 {
        match self {
            Self::Periodic => regs::tmr::MODE_PERIODIC,
            Self::OneShot => regs::tmr::MODE_ONESHOT,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        if bits == regs::tmr::MODE_ONESHOT {
            Self::OneShot
        } else {
            Self::Periodic
        }
    }
}

/// Driver-side view of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Configuring,
    Armed,
}

/// Register snapshot of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerChannel {
    pub mode: TimerMode,
    pub count: u32,
    pub period: u32,
    pub enabled: bool,
}

/// Driver for the timer block.
pub struct TimerDriver<B: Bus> {
    bus: B,
    config: PlatformConfig,
    states: [TimerState; MAX_TIMER_CHANNELS as usize],
}

impl<B: Bus> TimerDriver<B> {
    pub fn new(bus: B, config: PlatformConfig) -> Self {
        Self {
            bus,
            config,
            states: [TimerState::Idle; MAX_TIMER_CHANNELS as usize],
        }
    }

    /// Number of channels on this platform.
    pub fn channels(&self) -> u32 {
        self.config.timer_channels
    }

    /// Validate `ch`, recording `EINVAL` in the caller's errno if it is out
    /// of range.
    fn line_for<S: Supervisor>(
        &self,
        bridge: &mut Bridge<S>,
        ch: u32,
    ) -> SysResult<InterruptLine> {
        match self.config.timer_line(ch) {
            Some(line) => Ok(line),
            None => {
                log::warn!("[TMR] channel {} out of range (have {})", ch, self.channels());
                Err(bridge.report(Errno::InvalidArgument))
            }
        }
    }

    fn reg(&self, ch: u32, reg: usize) -> usize {
        regs::tmr::channel_reg(self.config.timer_base, ch, reg)
    }

    /// Start channel `ch` as a periodic timer of `period` ticks.
    ///
    /// # Errors
    /// - `EINVAL`: `ch` is not a channel of this platform
    /// - anything the supervisor refuses arming with (e.g. `EBUSY` when
    ///   another context waits on the line), passed through unchanged
    pub fn setup<S: Supervisor>(
        &mut self,
        bridge: &mut Bridge<S>,
        ch: u32,
        period: u32,
    ) -> SysResult<()> {
        let line = self.line_for(bridge, ch)?;
        let state = &mut self.states[ch as usize];
        *state = TimerState::Configuring;

        if let Err(e) = bridge.setup_irq_wait(line) {
            *state = TimerState::Idle;
            return Err(e);
        }

        self.bus.write32(self.reg(ch, regs::tmr::MODE), TimerMode::Periodic.bits());
        self.bus.write32(self.reg(ch, regs::tmr::CNT), 0);
        self.bus.write32(self.reg(ch, regs::tmr::PER), period);
        self.bus
            .write32(self.reg(ch, regs::tmr::CTRL), TimerControl::ENABLE.bits());

        self.states[ch as usize] = TimerState::Armed;
        log::debug!("[TMR] ch{} periodic, period {}", ch, period);
        Ok(())
    }

    /// Start channel `ch` firing `hz` times per second.
    ///
    /// The counter runs at a 256th of the CPU clock.
    pub fn setup_hz<S: Supervisor>(
        &mut self,
        bridge: &mut Bridge<S>,
        ch: u32,
        hz: u32,
    ) -> SysResult<()> {
        let cpu_clock = self
            .bus
            .read32(self.config.sysinfo_base + regs::inf::CPUCLK);
        let period = match cpu_clock.checked_div(hz) {
            Some(cycles) if cycles >> 8 != 0 => cycles >> 8,
            _ => return Err(bridge.report(Errno::InvalidArgument)),
        };
        self.setup(bridge, ch, period)
    }

    /// Block until channel `ch` completes a period.
    ///
    /// # Errors
    /// - `EINVAL`: `ch` is not a channel of this platform
    /// - supervisor errors from the wait, unchanged
    pub fn wait<S: Supervisor>(&mut self, bridge: &mut Bridge<S>, ch: u32) -> SysResult<()> {
        let line = self.line_for(bridge, ch)?;
        self.states[ch as usize] = TimerState::Armed;
        let r = bridge.irq_wait(line);
        self.states[ch as usize] = TimerState::Idle;
        r
    }

    /// Disable channel `ch`. The supervisor registration is left in place.
    pub fn stop<S: Supervisor>(&mut self, bridge: &mut Bridge<S>, ch: u32) -> SysResult<()> {
        self.line_for(bridge, ch)?;
        self.bus
            .write32(self.reg(ch, regs::tmr::CTRL), TimerControl::empty().bits());
        self.states[ch as usize] = TimerState::Idle;
        Ok(())
    }

    /// Driver state of channel `ch`.
    pub fn state(&self, ch: u32) -> Option<TimerState> {
        self.config.timer_line(ch).map(|_| self.states[ch as usize])
    }

    /// Read channel `ch`'s registers.
    pub fn channel(&self, ch: u32) -> Option<TimerChannel> {
        self.config.timer_line(ch)?;
        Some(TimerChannel {
            mode: TimerMode::from_bits(self.bus.read32(self.reg(ch, regs::tmr::MODE))),
            count: self.bus.read32(self.reg(ch, regs::tmr::CNT)),
            period: self.bus.read32(self.reg(ch, regs::tmr::PER)),
            enabled: TimerControl::from_bits_truncate(
                self.bus.read32(self.reg(ch, regs::tmr::CTRL)),
            )
            .contains(TimerControl::ENABLE),
        })
    }
}
