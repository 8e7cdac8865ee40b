//! Simulated register file for host tests.
//!
//! Models just enough of the platform: timer channels that count one step per
//! [`SimBus::tick`] and reload at their period, a cycle counter, an interrupt
//! controller that tracks which line is claimed and records every
//! acknowledge/retire, and a serial transmit FIFO that captures bytes.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::vec::Vec;

use crate::config::MAX_TIMER_CHANNELS;
use crate::hw::{regs, Bus};
use crate::irq::InterruptLine;

/// Cycle counter advance per simulated tick.
pub const CYCLES_PER_TICK: u32 = 256;

/// CPU clock reported by the system information register.
pub const CPU_CLOCK_HZ: u32 = 4_000_000;

#[derive(Default)]
struct SimState {
    regs: BTreeMap<usize, u32>,
    pending: BTreeSet<u32>,
    active: Option<u32>,
    acknowledged: Vec<u32>,
    retired: Vec<u32>,
    violations: Vec<u32>,
    ticks: u64,
    fires: [u32; MAX_TIMER_CHANNELS as usize],
    serial: Vec<u8>,
}

pub struct SimBus {
    state: RefCell<SimState>,
}

impl SimBus {
    pub fn new() -> Self {
        let bus = Self {
            state: RefCell::new(SimState::default()),
        };
        bus.state
            .borrow_mut()
            .regs
            .insert(regs::inf::BASE + regs::inf::CPUCLK, CPU_CLOCK_HZ);
        bus
    }

    /// Make `line` pending.
    pub fn raise(&self, line: InterruptLine) {
        self.state.borrow_mut().pending.insert(line.raw());
    }

    /// Advance the hardware by one timer step.
    pub fn tick(&self) {
        let mut st = self.state.borrow_mut();
        st.ticks += 1;

        let dwt_ctrl = st.reg(regs::dwt::BASE + regs::dwt::CTRL);
        if dwt_ctrl & 1 != 0 {
            let cyc = st.reg(regs::dwt::BASE + regs::dwt::CYCCNT);
            st.regs.insert(
                regs::dwt::BASE + regs::dwt::CYCCNT,
                cyc.wrapping_add(CYCLES_PER_TICK),
            );
        }

        for ch in 0..MAX_TIMER_CHANNELS {
            let at = |reg| regs::tmr::channel_reg(regs::tmr::BASE, ch, reg);
            if st.reg(at(regs::tmr::CTRL)) & 1 == 0 {
                continue;
            }
            let period = st.reg(at(regs::tmr::PER));
            let mut count = st.reg(at(regs::tmr::CNT)) + 1;
            if period != 0 && count >= period {
                count = 0;
                if st.reg(at(regs::tmr::MODE)) == regs::tmr::MODE_ONESHOT {
                    st.regs.insert(at(regs::tmr::CTRL), regs::DISABLE);
                }
                st.pending.insert(InterruptLine::TMR0.raw() + ch);
                st.fires[ch as usize] += 1;
            }
            st.regs.insert(at(regs::tmr::CNT), count);
        }
    }

    pub fn set_cycles(&self, value: u32) {
        self.state
            .borrow_mut()
            .regs
            .insert(regs::dwt::BASE + regs::dwt::CYCCNT, value);
    }

    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// Times timer channel `ch` reached its period.
    pub fn fires(&self, ch: u32) -> u32 {
        self.state.borrow().fires[ch as usize]
    }

    pub fn acknowledged(&self) -> Vec<u32> {
        self.state.borrow().acknowledged.clone()
    }

    pub fn retired(&self) -> Vec<u32> {
        self.state.borrow().retired.clone()
    }

    /// EOIR writes that did not match the claimed line.
    pub fn violations(&self) -> Vec<u32> {
        self.state.borrow().violations.clone()
    }

    pub fn serial(&self) -> Vec<u8> {
        self.state.borrow().serial.clone()
    }

    pub fn peek(&self, addr: usize) -> u32 {
        self.state.borrow().reg(addr)
    }
}

impl SimState {
    fn reg(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }
}

impl Bus for SimBus {
    fn read32(&self, addr: usize) -> u32 {
        let mut st = self.state.borrow_mut();
        if addr == regs::pic::BASE + regs::pic::IAR {
            let enabled = st.reg(regs::pic::BASE + regs::pic::DCR) & 1 != 0;
            if !enabled || st.active.is_some() {
                return InterruptLine::SPURIOUS.raw();
            }
            return match st.pending.pop_first() {
                Some(line) => {
                    st.active = Some(line);
                    st.acknowledged.push(line);
                    line
                }
                None => InterruptLine::SPURIOUS.raw(),
            };
        }
        st.reg(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        let mut st = self.state.borrow_mut();
        if addr == regs::pic::BASE + regs::pic::EOIR {
            if st.active == Some(value) {
                st.active = None;
                st.retired.push(value);
            } else {
                st.violations.push(value);
            }
            return;
        }
        st.regs.insert(addr, value);
    }

    fn write8(&self, addr: usize, value: u8) {
        let mut st = self.state.borrow_mut();
        if addr == regs::sci::tx(regs::sci::BASE, 0) {
            st.serial.push(value);
            return;
        }
        st.regs.insert(addr, value as u32);
    }

    fn wait_for_interrupt(&self) {
        self.tick();
    }
}
