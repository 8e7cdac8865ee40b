//! Serial Transmit Driver
//!
//! Output side of the serial communication interface. Each channel has an
//! 8-bit transmit FIFO register; writing a byte queues it for the host.
//!
//! # Memory Map
//! - Base address: 0xffff_c000
//! - Channel stride: 64 bytes
//! - TX at +0x04, TX_LEN at +0x08 (both 8-bit)
//!
//! # Design
//! The FIFO is drained by the host side, so a push never waits. The driver is
//! a [`Pipe`] sink (popping yields nothing) and a [`fmt::Write`] target for
//! the console.

use core::fmt;

use crate::hw::{regs, Bus};
use crate::pipe::Pipe;

/// Transmit half of one serial channel.
pub struct SciTx<B: Bus> {
    bus: B,
    base: usize,
    ch: u32,
    pushed: usize,
}

impl<B: Bus> SciTx<B> {
    /// Channel `ch` of the serial block at `base`.
    pub const fn new(bus: B, base: usize, ch: u32) -> Self {
        Self {
            bus,
            base,
            ch,
            pushed: 0,
        }
    }

    /// Console channel at the default address.
    pub const fn console(bus: B) -> Self {
        Self::new(bus, regs::sci::BASE, 0)
    }

    pub fn channel(&self) -> u32 {
        self.ch
    }

    /// Bytes still queued in the transmit FIFO.
    pub fn queued(&self) -> u8 {
        self.bus.read8(regs::sci::tx_len(self.base, self.ch))
    }

    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Write text, expanding `\n` to `\r\n`.
    pub fn write_text(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.push(b'\r');
            }
            self.push(byte);
        }
    }
}

impl<B: Bus> Pipe for SciTx<B> {
    fn push(&mut self, byte: u8) -> bool {
        self.bus.write8(regs::sci::tx(self.base, self.ch), byte);
        self.pushed += 1;
        true
    }

    fn pop(&mut self) -> Option<u8> {
        None
    }
}

impl<B: Bus> fmt::Write for SciTx<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_text(s);
        Ok(())
    }
}
