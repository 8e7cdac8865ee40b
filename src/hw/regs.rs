//! Peripheral Register Map
//!
//! Fixed addresses of the reference platform. Drivers add these offsets to the
//! base addresses carried in [`PlatformConfig`](crate::PlatformConfig).

/// Generic control value: unit off.
pub const DISABLE: u32 = 0;
/// Generic control value: unit on.
pub const ENABLE: u32 = 1;

/// Interrupt controller.
pub mod pic {
    pub const BASE: usize = 0xffff_0000;
    /// Device Control Register
    pub const DCR: usize = 0x00;
    /// Interrupt Acknowledge Register (read claims the pending line)
    pub const IAR: usize = 0x04;
    /// End Of Interrupt Register (write retires the claimed line)
    pub const EOIR: usize = 0x08;
}

/// Cycle counter (data watchpoint and trace unit).
pub mod dwt {
    pub const BASE: usize = 0xffff_1000;
    pub const CTRL: usize = 0x00;
    pub const CYCCNT: usize = 0x04;
}

/// System information.
pub mod inf {
    pub const BASE: usize = 0xffff_2000;
    /// CPU clock in Hz
    pub const CPUCLK: usize = 0x00;
}

/// Timer channels.
pub mod tmr {
    pub const BASE: usize = 0xffff_3000;
    /// Distance between consecutive channel blocks.
    pub const STRIDE: usize = 0x20;

    pub const CTRL: usize = 0x0;
    pub const MODE: usize = 0x4;
    pub const PER: usize = 0x8;
    pub const CNT: usize = 0xc;

    pub const MODE_PERIODIC: u32 = 0;
    pub const MODE_ONESHOT: u32 = 1;

    /// Address of register `reg` in channel `ch`'s block.
    pub const fn channel_reg(base: usize, ch: u32, reg: usize) -> usize {
        base + (ch as usize) * STRIDE + reg
    }
}

/// Serial FIFOs. Each channel occupies 64 bytes: TX half then RX half.
pub mod sci {
    pub const BASE: usize = 0xffff_c000;
    pub const CHANNEL_STRIDE: usize = 64;

    /// Transmit data (8-bit)
    pub const TX: usize = 0x04;
    /// Bytes waiting in the transmit FIFO (8-bit)
    pub const TX_LEN: usize = 0x08;

    pub const fn tx(base: usize, ch: u32) -> usize {
        base + (ch as usize) * CHANNEL_STRIDE + TX
    }

    pub const fn tx_len(base: usize, ch: u32) -> usize {
        base + (ch as usize) * CHANNEL_STRIDE + TX_LEN
    }
}
