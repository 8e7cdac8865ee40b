//! Keel - privileged-boundary runtime for a small embedded target
//!
//! The pieces that sit on the line between unprivileged application code and
//! the supervisor:
//!
//! - [`syscall`]: the user↔supervisor bridge, its ABI records and the
//!   supervisor-side dispatcher
//! - [`irq`]: the interrupt controller acknowledge/retire handshake
//! - [`tmr`]: the periodic timer driver built on the two above
//! - [`dwt`]: the free-running cycle counter used for profiling
//! - [`pipe`]: push/pop byte streams backing virtual device files
//! - [`trap`]: exception entry into the supervisor
//! - [`klog`]: serial console and the `log` backend
//!
//! # Errors
//! Recoverable failures travel as [`Errno`]. The negated-code convention of the
//! wire format is confined to [`syscall::abi`].
//!
//! # Hardware
//! Every driver is generic over [`hw::Bus`], so the same code runs against the
//! memory-mapped registers on target and against a simulated register file in
//! host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod dwt;
pub mod errno;
pub mod hw;
pub mod irq;
pub mod klog;
pub mod pipe;
pub mod syscall;
pub mod tmr;
pub mod trap;

#[cfg(target_os = "none")]
pub mod mm;

#[cfg(test)]
mod sim;

pub use config::PlatformConfig;
pub use errno::{Errno, SysResult};
pub use irq::{InterruptController, InterruptLine};
pub use pipe::{move_bytes, try_move, MemBufferPipe, MemReaderPipe, NullPipe, Pipe};
pub use syscall::{Bridge, ContextId, Kernel, Supervisor};
pub use tmr::TimerDriver;
