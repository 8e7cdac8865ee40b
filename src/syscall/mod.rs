//! System Call Interface
//!
//! The boundary between unprivileged code and the supervisor.
//!
//! - [`abi`]: request/result layout and opcode numbers
//! - [`bridge`]: the user-side wrapper ([`Bridge`]) and the [`Supervisor`]
//!   trait it calls through
//! - [`handler`]: the supervisor itself ([`Kernel`])
//!
//! # Current Syscalls
//! - 0: null
//! - 1: get_bridge() - fetch the caller's result record
//! - 2: set_errno(-code)
//! - 3: get_errno()
//! - 4: setup_irq_wait(line) - register as the waiter for a line
//! - 5: irq_wait(line) - block until the line fires
//! - 6: irq_clear_and_wait(line) - drop backlog, then block

pub mod abi;
mod bridge;
mod handler;

pub use abi::{ContextId, Opcode, SyscallRequest, SyscallResult};
pub use bridge::{Bridge, Supervisor};
pub use handler::{Kernel, KernelPort, SharedKernel, TaskContext, MAX_CONTEXTS};
