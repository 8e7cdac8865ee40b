//! User-side System Call Bridge
//!
//! [`Bridge`] is the only way unprivileged code talks to the supervisor. It
//! binds one execution context to one [`Supervisor`] and wraps the raw call
//! with the errno accessors and the interrupt-wait operations.
//!
//! # Errno
//! The error slot lives on the supervisor side, one per context. Every
//! accessor first asks the supervisor whether it is running; before that,
//! reads give `0` and writes are dropped, and no call is issued.

use crate::errno::{self, Errno, SysResult};
use crate::irq::InterruptLine;

use super::abi::{ContextId, Opcode, SyscallRequest, SyscallResult, SYSCALL_ARGS};

/// The supervisor as seen from an unprivileged context.
pub trait Supervisor {
    /// Whether the supervisor has been started.
    fn is_running(&self) -> bool;

    /// Perform one call on behalf of `ctx`.
    ///
    /// The record stays valid only until the next call; the borrow enforces
    /// that callers cannot hold on to it.
    fn syscall(&mut self, ctx: ContextId, req: SyscallRequest) -> &SyscallResult;
}

impl<S: Supervisor + ?Sized> Supervisor for &mut S {
    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn syscall(&mut self, ctx: ContextId, req: SyscallRequest) -> &SyscallResult {
        (**self).syscall(ctx, req)
    }
}

/// One execution context's channel to the supervisor.
pub struct Bridge<S: Supervisor> {
    svc: S,
    ctx: ContextId,
}

impl<S: Supervisor> Bridge<S> {
    pub fn new(svc: S, ctx: ContextId) -> Self {
        Self { svc, ctx }
    }

    pub fn context(&self) -> ContextId {
        self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.svc.is_running()
    }

    /// Raw call. The record is only valid until the next call.
    pub fn sys_call(&mut self, opcode: Opcode, args: [u32; SYSCALL_ARGS]) -> &SyscallResult {
        log::trace!("{:?}: {:?}{:x?}", self.ctx, opcode, args);
        let req = SyscallRequest {
            opcode: opcode as u32,
            args,
        };
        self.svc.syscall(self.ctx, req)
    }

    fn call1(&mut self, opcode: Opcode, arg0: u32) -> &SyscallResult {
        self.sys_call(opcode, [arg0, 0, 0, 0, 0, 0])
    }

    /// Store `code` (positive, or `0` to clear) as this context's error.
    ///
    /// Returns the supervisor's acknowledgement: the stored value in wire
    /// form, so `0` after clearing and `-code` after recording an error.
    /// A negative `code` is a caller bug: `EINVAL` is stored instead and
    /// `-1` returned. Returns `0` without calling when the supervisor is
    /// not running.
    pub fn set_errno(&mut self, code: i32) -> i32 {
        if !self.is_running() {
            return 0;
        }
        if code < 0 {
            log::warn!("{:?}: set_errno({}) clamped to EINVAL", self.ctx, code);
            self.set_errno(errno::EINVAL);
            return -1;
        }
        self.call1(Opcode::SetErrno, code.wrapping_neg() as u32).errcode
    }

    /// This context's last error, `0` if none. `0` when not running.
    pub fn get_errno(&mut self) -> i32 {
        if !self.is_running() {
            return 0;
        }
        self.call1(Opcode::GetErrno, 0).errcode.wrapping_neg()
    }

    /// [`get_errno`](Self::get_errno) as a typed value.
    pub fn last_error(&mut self) -> Option<Errno> {
        Errno::from_code(self.get_errno())
    }

    /// Record `err` as this context's error and hand it back.
    ///
    /// For usage errors detected on the user side:
    /// `return Err(bridge.report(Errno::InvalidArgument))`.
    pub fn report(&mut self, err: Errno) -> Errno {
        self.set_errno(err.code());
        err
    }

    /// Register this context as the waiter for `line`.
    ///
    /// Must happen before the device can raise the line, otherwise the first
    /// event may come in before anyone is registered for it.
    pub fn setup_irq_wait(&mut self, line: InterruptLine) -> SysResult<()> {
        self.call1(Opcode::SetupIrqWait, line.raw()).status()
    }

    /// Block until `line` fires. Events that fired after arming but before
    /// this call complete it immediately.
    pub fn irq_wait(&mut self, line: InterruptLine) -> SysResult<()> {
        self.call1(Opcode::IrqWait, line.raw()).status()
    }

    /// Discard events already pending on `line`, then block for the next.
    pub fn irq_clear_and_wait(&mut self, line: InterruptLine) -> SysResult<()> {
        self.call1(Opcode::IrqClearAndWait, line.raw()).status()
    }

    /// Ask the supervisor which context this bridge is bound to.
    pub fn query_context(&mut self) -> SysResult<ContextId> {
        let rec = self.sys_call(Opcode::GetBridge, [0; SYSCALL_ARGS]);
        rec.status().map(|()| rec.context)
    }
}
