//! System Call Handler
//!
//! Supervisor side of the bridge: decodes requests, keeps the per-context
//! error slot, and owns the interrupt-wait table.
//!
//! # Error slot
//! Each [`TaskContext`] carries its own errno. It starts cleared when the
//! context is spawned, is overwritten by `SET_ERRNO`, and also records the
//! error of any call that fails, so `GET_ERRNO` reports the last failure of
//! that context. Contexts never see each other's slot.
//!
//! # Interrupt waits
//! A line can be armed by one context at a time. Interrupts that arrive for
//! an armed line are counted; `IRQ_WAIT` consumes one event, servicing the
//! interrupt controller until one shows up if none is pending.

use spin::Mutex;

use crate::errno::{Errno, SysResult};
use crate::hw::Bus;
use crate::irq::{InterruptController, InterruptLine, IRQ_LINES};

use super::abi::{ContextId, Opcode, SyscallRequest, SyscallResult};
use super::bridge::Supervisor;

/// Maximum number of live execution contexts.
pub const MAX_CONTEXTS: usize = 8;

/// Per-context supervisor state.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    live: bool,
    errno: Option<Errno>,
    record: SyscallResult,
}

impl TaskContext {
    const EMPTY: Self = Self {
        live: false,
        errno: None,
        record: SyscallResult::new(ContextId::INVALID),
    };

    /// Last error recorded for this context.
    pub fn errno(&self) -> Option<Errno> {
        self.errno
    }
}

/// Which context waits on each line, and how many events it has not yet
/// consumed.
#[derive(Debug)]
struct WaitTable {
    owner: [Option<ContextId>; IRQ_LINES as usize],
    pending: [u32; IRQ_LINES as usize],
}

impl WaitTable {
    const fn new() -> Self {
        Self {
            owner: [None; IRQ_LINES as usize],
            pending: [0; IRQ_LINES as usize],
        }
    }

    fn slot(line: InterruptLine) -> SysResult<usize> {
        match line.index() {
            Some(i) if !line.is_fault() => Ok(i),
            _ => Err(Errno::InvalidArgument),
        }
    }

    fn arm(&mut self, ctx: ContextId, line: InterruptLine) -> SysResult<()> {
        let i = Self::slot(line)?;
        match self.owner[i] {
            Some(owner) if owner != ctx => Err(Errno::Busy),
            _ => {
                // re-arming starts over; events from before do not count
                self.owner[i] = Some(ctx);
                self.pending[i] = 0;
                Ok(())
            }
        }
    }

    /// Line index if `ctx` is the armed waiter.
    fn armed_by(&self, ctx: ContextId, line: InterruptLine) -> SysResult<usize> {
        let i = Self::slot(line)?;
        if self.owner[i] == Some(ctx) {
            Ok(i)
        } else {
            Err(Errno::InvalidArgument)
        }
    }

    fn take(&mut self, i: usize) -> bool {
        if self.pending[i] > 0 {
            self.pending[i] -= 1;
            true
        } else {
            false
        }
    }

    fn deliver(&mut self, line: InterruptLine) {
        let Some(i) = line.index() else { return };
        if self.owner[i].is_some() {
            self.pending[i] = self.pending[i].saturating_add(1);
        } else {
            log::warn!("[IRQ] {:?} fired with no waiter", line);
        }
    }

    fn release_all(&mut self, ctx: ContextId) {
        for (owner, pending) in self.owner.iter_mut().zip(self.pending.iter_mut()) {
            if *owner == Some(ctx) {
                *owner = None;
                *pending = 0;
            }
        }
    }
}

/// The supervisor.
pub struct Kernel<B: Bus> {
    pic: InterruptController<B>,
    contexts: [TaskContext; MAX_CONTEXTS],
    waits: WaitTable,
    running: bool,
    faults: u32,
    /// Answer for calls from contexts that do not exist.
    orphan: SyscallResult,
}

impl<B: Bus> Kernel<B> {
    pub fn new(pic: InterruptController<B>) -> Self {
        Self {
            pic,
            contexts: [TaskContext::EMPTY; MAX_CONTEXTS],
            waits: WaitTable::new(),
            running: false,
            faults: 0,
            orphan: SyscallResult::new(ContextId::INVALID),
        }
    }

    /// Enable interrupt delivery and start accepting calls.
    pub fn start(&mut self) {
        self.pic.enable();
        self.running = true;
        log::info!("[KERNEL] supervisor running");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Create a context with a cleared error slot.
    ///
    /// Returns `ENOMEM` when the table is full.
    pub fn spawn_context(&mut self) -> SysResult<ContextId> {
        let (i, slot) = self
            .contexts
            .iter_mut()
            .enumerate()
            .find(|(_, c)| !c.live)
            .ok_or(Errno::OutOfMemory)?;
        let id = ContextId::new(i as u32 + 1);
        *slot = TaskContext {
            live: true,
            errno: None,
            record: SyscallResult::new(id),
        };
        log::debug!("[KERNEL] spawned {:?}", id);
        Ok(id)
    }

    /// Tear down a context and release every line it had armed.
    pub fn exit_context(&mut self, ctx: ContextId) -> SysResult<()> {
        let i = self.index_of(ctx).ok_or(Errno::NoProcess)?;
        self.contexts[i] = TaskContext::EMPTY;
        self.waits.release_all(ctx);
        log::debug!("[KERNEL] {:?} exited", ctx);
        Ok(())
    }

    pub fn context(&self, ctx: ContextId) -> Option<&TaskContext> {
        self.index_of(ctx).map(|i| &self.contexts[i])
    }

    /// Fault interrupts (undefined instruction, data abort) seen so far.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub fn interrupt_controller(&self) -> &InterruptController<B> {
        &self.pic
    }

    fn index_of(&self, ctx: ContextId) -> Option<usize> {
        let i = (ctx.raw() as usize).checked_sub(1)?;
        self.contexts.get(i).filter(|c| c.live).map(|_| i)
    }

    /// Dispatch a system call
    ///
    /// # Arguments
    /// * `ctx` - Calling context
    /// * `req` - Opcode and argument words
    ///
    /// # Returns
    /// The caller's result record, valid until its next call
    ///
    /// # Errors (in `errcode`)
    /// - Unknown context: `EINVAL` (no slot is touched)
    /// - Unknown opcode: `ENOSYS`
    /// - Supervisor not started: `EAGAIN` for everything but `NULL`, so a
    ///   `GET_BRIDGE` probe tells the caller whether calls will be served
    pub fn dispatch(&mut self, ctx: ContextId, req: SyscallRequest) -> &SyscallResult {
        let Some(i) = self.index_of(ctx) else {
            log::warn!("[SYSCALL] call from unknown {:?}", ctx);
            self.orphan = SyscallResult::new(ctx);
            self.orphan.errcode = Errno::InvalidArgument.to_wire();
            return &self.orphan;
        };

        let errcode = match Opcode::try_from(req.opcode) {
            Ok(Opcode::Null) => 0,
            Ok(_) if !self.running => self.fail(i, Errno::WouldBlock),
            Ok(Opcode::GetBridge) => 0,
            Ok(Opcode::GetErrno) => self.contexts[i].errno.map_or(0, Errno::to_wire),
            Ok(Opcode::SetErrno) => self.sys_set_errno(i, req.arg(0) as i32),
            Ok(Opcode::SetupIrqWait) => {
                let r = self.sys_setup_irq_wait(ctx, InterruptLine::new(req.arg(0)));
                self.complete(i, r)
            }
            Ok(Opcode::IrqWait) => {
                let r = self.sys_irq_wait(ctx, InterruptLine::new(req.arg(0)), false);
                self.complete(i, r)
            }
            Ok(Opcode::IrqClearAndWait) => {
                let r = self.sys_irq_wait(ctx, InterruptLine::new(req.arg(0)), true);
                self.complete(i, r)
            }
            Err(e) => {
                log::warn!("[SYSCALL] unknown syscall: {}", req.opcode);
                self.fail(i, e)
            }
        };

        let record = &mut self.contexts[i].record;
        record.errcode = errcode;
        record
    }

    fn complete(&mut self, i: usize, r: SysResult<()>) -> i32 {
        match r {
            Ok(()) => 0,
            Err(e) => self.fail(i, e),
        }
    }

    fn fail(&mut self, i: usize, e: Errno) -> i32 {
        self.contexts[i].errno = Some(e);
        e.to_wire()
    }

    /// Set errno system call
    ///
    /// `wire` is the already-negated code: `0` clears, negative stores.
    /// A positive value cannot come from the bridge and is refused.
    ///
    /// # Returns
    /// The stored value in wire form
    fn sys_set_errno(&mut self, i: usize, wire: i32) -> i32 {
        match wire.checked_neg() {
            Some(0) => {
                self.contexts[i].errno = None;
                0
            }
            Some(code) if code > 0 => {
                // from_code only refuses non-positive input
                let e = Errno::from_code(code).unwrap_or(Errno::InvalidArgument);
                self.contexts[i].errno = Some(e);
                wire
            }
            _ => {
                log::warn!("[SYSCALL] set_errno: malformed value {}", wire);
                self.fail(i, Errno::InvalidArgument)
            }
        }
    }

    /// Arm interrupt wait system call
    ///
    /// # Errors
    /// - `EINVAL`: line not implemented, or a fault line
    /// - `EBUSY`: another context has the line armed
    fn sys_setup_irq_wait(&mut self, ctx: ContextId, line: InterruptLine) -> SysResult<()> {
        self.waits.arm(ctx, line)?;
        log::debug!("[SYSCALL] {:?} armed {:?}", ctx, line);
        Ok(())
    }

    /// Interrupt wait system call
    ///
    /// Consumes one event for `line`, blocking until one arrives. With
    /// `clear`, events already pending are discarded first.
    ///
    /// # Errors
    /// - `EINVAL`: `line` is not armed by `ctx`
    fn sys_irq_wait(&mut self, ctx: ContextId, line: InterruptLine, clear: bool) -> SysResult<()> {
        let i = self.waits.armed_by(ctx, line)?;
        if clear {
            self.waits.pending[i] = 0;
        }
        while !self.waits.take(i) {
            if self.service_interrupt().is_none() {
                self.pic.bus().wait_for_interrupt();
            }
        }
        Ok(())
    }

    /// Run one acknowledge/deliver/retire cycle.
    ///
    /// Returns the line serviced, or `None` if nothing was pending.
    pub fn service_interrupt(&mut self) -> Option<InterruptLine> {
        let ack = self.pic.acknowledge()?;
        let line = ack.line();
        if line.is_fault() {
            self.faults += 1;
            log::error!("[IRQ] fault interrupt {:?}", line);
        } else {
            self.waits.deliver(line);
        }
        ack.retire();
        Some(line)
    }
}

impl<B: Bus> Supervisor for Kernel<B> {
    fn is_running(&self) -> bool {
        self.running
    }

    fn syscall(&mut self, ctx: ContextId, req: SyscallRequest) -> &SyscallResult {
        self.dispatch(ctx, req)
    }
}

/// A kernel shared by several contexts; calls are serialized by a spinlock.
pub struct SharedKernel<B: Bus> {
    inner: Mutex<Kernel<B>>,
}

impl<B: Bus> SharedKernel<B> {
    pub fn new(kernel: Kernel<B>) -> Self {
        Self {
            inner: Mutex::new(kernel),
        }
    }

    /// Lock the kernel for direct (supervisor-side) access.
    pub fn lock(&self) -> spin::MutexGuard<'_, Kernel<B>> {
        self.inner.lock()
    }

    /// A [`Supervisor`] handle for one context.
    pub fn port(&self) -> KernelPort<'_, B> {
        KernelPort {
            kernel: self,
            record: SyscallResult::new(ContextId::INVALID),
        }
    }
}

/// Per-caller handle onto a [`SharedKernel`].
///
/// Holds its own copy of the result record, taken while the lock was held.
pub struct KernelPort<'a, B: Bus> {
    kernel: &'a SharedKernel<B>,
    record: SyscallResult,
}

impl<B: Bus> Supervisor for KernelPort<'_, B> {
    fn is_running(&self) -> bool {
        self.kernel.inner.lock().is_running()
    }

    fn syscall(&mut self, ctx: ContextId, req: SyscallRequest) -> &SyscallResult {
        self.record = *self.kernel.inner.lock().dispatch(ctx, req);
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno;
    use crate::hw::regs;
    use crate::sim::SimBus;
    use crate::syscall::Bridge;

    fn kernel(sim: &SimBus) -> Kernel<&SimBus> {
        let mut k = Kernel::new(InterruptController::new(sim, regs::pic::BASE));
        k.start();
        k
    }

    fn call(k: &mut Kernel<&SimBus>, ctx: ContextId, op: Opcode, arg0: u32) -> i32 {
        k.dispatch(ctx, SyscallRequest::new(op).with_arg(0, arg0)).errcode
    }

    #[test]
    fn test_fresh_context_has_no_error() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        assert_eq!(call(&mut k, ctx, Opcode::GetErrno, 0), 0);
    }

    #[test]
    fn test_errno_slots_are_per_context() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let a = k.spawn_context().unwrap();
        let b = k.spawn_context().unwrap();

        Bridge::new(&mut k, a).set_errno(errno::EIO);
        assert_eq!(Bridge::new(&mut k, b).get_errno(), 0);
        assert_eq!(Bridge::new(&mut k, a).get_errno(), errno::EIO);
    }

    #[test]
    fn test_unknown_opcode_is_enosys() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        let req = SyscallRequest {
            opcode: 77,
            args: [0; 6],
        };
        assert_eq!(k.dispatch(ctx, req).errcode, -errno::ENOSYS);
        assert_eq!(k.context(ctx).unwrap().errno(), Some(Errno::NotImplemented));
    }

    #[test]
    fn test_unknown_context_gets_einval() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ghost = ContextId::new(5);
        assert_eq!(call(&mut k, ghost, Opcode::GetErrno, 0), -errno::EINVAL);
        assert_eq!(call(&mut k, ContextId::INVALID, Opcode::Null, 0), -errno::EINVAL);
    }

    #[test]
    fn test_calls_before_start_are_refused() {
        let sim = SimBus::new();
        let mut k = Kernel::new(InterruptController::new(&sim, regs::pic::BASE));
        let ctx = k.spawn_context().unwrap();
        assert!(!k.is_running());
        assert_eq!(call(&mut k, ctx, Opcode::Null, 0), 0);
        assert_eq!(call(&mut k, ctx, Opcode::SetupIrqWait, 1), -errno::EAGAIN);
    }

    #[test]
    fn test_get_bridge_reports_running_state() {
        let sim = SimBus::new();
        let mut k = Kernel::new(InterruptController::new(&sim, regs::pic::BASE));
        let ctx = k.spawn_context().unwrap();

        let rec = *k.dispatch(ctx, SyscallRequest::new(Opcode::GetBridge));
        assert_eq!(rec.errcode, -errno::EAGAIN);
        assert_eq!(rec.context, ctx);

        k.start();
        assert_eq!(call(&mut k, ctx, Opcode::GetBridge, 0), 0);
        assert_eq!(Bridge::new(&mut k, ctx).query_context(), Ok(ctx));
    }

    #[test]
    fn test_malformed_set_errno() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        assert_eq!(call(&mut k, ctx, Opcode::SetErrno, 5), -errno::EINVAL);
        assert_eq!(call(&mut k, ctx, Opcode::SetErrno, i32::MIN as u32), -errno::EINVAL);
        assert_eq!(call(&mut k, ctx, Opcode::GetErrno, 0), -errno::EINVAL);
    }

    #[test]
    fn test_line_has_single_waiter() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let a = k.spawn_context().unwrap();
        let b = k.spawn_context().unwrap();
        let line = InterruptLine::TMR2;

        assert_eq!(Bridge::new(&mut k, a).setup_irq_wait(line), Ok(()));
        assert_eq!(Bridge::new(&mut k, a).setup_irq_wait(line), Ok(()));
        assert_eq!(Bridge::new(&mut k, b).setup_irq_wait(line), Err(Errno::Busy));
        assert_eq!(Bridge::new(&mut k, b).get_errno(), errno::EBUSY);

        k.exit_context(a).unwrap();
        assert_eq!(Bridge::new(&mut k, b).setup_irq_wait(line), Ok(()));
    }

    #[test]
    fn test_fault_and_unimplemented_lines_rejected() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        let mut b = Bridge::new(&mut k, ctx);
        assert_eq!(b.setup_irq_wait(InterruptLine::DABT), Err(Errno::InvalidArgument));
        assert_eq!(b.setup_irq_wait(InterruptLine::new(32)), Err(Errno::InvalidArgument));
    }

    #[test]
    fn test_wait_requires_arming() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        let mut b = Bridge::new(&mut k, ctx);
        assert_eq!(b.irq_wait(InterruptLine::VBLK), Err(Errno::InvalidArgument));
    }

    #[test]
    fn test_pending_event_completes_wait() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        Bridge::new(&mut k, ctx).setup_irq_wait(InterruptLine::VBLK).unwrap();

        sim.raise(InterruptLine::VBLK);
        assert_eq!(k.service_interrupt(), Some(InterruptLine::VBLK));

        let ticks = sim.ticks();
        assert_eq!(Bridge::new(&mut k, ctx).irq_wait(InterruptLine::VBLK), Ok(()));
        assert_eq!(sim.ticks(), ticks);
        assert_eq!(sim.retired(), [InterruptLine::VBLK.raw()]);
    }

    #[test]
    fn test_clear_and_wait_skips_backlog() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();
        let line = InterruptLine::TMR0;
        Bridge::new(&mut k, ctx).setup_irq_wait(line).unwrap();

        // stale event from before the call
        sim.raise(line);
        k.service_interrupt();

        // channel 0 fires every 3 ticks
        sim.write32(regs::tmr::channel_reg(regs::tmr::BASE, 0, regs::tmr::PER), 3);
        sim.write32(regs::tmr::channel_reg(regs::tmr::BASE, 0, regs::tmr::CTRL), regs::ENABLE);

        assert_eq!(Bridge::new(&mut k, ctx).irq_clear_and_wait(line), Ok(()));
        assert_eq!(sim.fires(0), 1);
        assert_eq!(sim.ticks(), 3);
    }

    #[test]
    fn test_fault_interrupt_is_counted_and_retired() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        sim.raise(InterruptLine::UNDF);
        assert_eq!(k.service_interrupt(), Some(InterruptLine::UNDF));
        assert_eq!(k.faults(), 1);
        assert_eq!(sim.retired(), [InterruptLine::UNDF.raw()]);
        assert_eq!(k.service_interrupt(), None);
    }

    #[test]
    fn test_unclaimed_interrupt_is_dropped() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        let ctx = k.spawn_context().unwrap();

        sim.raise(InterruptLine::APUS);
        k.service_interrupt();
        Bridge::new(&mut k, ctx).setup_irq_wait(InterruptLine::APUS).unwrap();
        sim.raise(InterruptLine::APUS);
        k.service_interrupt();
        assert_eq!(Bridge::new(&mut k, ctx).irq_wait(InterruptLine::APUS), Ok(()));
        assert!(sim.violations().is_empty());
    }

    #[test]
    fn test_context_table_full() {
        let sim = SimBus::new();
        let mut k = kernel(&sim);
        for _ in 0..MAX_CONTEXTS {
            k.spawn_context().unwrap();
        }
        assert_eq!(k.spawn_context(), Err(Errno::OutOfMemory));
        k.exit_context(ContextId::new(3)).unwrap();
        assert_eq!(k.spawn_context(), Ok(ContextId::new(3)));
    }

    #[test]
    fn test_shared_kernel_ports() {
        let sim = SimBus::new();
        let shared = SharedKernel::new(kernel(&sim));
        let a = shared.lock().spawn_context().unwrap();
        let b = shared.lock().spawn_context().unwrap();

        let mut ba = Bridge::new(shared.port(), a);
        let mut bb = Bridge::new(shared.port(), b);
        ba.set_errno(errno::ETIMEDOUT);
        bb.set_errno(errno::EPERM);
        assert_eq!(ba.get_errno(), errno::ETIMEDOUT);
        assert_eq!(bb.get_errno(), errno::EPERM);
        assert_eq!(ba.setup_irq_wait(InterruptLine::TMR1), Ok(()));
        assert_eq!(bb.setup_irq_wait(InterruptLine::TMR1), Err(Errno::Busy));
    }
}
