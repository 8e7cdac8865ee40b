//! Trap Entry
//!
//! Glue between the exception vectors and the supervisor. The board's vector
//! stubs save a [`TrapFrame`] and call in here.
//!
//! # Calling convention (SVC)
//! - `x8`: opcode
//! - `x0`-`x5`: argument words
//! - on return `x0` holds the sign-extended `errcode`, `x1` the context id
//!
//! # Faults
//! A data or instruction abort from a context ends that context; the
//! supervisor keeps running.

use crate::hw::Bus;
use crate::syscall::abi::SYSCALL_ARGS;
use crate::syscall::{ContextId, Kernel, SyscallRequest};

/// Register state saved on trap entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    /// General purpose registers x0-x30
    pub gpr: [u64; 31],
    /// Exception Link Register (return address)
    pub elr: u64,
    /// Saved Program Status Register
    pub spsr: u64,
    /// Exception Syndrome Register
    pub esr: u64,
    /// Fault Address Register
    pub far: u64,
}

impl TrapFrame {
    /// Frame for an `svc` with `opcode` in x8 and `args` in x0-x5.
    pub fn svc(opcode: u32, args: &[u32]) -> Self {
        let mut frame = Self {
            esr: (ExceptionClass::SvcAarch64 as u64) << 26,
            ..Self::default()
        };
        frame.gpr[8] = opcode as u64;
        for (reg, &arg) in frame.gpr.iter_mut().zip(args.iter().take(SYSCALL_ARGS)) {
            *reg = arg as u64;
        }
        frame
    }

    pub fn class(&self) -> ExceptionClass {
        ExceptionClass::from(self.esr)
    }

    fn request(&self) -> SyscallRequest {
        let mut args = [0u32; SYSCALL_ARGS];
        for (arg, &reg) in args.iter_mut().zip(self.gpr.iter()) {
            *arg = reg as u32;
        }
        SyscallRequest {
            opcode: self.gpr[8] as u32,
            args,
        }
    }
}

/// Exception class extracted from ESR_EL1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionClass {
    Unknown = 0x00,
    SvcAarch64 = 0x15,
    InstructionAbortLowerEl = 0x20,
    InstructionAbortSameEl = 0x21,
    DataAbortLowerEl = 0x24,
    DataAbortSameEl = 0x25,
    Other = 0xFF,
}

impl From<u64> for ExceptionClass {
    fn from(esr: u64) -> Self {
        match (esr >> 26) & 0x3F {
            0x00 => ExceptionClass::Unknown,
            0x15 => ExceptionClass::SvcAarch64,
            0x20 => ExceptionClass::InstructionAbortLowerEl,
            0x21 => ExceptionClass::InstructionAbortSameEl,
            0x24 => ExceptionClass::DataAbortLowerEl,
            0x25 => ExceptionClass::DataAbortSameEl,
            _ => ExceptionClass::Other,
        }
    }
}

/// What a synchronous trap from a context turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// System call answered; the frame holds the result.
    Syscall { errcode: i32 },
    /// The context faulted and was ended.
    Terminated { class: ExceptionClass, far: u64 },
    /// Nothing the supervisor handles; the caller decides.
    Unhandled(ExceptionClass),
}

/// Handle a synchronous exception taken from context `ctx`.
///
/// # Arguments
/// * `kernel` - The supervisor
/// * `ctx` - Context that was running
/// * `frame` - Saved registers; updated in place for system calls
pub fn handle_sync_lower_el<B: Bus>(
    kernel: &mut Kernel<B>,
    ctx: ContextId,
    frame: &mut TrapFrame,
) -> TrapOutcome {
    match frame.class() {
        ExceptionClass::SvcAarch64 => {
            let result = *kernel.dispatch(ctx, frame.request());
            frame.gpr[0] = result.errcode as i64 as u64;
            frame.gpr[1] = result.context.raw() as u64;
            TrapOutcome::Syscall {
                errcode: result.errcode,
            }
        }
        class @ (ExceptionClass::DataAbortLowerEl | ExceptionClass::InstructionAbortLowerEl) => {
            log::error!(
                "[EXCEPTION] {:?} abort at 0x{:016x}, esr 0x{:016x}",
                ctx,
                frame.far,
                frame.esr
            );
            if kernel.exit_context(ctx).is_err() {
                log::warn!("[EXCEPTION] {:?} was not live", ctx);
            }
            TrapOutcome::Terminated {
                class,
                far: frame.far,
            }
        }
        class => {
            log::error!("[EXCEPTION] unhandled {:?}, esr 0x{:016x}", class, frame.esr);
            TrapOutcome::Unhandled(class)
        }
    }
}

/// Handle an IRQ exception: acknowledge and retire everything pending.
///
/// Returns the number of interrupts serviced.
pub fn handle_irq<B: Bus>(kernel: &mut Kernel<B>) -> usize {
    let mut serviced = 0;
    while let Some(line) = kernel.service_interrupt() {
        log::trace!("[IRQ] serviced {:?}", line);
        serviced += 1;
    }
    serviced
}

/// User-side supervisor that enters the kernel with `svc #0`.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub mod svc {
    use core::arch::asm;

    use crate::syscall::abi::SYSCALL_ARGS;
    use crate::syscall::{ContextId, Opcode, Supervisor, SyscallRequest, SyscallResult};

    /// Issues real supervisor calls.
    pub struct SvcTrap {
        record: SyscallResult,
        running: bool,
    }

    impl SvcTrap {
        /// # Safety
        /// Must run below EL1 with the kernel's vectors installed.
        pub const unsafe fn new() -> Self {
            Self {
                record: SyscallResult::new(ContextId::INVALID),
                running: false,
            }
        }

        /// Probe the kernel with `GET_BRIDGE`; later calls go through only
        /// if it answered.
        pub fn connect(&mut self) -> bool {
            let errcode = self.raw(SyscallRequest::new(Opcode::GetBridge));
            self.running = errcode == 0;
            self.running
        }

        fn raw(&mut self, req: SyscallRequest) -> i32 {
            let mut x: [u64; SYSCALL_ARGS] = [0; SYSCALL_ARGS];
            for (reg, &arg) in x.iter_mut().zip(req.args.iter()) {
                *reg = arg as u64;
            }
            let ctx: u64;
            // SAFETY: `new` guarantees the trap lands in the kernel, which
            // only writes x0 and x1.
            unsafe {
                asm!(
                    "svc #0",
                    inout("x0") x[0],
                    inout("x1") x[1] => ctx,
                    in("x2") x[2],
                    in("x3") x[3],
                    in("x4") x[4],
                    in("x5") x[5],
                    in("x8") req.opcode as u64,
                    options(nostack)
                );
            }
            self.record.context = ContextId::new(ctx as u32);
            self.record.errcode = x[0] as i64 as i32;
            self.record.errcode
        }
    }

    impl Supervisor for SvcTrap {
        fn is_running(&self) -> bool {
            self.running
        }

        fn syscall(&mut self, _ctx: ContextId, req: SyscallRequest) -> &SyscallResult {
            self.raw(req);
            &self.record
        }
    }
}
