//! System Call ABI
//!
//! Layout of what crosses the privilege boundary: an opcode plus six argument
//! words going in, a [`SyscallResult`] record coming back.
//!
//! # Error convention
//! `SyscallResult::errcode` holds the *negated* error number, `0` meaning
//! success. This is the only place the sign flip exists; everything above the
//! ABI works with [`Errno`].

use core::fmt;

use crate::errno::{Errno, SysResult};

/// Number of argument words in a request.
pub const SYSCALL_ARGS: usize = 6;

/// Marker stamped into every result record.
pub const RESULT_SIGNATURE: u32 = 0xbeaf_face;

/// System call numbers
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// No operation
    Null = 0,
    /// Fetch the caller's result record
    GetBridge = 1,
    /// in: [0] = negated error number
    SetErrno = 2,
    /// out: errcode = stored (negated) error number
    GetErrno = 3,
    /// in: [0] = interrupt line
    SetupIrqWait = 4,
    /// in: [0] = interrupt line
    IrqWait = 5,
    /// in: [0] = interrupt line
    IrqClearAndWait = 6,
}

impl TryFrom<u32> for Opcode {
    type Error = Errno;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Null,
            1 => Self::GetBridge,
            2 => Self::SetErrno,
            3 => Self::GetErrno,
            4 => Self::SetupIrqWait,
            5 => Self::IrqWait,
            6 => Self::IrqClearAndWait,
            _ => return Err(Errno::NotImplemented),
        })
    }
}

/// Identifies one unprivileged execution context.
///
/// `0` is never handed out and marks "no context".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ContextId(u32);

impl ContextId {
    pub const INVALID: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// One call into the supervisor.
///
/// The opcode travels as a raw word: decoding is the supervisor's job, and an
/// unknown number must reach it so it can answer `ENOSYS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    pub opcode: u32,
    pub args: [u32; SYSCALL_ARGS],
}

impl SyscallRequest {
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode: opcode as u32,
            args: [0; SYSCALL_ARGS],
        }
    }

    /// Set argument word `index`. Out-of-range indices are ignored.
    pub fn with_arg(mut self, index: usize, value: u32) -> Self {
        if index < SYSCALL_ARGS {
            self.args[index] = value;
        }
        self
    }

    /// Argument word `index`; out-of-range indices read as `0`.
    pub fn arg(&self, index: usize) -> u32 {
        self.args.get(index).copied().unwrap_or(0)
    }
}

/// Record the supervisor hands back for every call.
///
/// Owned by the supervisor; callers only ever see it through a borrow that
/// ends before their next call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallResult {
    /// Always [`RESULT_SIGNATURE`].
    pub signature: u32,
    /// Context the record belongs to.
    pub context: ContextId,
    /// Negated error number; `0` on success.
    pub errcode: i32,
}

impl SyscallResult {
    pub const fn new(context: ContextId) -> Self {
        Self {
            signature: RESULT_SIGNATURE,
            context,
            errcode: 0,
        }
    }

    /// Decode `errcode`.
    pub const fn status(&self) -> SysResult<()> {
        Errno::from_wire(self.errcode)
    }
}
