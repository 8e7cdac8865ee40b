//! Error Codes
//!
//! [`Errno`] is the error type of every fallible operation in the crate. It
//! carries POSIX error numbers; the sign flip used on the wire is applied only
//! by [`Errno::to_wire`] and [`Errno::from_wire`].

use core::fmt;

/// Result type for bridge, driver and dispatcher operations.
pub type SysResult<T> = Result<T, Errno>;

/// Operation not permitted.
pub const EPERM: i32 = 1;
/// No such file or directory.
pub const ENOENT: i32 = 2;
/// No such process.
pub const ESRCH: i32 = 3;
/// Interrupted system call.
pub const EINTR: i32 = 4;
/// I/O error.
pub const EIO: i32 = 5;
/// Try again.
pub const EAGAIN: i32 = 11;
/// Out of memory.
pub const ENOMEM: i32 = 12;
/// Bad address.
pub const EFAULT: i32 = 14;
/// Device or resource busy.
pub const EBUSY: i32 = 16;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// No space left on device.
pub const ENOSPC: i32 = 28;
/// Function not implemented.
pub const ENOSYS: i32 = 38;
/// Timed out.
pub const ETIMEDOUT: i32 = 110;

/// POSIX-style error number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    /// EPERM
    PermissionDenied,
    /// ENOENT
    NotFound,
    /// ESRCH
    NoProcess,
    /// EINTR
    Interrupted,
    /// EIO
    Io,
    /// EAGAIN
    WouldBlock,
    /// ENOMEM
    OutOfMemory,
    /// EFAULT
    BadAddress,
    /// EBUSY
    Busy,
    /// EINVAL
    InvalidArgument,
    /// ENOSPC
    NoSpace,
    /// ENOSYS
    NotImplemented,
    /// ETIMEDOUT
    Timeout,
    /// Any other positive code.
    ///
    /// Never holds a code that has a named variant; build through
    /// [`Errno::from_code`].
    Other(i32),
}

impl Errno {
    /// Map a conventional (positive) error number.
    ///
    /// Returns `None` for `0` ("no error") and for negative input, which is
    /// not a valid error number in this representation.
    pub const fn from_code(code: i32) -> Option<Self> {
        let errno = match code {
            EPERM => Self::PermissionDenied,
            ENOENT => Self::NotFound,
            ESRCH => Self::NoProcess,
            EINTR => Self::Interrupted,
            EIO => Self::Io,
            EAGAIN => Self::WouldBlock,
            ENOMEM => Self::OutOfMemory,
            EFAULT => Self::BadAddress,
            EBUSY => Self::Busy,
            EINVAL => Self::InvalidArgument,
            ENOSPC => Self::NoSpace,
            ENOSYS => Self::NotImplemented,
            ETIMEDOUT => Self::Timeout,
            c if c > 0 => Self::Other(c),
            _ => return None,
        };
        Some(errno)
    }

    /// The conventional positive error number.
    pub const fn code(self) -> i32 {
        match self {
            Self::PermissionDenied => EPERM,
            Self::NotFound => ENOENT,
            Self::NoProcess => ESRCH,
            Self::Interrupted => EINTR,
            Self::Io => EIO,
            Self::WouldBlock => EAGAIN,
            Self::OutOfMemory => ENOMEM,
            Self::BadAddress => EFAULT,
            Self::Busy => EBUSY,
            Self::InvalidArgument => EINVAL,
            Self::NoSpace => ENOSPC,
            Self::NotImplemented => ENOSYS,
            Self::Timeout => ETIMEDOUT,
            Self::Other(c) => c,
        }
    }

    /// Encode for the result record: the negated error number.
    ///
    /// An `Other` holding a non-positive number has no valid encoding and
    /// goes out as `-EIO`.
    pub const fn to_wire(self) -> i32 {
        match self.code() {
            c if c > 0 => -c,
            _ => -EIO,
        }
    }

    /// Decode a result-record `errcode`.
    ///
    /// `0` is success. A positive value cannot come from a well-behaved
    /// supervisor and is reported as [`Errno::Io`].
    pub const fn from_wire(errcode: i32) -> SysResult<()> {
        if errcode == 0 {
            return Ok(());
        }
        match errcode.checked_neg() {
            Some(code) if code > 0 => match Self::from_code(code) {
                Some(errno) => Err(errno),
                None => Err(Self::Io),
            },
            _ => Err(Self::Io),
        }
    }

    /// Short description, as `strerror` would give it.
    pub const fn message(self) -> &'static str {
        match self {
            Self::PermissionDenied => "Operation not permitted",
            Self::NotFound => "No such file or directory",
            Self::NoProcess => "No such process",
            Self::Interrupted => "Interrupted system call",
            Self::Io => "I/O error",
            Self::WouldBlock => "Try again",
            Self::OutOfMemory => "Out of memory",
            Self::BadAddress => "Bad address",
            Self::Busy => "Device or resource busy",
            Self::InvalidArgument => "Invalid argument",
            Self::NoSpace => "No space left on device",
            Self::NotImplemented => "Function not implemented",
            Self::Timeout => "Timed out",
            Self::Other(_) => "Unknown error",
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "{} {}", self.message(), code),
            _ => f.write_str(self.message()),
        }
    }
}
