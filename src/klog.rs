//! Kernel Console and Logging
//!
//! The console is serial channel 0. [`kprint!`] and [`kprintln!`] write to it
//! directly; library code logs through the `log` facade, which [`init`] points
//! at the same console.
//!
//! Before [`init`] runs, console output is dropped.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::drivers::sci::SciTx;
use crate::hw::Mmio;

/// Global console, `None` until [`init`].
pub static CONSOLE: Mutex<Option<SciTx<Mmio>>> = Mutex::new(None);

static LOGGER: ConsoleLogger = ConsoleLogger;

/// `log` backend writing to [`CONSOLE`].
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = CONSOLE.lock().as_mut() {
            let _ = write_record(console, record);
        }
    }

    fn flush(&self) {}
}

/// Render one log line as `[LEVEL] module: message`.
pub fn write_record<W: Write>(out: &mut W, record: &Record<'_>) -> fmt::Result {
    let target = record.target();
    let module = target.strip_prefix("keel::").unwrap_or(target);
    writeln!(out, "[{:<5}] {}: {}", record.level(), module, record.args())
}

/// Bring up the console and install [`ConsoleLogger`].
///
/// # Safety
/// The serial register window must be mapped device memory (see
/// [`Mmio::new`]).
pub unsafe fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    // SAFETY: forwarded to the caller
    let bus = unsafe { Mmio::new() };
    *CONSOLE.lock() = Some(SciTx::console(bus));
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    log::info!("console up, level {}", level);
    Ok(())
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    if let Some(console) = CONSOLE.lock().as_mut() {
        let _ = console.write_fmt(args);
    }
}

/// Print to the kernel console.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::klog::_print(format_args!($($arg)*))
    };
}

/// Print to the kernel console, with a newline.
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}
