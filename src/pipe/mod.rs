//! Byte Pipes
//!
//! A [`Pipe`] is anything bytes can be pushed into or popped out of. Virtual
//! device files are built by moving bytes from a source pipe into a sink
//! pipe with [`move_bytes`].
//!
//! # Variants
//! - [`NullPipe`]: accepts and discards everything
//! - [`MemBufferPipe`]: growable in-memory buffer, with a hex dump
//! - [`MemReaderPipe`]: reads out of a borrowed byte slice
//! - [`SciTx`](crate::drivers::sci::SciTx): serial transmit FIFO
//!
//! # Backpressure
//! [`move_bytes`] drains the source completely and counts the bytes a sink
//! refused; it never retries. Callers that must not lose data use
//! [`try_move`], which stops at the first refusal.

mod membuf;
mod null;
mod reader;

use core::fmt;

pub use membuf::{HexDump, MemBufferPipe};
pub use null::NullPipe;
pub use reader::MemReaderPipe;

/// A byte stream endpoint.
pub trait Pipe {
    /// Offer one byte. `false` means the pipe did not take it.
    fn push(&mut self, byte: u8) -> bool;

    /// Take the next byte, or `None` when there is nothing left.
    fn pop(&mut self) -> Option<u8>;

    /// Push every byte of `bytes`, even after a refusal.
    ///
    /// Returns `true` only if all of them were taken.
    fn push_slice(&mut self, bytes: &[u8]) -> bool {
        let mut ok = true;
        for &b in bytes {
            ok &= self.push(b);
        }
        ok
    }

    /// Push the UTF-8 bytes of `s`. See [`push_slice`](Self::push_slice).
    fn push_str(&mut self, s: &str) -> bool {
        self.push_slice(s.as_bytes())
    }
}

impl<P: Pipe + ?Sized> Pipe for &mut P {
    fn push(&mut self, byte: u8) -> bool {
        (**self).push(byte)
    }

    fn pop(&mut self) -> Option<u8> {
        (**self).pop()
    }
}

/// Outcome of [`move_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveReport {
    /// Bytes the sink accepted.
    pub moved: usize,
    /// Bytes the sink refused; these are gone.
    pub dropped: usize,
}

impl MoveReport {
    pub fn is_lossless(&self) -> bool {
        self.dropped == 0
    }
}

/// Drain `source` into `sink`.
///
/// Pops until the source is empty. A byte the sink refuses is dropped and
/// counted in [`MoveReport::dropped`]; the move carries on with the next.
pub fn move_bytes<S, D>(source: &mut S, sink: &mut D) -> MoveReport
where
    S: Pipe + ?Sized,
    D: Pipe + ?Sized,
{
    let mut report = MoveReport::default();
    while let Some(byte) = source.pop() {
        if sink.push(byte) {
            report.moved += 1;
        } else {
            report.dropped += 1;
        }
    }
    if !report.is_lossless() {
        log::warn!("pipe: sink dropped {} of {} bytes", report.dropped, report.moved + report.dropped);
    }
    report
}

/// A byte the sink refused, handed back by [`try_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    /// The refused byte. It has already left the source.
    pub byte: u8,
    /// Bytes moved before it.
    pub moved: usize,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink refused byte 0x{:02x} after {} bytes", self.byte, self.moved)
    }
}

/// Move bytes from `source` to `sink`, stopping at the first refusal.
///
/// Returns the number of bytes moved once the source is empty.
pub fn try_move<S, D>(source: &mut S, sink: &mut D) -> Result<usize, Rejected>
where
    S: Pipe + ?Sized,
    D: Pipe + ?Sized,
{
    let mut moved = 0;
    while let Some(byte) = source.pop() {
        if !sink.push(byte) {
            return Err(Rejected { byte, moved });
        }
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_source(n: u8) -> MemBufferPipe {
        let mut src = MemBufferPipe::new();
        for b in 1..=n {
            assert!(src.push(b));
        }
        src
    }

    #[test]
    fn test_move_into_buffer_keeps_order() {
        let mut src = counting_source(40);
        let mut sink = MemBufferPipe::new();
        let report = move_bytes(&mut src, &mut sink);
        assert_eq!(report, MoveReport { moved: 40, dropped: 0 });
        assert_eq!(sink.as_bytes(), (1..=40).collect::<std::vec::Vec<u8>>());
        assert_eq!(src.pop(), None);
    }

    #[test]
    fn test_move_then_dump_two_lines() {
        let data: std::vec::Vec<u8> = (0x01..=0x20).collect();
        let mut src = MemReaderPipe::new(&data);
        let mut sink = MemBufferPipe::new();

        assert_eq!(move_bytes(&mut src, &mut sink), MoveReport { moved: 32, dropped: 0 });
        assert_eq!(src.pop(), None);
        assert_eq!(
            sink.dump().to_string(),
            "0x01,0x02,0x03,0x04,0x05,0x06,0x07,0x08,0x09,0x0a,0x0b,0x0c,0x0d,0x0e,0x0f,0x10,\n\
             0x11,0x12,0x13,0x14,0x15,0x16,0x17,0x18,0x19,0x1a,0x1b,0x1c,0x1d,0x1e,0x1f,0x20,\n"
        );
    }

    #[test]
    fn test_move_into_null_drains_source() {
        let mut src = counting_source(9);
        let mut sink = NullPipe::new();
        let report = move_bytes(&mut src, &mut sink);
        assert_eq!(report.moved, 9);
        assert_eq!(src.pop(), None);
        assert_eq!(sink.pop(), None);
        assert_eq!(sink.pushed(), 9);
    }

    #[test]
    fn test_refused_bytes_are_counted() {
        let mut src = counting_source(10);
        let mut sink = MemBufferPipe::with_limit(4);
        let report = move_bytes(&mut src, &mut sink);
        assert_eq!(report, MoveReport { moved: 4, dropped: 6 });
        assert!(!report.is_lossless());
        assert_eq!(sink.as_bytes(), [1, 2, 3, 4]);
        assert_eq!(src.pop(), None);
    }

    #[test]
    fn test_try_move_stops_at_refusal() {
        let mut src = counting_source(10);
        let mut sink = MemBufferPipe::with_limit(3);
        assert_eq!(try_move(&mut src, &mut sink), Err(Rejected { byte: 4, moved: 3 }));
        // the rest is still in the source
        assert_eq!(src.pop(), Some(5));
    }

    #[test]
    fn test_try_move_ok() {
        let data = [7u8, 8, 9];
        let mut src = MemReaderPipe::new(&data);
        let mut sink = MemBufferPipe::new();
        assert_eq!(try_move(&mut src, &mut sink), Ok(3));
        assert_eq!(sink.as_bytes(), data);
    }

    #[test]
    fn test_move_through_trait_objects() {
        let data = *b"dyn";
        let mut src = MemReaderPipe::new(&data);
        let mut sink = MemBufferPipe::new();
        let src_dyn: &mut dyn Pipe = &mut src;
        let sink_dyn: &mut dyn Pipe = &mut sink;
        move_bytes(src_dyn, sink_dyn);
        assert_eq!(sink.as_bytes(), b"dyn");
    }

    #[test]
    fn test_push_str_reports_partial_failure() {
        let mut sink = MemBufferPipe::with_limit(2);
        assert!(!sink.push_str("abc"));
        assert_eq!(sink.as_bytes(), b"ab");
        assert!(NullPipe::new().push_str("anything"));
    }
}
