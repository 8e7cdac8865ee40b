//! Growable memory buffer pipe.

use alloc::vec::Vec;
use core::fmt;

use super::Pipe;

/// Bytes per line in a [`HexDump`].
const DUMP_LINE: usize = 16;

/// In-memory pipe backed by a `Vec<u8>`.
///
/// Pushed bytes are kept for the life of the buffer; popping only advances a
/// read cursor, so [`seek_pop`](Self::seek_pop) can rewind it.
#[derive(Debug, Default)]
pub struct MemBufferPipe {
    buf: Vec<u8>,
    cursor: usize,
    limit: Option<usize>,
    pushed: usize,
    popped: usize,
}

impl MemBufferPipe {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            cursor: 0,
            limit: None,
            pushed: 0,
            popped: 0,
        }
    }

    /// A buffer that refuses pushes once it holds `limit` bytes.
    pub const fn with_limit(limit: usize) -> Self {
        let mut pipe = Self::new();
        pipe.limit = Some(limit);
        pipe
    }

    /// Bytes stored, popped or not.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes accepted so far.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Bytes popped so far, counting re-reads after a seek.
    pub fn popped(&self) -> usize {
        self.popped
    }

    /// Move the read cursor to `offset`. Past the end, pops return `None`.
    pub fn seek_pop(&mut self, offset: usize) {
        self.cursor = offset;
    }

    /// Hex rendering of the whole buffer.
    pub fn dump(&self) -> HexDump<'_> {
        HexDump(&self.buf)
    }

    /// Write the hex dump to the log, one line per 16 bytes.
    pub fn log_dump(&self) {
        for chunk in self.buf.chunks(DUMP_LINE) {
            log::debug!("{}", HexLine(chunk));
        }
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.buf.len() >= limit)
    }
}

impl Pipe for MemBufferPipe {
    fn push(&mut self, byte: u8) -> bool {
        if self.is_full() || self.buf.try_reserve(1).is_err() {
            return false;
        }
        self.buf.push(byte);
        self.pushed += 1;
        true
    }

    fn pop(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.cursor)?;
        self.cursor += 1;
        self.popped += 1;
        Some(byte)
    }
}

/// `0x%02x,` per byte, a newline after every full line of 16.
pub struct HexDump<'a>(&'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.chunks(DUMP_LINE) {
            write!(f, "{}", HexLine(chunk))?;
            if chunk.len() == DUMP_LINE {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

struct HexLine<'a>(&'a [u8]);

impl fmt::Display for HexLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "0x{:02x},", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_follows_push_order() {
        let mut p = MemBufferPipe::new();
        assert!(p.push_slice(&[1, 2, 3]));
        assert_eq!(p.pop(), Some(1));
        assert_eq!(p.pop(), Some(2));
        assert!(p.push(4));
        assert_eq!(p.pop(), Some(3));
        assert_eq!(p.pop(), Some(4));
        assert_eq!(p.pop(), None);
        assert_eq!((p.pushed(), p.popped()), (4, 4));
    }

    #[test]
    fn test_seek_rewinds() {
        let mut p = MemBufferPipe::new();
        p.push_str("hey");
        while p.pop().is_some() {}
        p.seek_pop(1);
        assert_eq!(p.pop(), Some(b'e'));
        assert_eq!(p.len(), 3);
        p.seek_pop(99);
        assert_eq!(p.pop(), None);
    }

    #[test]
    fn test_limit_refuses() {
        let mut p = MemBufferPipe::with_limit(1);
        assert!(p.push(0xaa));
        assert!(!p.push(0xbb));
        assert_eq!(p.pushed(), 1);
        assert_eq!(p.as_bytes(), [0xaa]);
    }

    #[test]
    fn test_dump_two_full_lines() {
        let mut p = MemBufferPipe::new();
        for b in 0x01..=0x20u8 {
            p.push(b);
        }
        let text = p.dump().to_string();
        let lines: Vec<&str> = text.split_terminator('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0x01,0x02,0x03,0x04,0x05,0x06,0x07,0x08,0x09,0x0a,0x0b,0x0c,0x0d,0x0e,0x0f,0x10,"
        );
        assert_eq!(
            lines[1],
            "0x11,0x12,0x13,0x14,0x15,0x16,0x17,0x18,0x19,0x1a,0x1b,0x1c,0x1d,0x1e,0x1f,0x20,"
        );
        assert!(text.ends_with(",\n"));
    }

    #[test]
    fn test_dump_partial_line() {
        let mut p = MemBufferPipe::new();
        p.push_slice(&[0xff, 0x00]);
        assert_eq!(p.dump().to_string(), "0xff,0x00,");
        assert_eq!(MemBufferPipe::new().dump().to_string(), "");
    }
}
