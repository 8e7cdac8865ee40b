use super::Pipe;

/// Source that pops the bytes of a borrowed slice in order.
///
/// Pushing is refused: the slice is read-only.
#[derive(Debug)]
pub struct MemReaderPipe<'a> {
    data: &'a [u8],
    popped: usize,
}

impl<'a> MemReaderPipe<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, popped: 0 }
    }

    /// Total size of the underlying slice.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet popped.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.popped)
    }

    /// Bytes popped so far.
    pub fn popped(&self) -> usize {
        self.popped.min(self.data.len())
    }

    /// Move the read position to `offset`.
    pub fn seek_pop(&mut self, offset: usize) {
        self.popped = offset;
    }
}

impl Pipe for MemReaderPipe<'_> {
    fn push(&mut self, _byte: u8) -> bool {
        false
    }

    fn pop(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.popped)?;
        self.popped += 1;
        Some(byte)
    }
}
