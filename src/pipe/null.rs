use super::Pipe;

/// Sink that accepts every byte and keeps none of them.
#[derive(Debug, Default)]
pub struct NullPipe {
    pushed: usize,
}

impl NullPipe {
    pub const fn new() -> Self {
        Self { pushed: 0 }
    }

    /// Bytes accepted (and discarded) so far.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Always zero; nothing is ever stored.
    pub fn popped(&self) -> usize {
        0
    }
}

impl Pipe for NullPipe {
    fn push(&mut self, _byte: u8) -> bool {
        self.pushed += 1;
        true
    }

    fn pop(&mut self) -> Option<u8> {
        None
    }
}
