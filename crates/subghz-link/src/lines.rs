use bytes::{Buf, BytesMut};

/// Longest line kept before the buffer is force-split.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Accumulates bytes read from the module and yields complete lines.
///
/// Lines end at `\r` or `\n`; runs of terminators and empty lines are
/// skipped. A line cut in half by a read stays buffered until its
/// terminator arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Add received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self
                .buffer
                .iter()
                .position(|&b| b == b'\r' || b == b'\n');

            let end = match end {
                Some(end) => end,
                None if self.buffer.len() >= MAX_LINE_LENGTH => self.buffer.len(),
                None => return None,
            };

            let line = self.buffer.split_to(end);
            while self.buffer.first().is_some_and(|&b| b == b'\r' || b == b'\n') {
                self.buffer.advance(1);
            }

            if !line.is_empty() {
                // The module speaks ASCII; map bytes one-to-one to chars.
                return Some(line.iter().map(|&b| char::from(b)).collect());
            }
        }
    }

    /// Bytes of the unfinished line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
