// SPDX-License-Identifier: MIT
//
// Frame buffering.
//
// A refresh builds the whole frame (cursor hide, rows, erase codes, cursor
// placement) in memory and hands it to the sink in one go. The terminal
// never sees a half-drawn frame and there is one write per keypress
// instead of one per escape sequence.

use std::io::{self, Write};

use crate::error::{Result, TermError};

/// Starting capacity. A 200x60 screen of filler rows fits without growing.
const DEFAULT_CAPACITY: usize = 16_384;

/// A byte buffer that accumulates one frame for a single write.
#[derive(Debug)]
pub struct RenderBuffer {
    buf: Vec<u8>,
}

impl RenderBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append raw bytes.
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a string as UTF-8.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write the frame to `w`, flush it, and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::RenderWrite`] if the sink fails or stops
    /// accepting bytes before the whole frame is written. The buffer keeps
    /// its contents in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        w.write_all(&self.buf)
            .and_then(|()| w.flush())
            .map_err(TermError::RenderWrite)?;
        self.buf.clear();
        Ok(())
    }
}

impl Write for RenderBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // No-op: the real flush is `flush_to`.
        Ok(())
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_is_empty() {
        let buf = RenderBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn write_trait_appends() {
        let mut buf = RenderBuffer::new();
        write!(buf, "\x1b[{};{}H", 3, 7).unwrap();
        assert_eq!(buf.as_bytes(), b"\x1b[3;7H");
    }

    #[test]
    fn push_str_and_bytes() {
        let mut buf = RenderBuffer::new();
        buf.push_str("~ ");
        buf.push_bytes(b"\x1b[K");
        assert_eq!(buf.as_bytes(), b"~ \x1b[K");
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = RenderBuffer::new();
        buf.push_str("some data");
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);
    }

    #[test]
    fn flush_to_writes_and_clears() {
        let mut buf = RenderBuffer::new();
        buf.push_str("frame data");

        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();

        assert_eq!(dest, b"frame data");
        assert!(buf.is_empty());
    }

    #[test]
    fn flush_to_empty_is_noop() {
        let mut buf = RenderBuffer::new();
        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();
        assert!(dest.is_empty());
    }

    /// Accepts `limit` bytes, then reports a zero-length write.
    struct Stalling {
        limit: usize,
        got: Vec<u8>,
    }

    impl Write for Stalling {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit - self.got.len());
            self.got.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_write_is_render_write() {
        let mut buf = RenderBuffer::new();
        buf.push_str("0123456789");
        let mut sink = Stalling {
            limit: 4,
            got: Vec::new(),
        };
        let err = buf.flush_to(&mut sink).unwrap_err();
        assert!(matches!(err, TermError::RenderWrite(ref e) if e.kind() == io::ErrorKind::WriteZero));
        assert_eq!(sink.got, b"0123");
        assert_eq!(buf.len(), 10);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_render_write() {
        let mut buf = RenderBuffer::new();
        buf.push_str("x");
        assert!(matches!(buf.flush_to(&mut Broken), Err(TermError::RenderWrite(_))));
    }
}
