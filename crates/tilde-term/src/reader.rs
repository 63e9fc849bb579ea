// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Keyboard byte sources.
//
// The key decoder pulls bytes one at a time through the `ByteSource`
// trait. Every pull carries a timeout so that neither the idle wait for a
// keypress nor the wait for the tail of an escape sequence can block
// forever: an idle timeout lets the control loop notice a resize, and an
// inter-byte timeout turns a dangling `ESC [` into a best-effort key.
//
// `StdinSource` is the real keyboard. It polls stdin's descriptor and
// reads whatever is available into a 4 KB buffer, then hands bytes out
// from that buffer. A single keypress is 1-4 bytes, a paste can be
// kilobytes; one `read()` handles both.
//
// `ReaderSource` adapts any `io::Read` (a byte slice, a pipe) and never
// times out. Tests drive the decoder with it.

use std::io::{self, Read};
use std::time::Duration;

/// Byte chunk read from stdin in one syscall.
const READ_BUF_SIZE: usize = 4096;

/// Outcome of asking a byte source for the next byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// A byte arrived.
    Byte(u8),
    /// Nothing arrived before the timeout.
    Timeout,
    /// A signal cut the wait short. The caller may retry with whatever
    /// is left of its timeout.
    Interrupted,
    /// The source is exhausted. Every later call also returns `Closed`.
    Closed,
}

/// A sequential, blocking source of keyboard bytes.
pub trait ByteSource {
    /// Wait up to `timeout` for the next byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails. End of input is not
    /// an error: it is [`Next::Closed`].
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Next>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Next> {
        (**self).next_byte(timeout)
    }
}

// ─── StdinSource ─────────────────────────────────────────────────────────────

/// The process's stdin, read with `poll()` timeouts.
pub struct StdinSource {
    buf: Box<[u8; READ_BUF_SIZE]>,
    /// Next unread byte in `buf`.
    pos: usize,
    /// Number of valid bytes in `buf`.
    len: usize,
    closed: bool,
}

impl StdinSource {
    /// Create a source reading from stdin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Box::new([0; READ_BUF_SIZE]),
            pos: 0,
            len: 0,
            closed: false,
        }
    }

    /// Hand out the next buffered byte, if any.
    fn take_buffered(&mut self) -> Option<u8> {
        if self.pos < self.len {
            let b = self.buf[self.pos];
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    /// Refill the buffer. Returns why nothing was read, or `None` once
    /// the buffer holds new bytes (or end of input was seen).
    #[cfg(unix)]
    fn fill(&mut self, timeout: Duration) -> io::Result<Option<Next>> {
        let stdin_fd = libc::STDIN_FILENO;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: stdin_fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, timeout_ms)
        };

        if ready < 0 {
            let err = io::Error::last_os_error();
            // A signal (SIGWINCH) woke us up. The decoder decides whether
            // that ends an idle wait or just pauses a sequence.
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(Some(Next::Interrupted))
            } else {
                Err(err)
            };
        }
        if ready == 0 {
            return Ok(Some(Next::Timeout));
        }

        let n = unsafe { libc::read(stdin_fd, self.buf.as_mut_ptr().cast(), READ_BUF_SIZE) };

        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted => Ok(Some(Next::Interrupted)),
                io::ErrorKind::WouldBlock => Ok(Some(Next::Timeout)),
                _ => Err(err),
            };
        }

        #[allow(clippy::cast_sign_loss)] // n >= 0 guaranteed above.
        let n = n as usize;
        if n == 0 {
            self.closed = true;
        }
        self.pos = 0;
        self.len = n;
        Ok(None)
    }

    /// Non-unix fallback: a plain blocking read, no timeout.
    #[cfg(not(unix))]
    fn fill(&mut self, _timeout: Duration) -> io::Result<Option<Next>> {
        let n = loop {
            match io::stdin().lock().read(&mut self.buf[..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.closed = true;
        }
        self.pos = 0;
        self.len = n;
        Ok(None)
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for StdinSource {
    fn next_byte(&mut self, timeout: Duration) -> io::Result<Next> {
        if let Some(b) = self.take_buffered() {
            return Ok(Next::Byte(b));
        }
        if self.closed {
            return Ok(Next::Closed);
        }
        if let Some(stop) = self.fill(timeout)? {
            return Ok(stop);
        }
        Ok(self.take_buffered().map_or(Next::Closed, Next::Byte))
    }
}

// ─── ReaderSource ────────────────────────────────────────────────────────────

/// Any [`Read`] as a byte source. Reads block; the timeout is ignored.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
    closed: bool,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap a reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_byte(&mut self, _timeout: Duration) -> io::Result<Next> {
        if self.closed {
            return Ok(Next::Closed);
        }

        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(Next::Closed);
                }
                Ok(_) => return Ok(Next::Byte(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Ok(Next::Timeout);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
