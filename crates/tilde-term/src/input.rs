// SPDX-License-Identifier: MIT
//
// Key decoder.
//
// Turns raw keyboard bytes into logical key events. Most keys are a single
// byte. Arrow, page, and delete keys arrive as short escape sequences:
//
//   ESC [ A / B / C / D     arrows (up, down, right, left)
//   ESC [ 3 ~               delete
//   ESC [ 5 ~ / ESC [ 6 ~   page up / page down
//
// # Ambiguity
//
// A bare ESC is either the Escape key or the start of a sequence. The
// decoder looks ahead at most three bytes, each bounded by the source's
// inter-byte timeout. When a byte never comes the decoder settles on the
// best partial reading instead of waiting: `ESC` and `ESC [` become
// `ControlCode(ESC)`, `ESC [ 5` becomes `ControlCode(b'5')`.
//
// Bytes read ahead that turn out not to belong to a sequence are pushed
// back and decoded on the next call. Nothing the user typed is dropped,
// and the quit key is never swallowed by a half-finished sequence.

use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::error::{Result, TermError};
use crate::reader::{ByteSource, Next, ReaderSource};

/// The escape byte that introduces multi-byte sequences.
pub const ESC: u8 = 0x1B;

/// Ctrl-Q: the fixed quit key.
pub const QUIT: u8 = 0x11;

/// How long to wait for a keypress before reporting an idle tick.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// How long to wait for the next byte of an escape sequence.
pub const DEFAULT_SEQUENCE_TIMEOUT: Duration = Duration::from_millis(100);

// ─── Key Events ─────────────────────────────────────────────────────────────

/// A decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A printable byte (ASCII graphic, space, or any byte >= 0x80).
    PrintableByte(u8),
    /// A control byte, or the leftover of an unrecognized sequence.
    ControlCode(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Delete,
    /// Ctrl-Q.
    Quit,
}

impl KeyEvent {
    /// Whether this is one of the four arrow keys.
    #[inline]
    #[must_use]
    pub const fn is_arrow(self) -> bool {
        matches!(
            self,
            Self::ArrowUp | Self::ArrowDown | Self::ArrowLeft | Self::ArrowRight
        )
    }
}

// ─── Decoding Tables ────────────────────────────────────────────────────────

/// Final byte after `ESC [` that names an arrow key.
const fn csi_arrow(final_byte: u8) -> Option<KeyEvent> {
    match final_byte {
        b'A' => Some(KeyEvent::ArrowUp),
        b'B' => Some(KeyEvent::ArrowDown),
        b'C' => Some(KeyEvent::ArrowRight),
        b'D' => Some(KeyEvent::ArrowLeft),
        _ => None,
    }
}

/// Digit in `ESC [ <digit> ~` that names an editing key.
const fn csi_tilde(digit: u8) -> Option<KeyEvent> {
    match digit {
        b'3' => Some(KeyEvent::Delete),
        b'5' => Some(KeyEvent::PageUp),
        b'6' => Some(KeyEvent::PageDown),
        _ => None,
    }
}

/// Classify a lone byte that does not start an escape sequence.
#[must_use]
pub const fn classify(byte: u8) -> KeyEvent {
    match byte {
        QUIT => KeyEvent::Quit,
        b if b.is_ascii_control() => KeyEvent::ControlCode(b),
        b => KeyEvent::PrintableByte(b),
    }
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Pulls bytes from an injected [`ByteSource`] and yields [`KeyEvent`]s.
///
/// # Example
///
/// ```
/// use tilde_term::input::{KeyDecoder, KeyEvent};
/// use tilde_term::reader::ReaderSource;
///
/// let mut keys = KeyDecoder::new(ReaderSource::new(&b"\x1b[Cq\x11"[..]));
/// assert_eq!(keys.next_key()?, KeyEvent::ArrowRight);
/// assert_eq!(keys.next_key()?, KeyEvent::PrintableByte(b'q'));
/// assert_eq!(keys.next_key()?, KeyEvent::Quit);
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
pub struct KeyDecoder<S> {
    source: S,
    /// A byte read ahead but not consumed by the last key.
    pending: Option<u8>,
    idle_timeout: Duration,
    sequence_timeout: Duration,
}

impl<S: ByteSource> KeyDecoder<S> {
    /// Create a decoder with the default timeouts.
    pub const fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sequence_timeout: DEFAULT_SEQUENCE_TIMEOUT,
        }
    }

    /// Override the idle and inter-byte timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, idle: Duration, sequence: Duration) -> Self {
        self.idle_timeout = idle;
        self.sequence_timeout = sequence;
        self
    }

    /// Block until one key is available.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::InputClosed`] when the source is exhausted and
    /// [`TermError::Input`] if reading fails.
    pub fn next_key(&mut self) -> Result<KeyEvent> {
        loop {
            if let Some(key) = self.poll_key()? {
                return Ok(key);
            }
        }
    }

    /// Wait up to the idle timeout for one key.
    ///
    /// Returns `Ok(None)` if no key started within the timeout.
    ///
    /// # Errors
    ///
    /// Same as [`next_key`](Self::next_key).
    pub fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
        let first = match self.pending.take() {
            Some(b) => b,
            None => match self.read(self.idle_timeout)? {
                Next::Byte(b) => b,
                Next::Timeout | Next::Interrupted => return Ok(None),
                Next::Closed => return Err(TermError::InputClosed),
            },
        };

        let key = if first == ESC {
            self.decode_escape()?
        } else {
            classify(first)
        };

        trace!(?key, "key");
        Ok(Some(key))
    }

    /// Iterate over keys until the source closes.
    ///
    /// Yields `Err` for read failures. End of input ends the iteration.
    pub const fn keys(&mut self) -> Keys<'_, S> {
        Keys {
            decoder: self,
            done: false,
        }
    }

    /// Give the byte source back.
    pub fn into_source(self) -> S {
        self.source
    }

    fn read(&mut self, timeout: Duration) -> Result<Next> {
        self.source.next_byte(timeout).map_err(TermError::Input)
    }

    /// Next byte of a sequence, or `None` if it did not arrive in time.
    ///
    /// The quit key ends the sequence early and is kept for the next call.
    /// A signal landing between bytes does not end the sequence: the wait
    /// resumes for whatever is left of the inter-byte timeout.
    fn follow_up(&mut self) -> Result<Option<u8>> {
        let deadline = Instant::now() + self.sequence_timeout;
        let mut timeout = self.sequence_timeout;
        loop {
            match self.read(timeout)? {
                Next::Byte(QUIT) => {
                    self.pending = Some(QUIT);
                    return Ok(None);
                }
                Next::Byte(b) => return Ok(Some(b)),
                Next::Interrupted => {
                    timeout = deadline.saturating_duration_since(Instant::now());
                    if timeout.is_zero() {
                        return Ok(None);
                    }
                }
                Next::Timeout | Next::Closed => return Ok(None),
            }
        }
    }

    /// Resolve the bytes after an ESC.
    fn decode_escape(&mut self) -> Result<KeyEvent> {
        let Some(introducer) = self.follow_up()? else {
            return Ok(KeyEvent::ControlCode(ESC));
        };
        if introducer != b'[' {
            self.pending = Some(introducer);
            return Ok(KeyEvent::ControlCode(ESC));
        }

        let Some(b2) = self.follow_up()? else {
            return Ok(KeyEvent::ControlCode(ESC));
        };
        if let Some(key) = csi_arrow(b2) {
            return Ok(key);
        }
        if !b2.is_ascii_digit() {
            warn!(byte = b2, "unrecognized escape sequence");
            return Ok(KeyEvent::ControlCode(b2));
        }

        match self.follow_up()? {
            Some(b'~') => {
                if let Some(key) = csi_tilde(b2) {
                    return Ok(key);
                }
            }
            Some(b3) => self.pending = Some(b3),
            None => {}
        }
        warn!(digit = b2, "unrecognized escape sequence");
        Ok(KeyEvent::ControlCode(b2))
    }
}

/// Iterator returned by [`KeyDecoder::keys`].
pub struct Keys<'a, S> {
    decoder: &'a mut KeyDecoder<S>,
    done: bool,
}

impl<S: ByteSource> Iterator for Keys<'_, S> {
    type Item = Result<KeyEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.next_key() {
            Ok(key) => Some(Ok(key)),
            Err(TermError::InputClosed) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a complete byte slice into keys.
#[must_use]
pub fn decode(bytes: &[u8]) -> Vec<KeyEvent> {
    let mut decoder = KeyDecoder::new(ReaderSource::new(bytes));
    decoder.keys().filter_map(Result::ok).collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
