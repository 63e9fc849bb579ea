// SPDX-License-Identifier: MIT
//
// Error taxonomy for the terminal engine.
//
// Every variant is fatal to the current session: the control loop reacts
// to any of them by clearing the screen and restoring cooked mode. None
// are retried. `InputClosed` is the one orderly case (the keyboard source
// ran dry) and the binary maps it to a clean exit.

use std::io;

use thiserror::Error;

/// Errors raised by the terminal session, key decoder, and renderer.
#[derive(Debug, Error)]
pub enum TermError {
    /// Terminal attributes or dimensions could not be read. Usually means
    /// stdin is not a TTY.
    #[error("cannot query terminal: {0}")]
    TerminalQuery(#[source] io::Error),

    /// Raw or cooked attributes could not be applied.
    #[error("cannot configure terminal: {0}")]
    TerminalConfigure(#[source] io::Error),

    /// The keyboard byte source reached end of input.
    #[error("keyboard input closed")]
    InputClosed,

    /// Reading from the keyboard byte source failed.
    #[error("cannot read keyboard input: {0}")]
    Input(#[source] io::Error),

    /// Writing a frame to the terminal failed or was incomplete.
    #[error("cannot write to terminal: {0}")]
    RenderWrite(#[source] io::Error),

    /// The screen was used after the quit key closed it.
    #[error("screen session already closed")]
    SessionClosed,
}

impl TermError {
    /// Whether this error is an orderly shutdown rather than a failure.
    #[must_use]
    pub const fn is_orderly(&self) -> bool {
        matches!(self, Self::InputClosed)
    }
}

/// Result alias used across the terminal engine.
pub type Result<T> = std::result::Result<T, TermError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_closed_is_orderly() {
        assert!(TermError::InputClosed.is_orderly());
    }

    #[test]
    fn io_failures_are_not_orderly() {
        let err = TermError::RenderWrite(io::Error::from(io::ErrorKind::WriteZero));
        assert!(!err.is_orderly());
        assert!(!TermError::SessionClosed.is_orderly());
    }

    #[test]
    fn display_includes_source() {
        let err = TermError::TerminalQuery(io::Error::other("not a tty"));
        assert_eq!(err.to_string(), "cannot query terminal: not a tty");
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;
        let err = TermError::TerminalConfigure(io::Error::other("EIO"));
        assert_eq!(err.source().map(ToString::to_string), Some("EIO".into()));
    }
}
