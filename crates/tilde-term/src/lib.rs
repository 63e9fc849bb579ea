// SPDX-License-Identifier: MIT
//
// tilde-term — Terminal engine for tilde.
//
// Raw-mode session handling, keyboard decoding, and the escape codes and
// frame buffer a full-screen text display needs. The terminal is driven
// directly through termios and ANSI sequences, with no TUI framework in
// between.
//
// Every side of the terminal is injected: the attribute device, the byte
// source the keys come from, and the sink frames are written to. Tests run
// the whole stack against in-memory stand-ins.

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;

pub use error::{Result, TermError};
