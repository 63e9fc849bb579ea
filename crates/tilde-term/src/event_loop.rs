// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Control loop: the piece that wires session, decoder, and application.
//
// One thread, one loop. Each iteration asks the key decoder for a key
// (bounded by the idle timeout), hands it to the application, checks for
// a resize, and repaints if anything changed. The application decides when
// to stop by returning `Action::Quit`.
//
// # Shutdown
//
// Whatever ends the loop (quit key, end of input, an I/O error in the
// middle of a frame), the same two steps run before `run` returns: the
// screen is cleared and homed, then the cooked attributes are reapplied.
// The loop's own error wins over a shutdown error, which is only logged.
// If raw mode cannot be entered at all, the clear is still attempted.
//
// # SIGWINCH Handling
//
// Terminal resize is detected via a SIGWINCH handler that sets an
// `AtomicBool`. The idle timeout guarantees the loop looks at the flag at
// least every 100 ms even if no key arrives. On resize the dimensions are
// re-queried and passed to the application, which re-clamps its cursor.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use crate::ansi;
use crate::error::{Result, TermError};
use crate::input::{KeyDecoder, KeyEvent};
use crate::reader::ByteSource;
use crate::terminal::{Device, Session, Size};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Global flag set by the SIGWINCH handler. Checked each loop iteration.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a signal handler for SIGWINCH (terminal resize).
///
/// The handler only stores to [`SIGWINCH_RECEIVED`], which is
/// async-signal-safe. No `SA_RESTART`: an interrupted `poll()` wakes the
/// decoder early so the resize is seen right away.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {
    // No-op on non-unix platforms.
}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep going.
    Continue,
    /// Leave the loop cleanly.
    Quit,
}

/// Application interface for the control loop.
///
/// Per iteration the loop calls [`process_key`](App::process_key) for the
/// key that arrived, [`on_resize`](App::on_resize) if the terminal changed
/// size, then [`refresh`](App::refresh) if either happened. `refresh` also
/// runs once before the first key.
pub trait App {
    /// Interpret one key.
    ///
    /// # Errors
    ///
    /// Any error ends the loop.
    fn process_key(&mut self, key: KeyEvent) -> Result<Action>;

    /// Draw the whole screen to `out`.
    ///
    /// # Errors
    ///
    /// Any error ends the loop.
    fn refresh(&mut self, out: &mut impl Write) -> Result<()>;

    /// The terminal now has `size` cells.
    fn on_resize(&mut self, _size: Size) {}
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The control loop.
///
/// Owns the terminal session, the key decoder, and the output sink. Call
/// [`run`](Self::run) to enter it.
///
/// # Example
///
/// ```no_run
/// use std::io::{self, Write};
///
/// use tilde_term::error::Result;
/// use tilde_term::event_loop::{Action, App, EventLoop};
/// use tilde_term::input::{KeyDecoder, KeyEvent};
/// use tilde_term::reader::StdinSource;
/// use tilde_term::terminal::{RawModeConfig, Session};
///
/// struct Blank;
///
/// impl App for Blank {
///     fn process_key(&mut self, key: KeyEvent) -> Result<Action> {
///         Ok(if key == KeyEvent::Quit { Action::Quit } else { Action::Continue })
///     }
///
///     fn refresh(&mut self, out: &mut impl Write) -> Result<()> {
///         out.flush().map_err(tilde_term::error::TermError::RenderWrite)
///     }
/// }
///
/// let session = Session::open_stdin(RawModeConfig::default())?;
/// let keys = KeyDecoder::new(StdinSource::new());
/// EventLoop::new(session, keys, io::stdout()).run(&mut Blank)?;
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
pub struct EventLoop<D: Device, S, W> {
    session: Session<D>,
    keys: KeyDecoder<S>,
    sink: W,
    /// Set when the terminal changed size. The SIGWINCH flag outside
    /// tests.
    resized: &'static AtomicBool,
}

impl<D: Device, S: ByteSource, W: Write> EventLoop<D, S, W> {
    /// Assemble a loop from its parts. Nothing touches the terminal yet.
    pub const fn new(session: Session<D>, keys: KeyDecoder<S>, sink: W) -> Self {
        Self {
            session,
            keys,
            sink,
            resized: &SIGWINCH_RECEIVED,
        }
    }

    /// The terminal session.
    #[inline]
    #[must_use]
    pub const fn session(&self) -> &Session<D> {
        &self.session
    }

    /// The output sink.
    #[inline]
    #[must_use]
    pub const fn sink(&self) -> &W {
        &self.sink
    }

    /// Run until the application quits, input ends, or an error occurs.
    ///
    /// This method:
    /// 1. Enters raw mode
    /// 2. Installs the SIGWINCH handler
    /// 3. Draws the first frame and runs the key loop
    /// 4. Clears the screen and restores cooked mode (even on error)
    ///
    /// # Errors
    ///
    /// Returns the error that ended the loop. End of input is
    /// [`TermError::InputClosed`]; check
    /// [`is_orderly`](TermError::is_orderly) before treating it as a
    /// failure. If the loop itself succeeded, a failure to restore the
    /// terminal is returned instead.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        if let Err(e) = self.session.enable_raw() {
            error!(error = %e, "cannot enter raw mode");
            if let Err(wipe) = self.wipe() {
                warn!(error = %wipe, "could not clear screen on exit");
            }
            return Err(e);
        }
        install_sigwinch_handler();

        let result = self.run_inner(app);
        if let Err(e) = &result {
            if e.is_orderly() {
                debug!("input closed, shutting down");
            } else {
                error!(error = %e, "control loop failed");
            }
        }

        // Always clean up, even if the loop errored.
        let shutdown = self.shutdown();
        match (result, shutdown) {
            (Err(e), Err(cleanup)) => {
                warn!(error = %cleanup, "terminal restore failed");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// The inner loop, separated so cleanup runs regardless of outcome.
    fn run_inner(&mut self, app: &mut impl App) -> Result<()> {
        app.refresh(&mut self.sink)?;

        loop {
            let mut dirty = false;

            if let Some(key) = self.keys.poll_key()? {
                if app.process_key(key)? == Action::Quit {
                    debug!("quit requested");
                    return Ok(());
                }
                dirty = true;
            }

            if self.resized.swap(false, Ordering::Relaxed) {
                self.resize(app)?;
                dirty = true;
            }

            if dirty {
                app.refresh(&mut self.sink)?;
            }
        }
    }

    /// Re-query the terminal size and tell the application.
    fn resize(&mut self, app: &mut impl App) -> Result<()> {
        let size = self.session.dimensions()?;
        debug!(cols = size.cols, rows = size.rows, "terminal resized");
        app.on_resize(size);
        Ok(())
    }

    /// Clear the screen, then restore cooked mode.
    ///
    /// The restore runs even if clearing fails.
    fn shutdown(&mut self) -> Result<()> {
        let cleared = self.wipe();
        let restored = self.session.disable_raw();

        if let Err(e) = &cleared {
            warn!(error = %e, "could not clear screen on exit");
        }
        restored.and(cleared)
    }

    /// Clear and home the screen.
    fn wipe(&mut self) -> Result<()> {
        ansi::wipe(&mut self.sink)
            .and_then(|()| self.sink.flush())
            .map_err(TermError::RenderWrite)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
