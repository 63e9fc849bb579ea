//! Screen — the state machine behind the display.
//!
//! A `Screen` owns the viewport size, the cursor, any read-only content
//! rows, and a reusable frame buffer. Keys come in through
//! [`process_key`](Screen::process_key), frames go out through
//! [`refresh`](Screen::refresh).
//!
//! # States
//!
//! ```text
//!          process_key            refresh
//!   Idle ──────────────▶ Updating ───────▶ Idle
//!   Idle ──────────────────────▶ Rendering ───▶ Idle
//!   any ── Quit ──▶ Closed   (terminal)
//! ```
//!
//! Once closed, every call fails with [`TermError::SessionClosed`]. That is
//! a caller bug, so debug builds also assert.

use std::io::Write;

use tracing::{debug, trace};

use tilde_term::event_loop::{Action, App};
use tilde_term::input::KeyEvent;
use tilde_term::output::RenderBuffer;
use tilde_term::terminal::Size;
use tilde_term::{Result, TermError};

use crate::position::{Bounds, CursorPosition};
use crate::view::View;

/// Where the screen is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the next key or refresh.
    Idle,
    /// Applying a key.
    Updating,
    /// Building and writing a frame.
    Rendering,
    /// Quit was pressed. Nothing else is accepted.
    Closed,
}

/// The full-screen display.
#[derive(Debug)]
pub struct Screen {
    state: State,
    size: Size,
    bounds: Bounds,
    cursor: CursorPosition,
    content: Vec<String>,
    view: View,
    frame: RenderBuffer,
}

impl Screen {
    /// An empty screen of `size` cells with the cursor at the origin.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            state: State::Idle,
            size,
            bounds: Bounds::for_size(size),
            cursor: CursorPosition::ORIGIN,
            content: Vec::new(),
            view: View::default(),
            frame: RenderBuffer::new(),
        }
    }

    /// Use a different banner and filler.
    #[must_use]
    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    /// Show these rows instead of the banner. They are never edited.
    #[must_use]
    pub fn with_content<I, L>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.content = lines.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &[String] {
        &self.content
    }

    #[inline]
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Apply one key.
    ///
    /// Arrows move the cursor one cell, stopping silently at the edges.
    /// Quit closes the screen and returns [`Action::Quit`]. Everything else
    /// is inserted at the cursor, which leaves the read-only content as is.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::SessionClosed`] if the screen is closed.
    pub fn process_key(&mut self, key: KeyEvent) -> Result<Action> {
        self.ensure_open()?;
        self.state = State::Updating;

        let action = match key {
            KeyEvent::Quit => {
                self.state = State::Closed;
                debug!(cursor = %self.cursor, "screen closed");
                return Ok(Action::Quit);
            }
            KeyEvent::ArrowUp => {
                self.cursor.move_up();
                Action::Continue
            }
            KeyEvent::ArrowDown => {
                self.cursor.move_down(self.bounds);
                Action::Continue
            }
            KeyEvent::ArrowLeft => {
                self.cursor.move_left();
                Action::Continue
            }
            KeyEvent::ArrowRight => {
                self.cursor.move_right(self.bounds);
                Action::Continue
            }
            KeyEvent::PageUp
            | KeyEvent::PageDown
            | KeyEvent::Delete
            | KeyEvent::PrintableByte(_)
            | KeyEvent::ControlCode(_) => {
                self.insert(key);
                Action::Continue
            }
        };

        self.state = State::Idle;
        Ok(action)
    }

    /// Repaint the whole screen with a single write to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::RenderWrite`] if `out` fails or takes only part
    /// of the frame, and [`TermError::SessionClosed`] if the screen is
    /// closed.
    pub fn refresh(&mut self, out: &mut impl Write) -> Result<()> {
        self.ensure_open()?;
        self.state = State::Rendering;

        self.frame.clear();
        let written = self
            .view
            .draw(&mut self.frame, self.size, &self.content, self.cursor)
            .map_err(TermError::RenderWrite)
            .and_then(|()| self.frame.flush_to(out));

        self.state = State::Idle;
        written
    }

    /// Adopt a new viewport size and pull the cursor back inside it.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.bounds = Bounds::for_size(size);
        self.cursor.clamp(self.bounds);
        debug!(cols = size.cols, rows = size.rows, cursor = %self.cursor, "screen resized");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            debug_assert!(false, "screen used after close");
            return Err(TermError::SessionClosed);
        }
        Ok(())
    }

    /// Content insertion. The rows are read-only, so only the key is noted.
    fn insert(&self, key: KeyEvent) {
        trace!(?key, at = %self.cursor, "insert");
    }
}

impl App for Screen {
    fn process_key(&mut self, key: KeyEvent) -> Result<Action> {
        Self::process_key(self, key)
    }

    fn refresh(&mut self, out: &mut impl Write) -> Result<()> {
        Self::refresh(self, out)
    }

    fn on_resize(&mut self, size: Size) {
        self.resize(size);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    use tilde_term::event_loop::EventLoop;
    use tilde_term::input::KeyDecoder;
    use tilde_term::reader::ReaderSource;
    use tilde_term::terminal::{Headless, HeadlessAttrs, RawModeConfig, Session};

    fn screen() -> Screen {
        Screen::new(Size::new(80, 24))
    }

    fn press(s: &mut Screen, key: KeyEvent, times: usize) {
        for _ in 0..times {
            assert_eq!(s.process_key(key).unwrap(), Action::Continue);
        }
    }

    fn render(s: &mut Screen) -> String {
        let mut out = Vec::new();
        s.refresh(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // -- Cursor movement -----------------------------------------------------

    #[test]
    fn starts_at_origin_idle() {
        let s = screen();
        assert_eq!(s.cursor(), CursorPosition::ORIGIN);
        assert_eq!(s.state(), State::Idle);
    }

    #[test]
    fn arrows_move_one_cell() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowRight, 3);
        press(&mut s, KeyEvent::ArrowDown, 2);
        assert_eq!(s.cursor(), CursorPosition::new(3, 4));
        press(&mut s, KeyEvent::ArrowLeft, 1);
        press(&mut s, KeyEvent::ArrowUp, 1);
        assert_eq!(s.cursor(), CursorPosition::new(2, 3));
    }

    #[test]
    fn up_and_left_stop_at_origin() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowUp, 5);
        press(&mut s, KeyEvent::ArrowLeft, 5);
        assert_eq!(s.cursor(), CursorPosition::ORIGIN);
    }

    #[test]
    fn down_and_right_stop_one_short_of_edge() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowDown, 100);
        press(&mut s, KeyEvent::ArrowRight, 200);
        assert_eq!(s.cursor(), CursorPosition::new(23, 79));
    }

    #[test]
    fn other_keys_do_not_move_cursor() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowRight, 1);
        for key in [
            KeyEvent::PageUp,
            KeyEvent::PageDown,
            KeyEvent::Delete,
            KeyEvent::PrintableByte(b'x'),
            KeyEvent::ControlCode(0x1B),
        ] {
            assert_eq!(s.process_key(key).unwrap(), Action::Continue);
        }
        assert_eq!(s.cursor(), CursorPosition::new(1, 2));
        assert_eq!(s.state(), State::Idle);
    }

    // -- Rendering -----------------------------------------------------------

    #[test]
    fn first_frame_on_24x80() {
        let mut s = screen().with_view(View::new("tilde -- version 0.1.0", "~"));
        let f = render(&mut s);

        assert!(f.starts_with("\x1b[?25l\x1b[H"));
        assert!(f.ends_with("\x1b[1;1H\x1b[?25h"));

        let body = &f["\x1b[?25l\x1b[H".len()..f.len() - "\x1b[1;1H\x1b[?25h".len()];
        let rows: Vec<&str> = body.split("\r\n").collect();
        assert_eq!(rows.len(), 24);
        for (i, row) in rows.iter().enumerate() {
            assert!(row.ends_with("\x1b[K"), "row {i}");
            if i == 12 {
                assert!(row.contains("tilde -- version 0.1.0"));
            } else {
                assert_eq!(*row, "~\x1b[K", "row {i}");
            }
        }
        assert_eq!(s.state(), State::Idle);
    }

    #[test]
    fn frame_tracks_cursor() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowDown, 4);
        press(&mut s, KeyEvent::ArrowRight, 9);
        assert!(render(&mut s).ends_with("\x1b[5;10H\x1b[?25h"));
    }

    #[test]
    fn content_rows_are_drawn() {
        let mut s = Screen::new(Size::new(20, 3)).with_content(["hello", "world"]);
        let f = render(&mut s);
        assert!(f.contains("hello\x1b[K\r\nworld\x1b[K\r\n~\x1b[K"));
        assert!(!f.contains("version"));
        assert_eq!(s.content().len(), 2);
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
    fn failed_write_surfaces_and_returns_to_idle() {
        let mut s = screen();
        assert!(matches!(s.refresh(&mut Broken), Err(TermError::RenderWrite(_))));
        assert_eq!(s.state(), State::Idle);
        // The next refresh starts from a clean frame.
        let f = render(&mut s);
        assert_eq!(f.matches("\x1b[?25l").count(), 1);
    }

    // -- Resize --------------------------------------------------------------

    #[test]
    fn shrinking_reclamps_cursor() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowDown, 20);
        press(&mut s, KeyEvent::ArrowRight, 60);
        assert_eq!(s.cursor(), CursorPosition::new(21, 61));

        s.resize(Size::new(40, 10));
        assert_eq!(s.size(), Size::new(40, 10));
        assert_eq!(s.cursor(), CursorPosition::new(9, 39));

        press(&mut s, KeyEvent::ArrowDown, 1);
        assert_eq!(s.cursor(), CursorPosition::new(9, 39));
    }

    #[test]
    fn growing_keeps_cursor() {
        let mut s = screen();
        press(&mut s, KeyEvent::ArrowDown, 3);
        s.resize(Size::new(200, 60));
        assert_eq!(s.cursor(), CursorPosition::new(4, 1));
    }

    // -- Closing -------------------------------------------------------------

    #[test]
    fn quit_closes() {
        let mut s = screen();
        assert_eq!(s.process_key(KeyEvent::Quit).unwrap(), Action::Quit);
        assert!(s.is_closed());
        assert_eq!(s.state(), State::Closed);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn use_after_close_is_an_error() {
        let mut s = screen();
        s.process_key(KeyEvent::Quit).unwrap();
        assert!(matches!(
            s.process_key(KeyEvent::ArrowUp),
            Err(TermError::SessionClosed)
        ));
        assert!(matches!(
            s.refresh(&mut Vec::new()),
            Err(TermError::SessionClosed)
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "screen used after close")]
    fn use_after_close_asserts_in_debug() {
        let mut s = screen();
        s.process_key(KeyEvent::Quit).unwrap();
        let _ = s.process_key(KeyEvent::ArrowUp);
    }

    // -- Through the control loop -------------------------------------------

    #[test]
    fn arrow_right_then_quit_end_to_end() {
        let session = Session::open(Headless::new(Size::new(80, 24)), RawModeConfig::default())
            .unwrap();
        let keys = KeyDecoder::new(ReaderSource::new(&b"\x1b[C\x11"[..]));
        let mut ev = EventLoop::new(session, keys, Vec::new());
        let mut s = screen();

        ev.run(&mut s).unwrap();

        assert_eq!(s.cursor(), CursorPosition::new(1, 2));
        assert!(s.is_closed());

        let out = String::from_utf8(ev.sink().clone()).unwrap();
        // Initial frame at the origin, then one after the arrow.
        assert_eq!(out.matches("\x1b[1;1H\x1b[?25h").count(), 1);
        assert_eq!(out.matches("\x1b[1;2H\x1b[?25h").count(), 1);
        assert!(out.ends_with("\x1b[2J\x1b[H"));

        assert!(!ev.session().is_raw());
        assert_eq!(ev.session().device().current(), HeadlessAttrs::COOKED);
    }
}
