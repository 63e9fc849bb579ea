//! View — turns screen state into one frame of escape-coded bytes.
//!
//! The frame is always a full repaint:
//!
//! ```text
//! ESC[?25l ESC[H                 hide cursor, go home
//! row 0 ESC[K \r\n               content line or filler, erase the rest
//! ...
//! row N-1 ESC[K                  no separator after the last row
//! ESC[{row};{col}H ESC[?25h      place and show the cursor
//! ```
//!
//! With no content the middle row (`rows / 2`, counting from 0) carries
//! the centered banner. Rows wider than the viewport are cut at the last
//! character that fits, measured in display columns, not bytes.
//!
//! The `View` holds only display configuration. Content and cursor are
//! passed to [`draw`](View::draw) so the same view can paint any state.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use tilde_term::ansi;
use tilde_term::terminal::Size;

use crate::position::CursorPosition;

/// Filler glyph for rows with no content.
pub const DEFAULT_FILLER: &str = "~";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Display width of `s` in terminal columns.
#[must_use]
pub fn display_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// The longest prefix of `s` that fits in `cols` display columns.
///
/// A wide character that would straddle the edge is dropped whole.
#[must_use]
pub fn fit_width(s: &str, cols: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > cols {
            return &s[..idx];
        }
        used += w;
    }
    s
}

/// The banner row: `banner` centered in `cols`, with `filler` as the first
/// glyph of the left padding.
///
/// The banner starts at column `(cols - width) / 2` (0-based). If that is
/// zero there is no padding and no filler.
#[must_use]
pub fn banner_row(banner: &str, filler: &str, cols: usize) -> String {
    let text = fit_width(banner, cols);
    let pad = (cols - display_width(text)) / 2;

    let mut row = String::with_capacity(pad + text.len());
    if pad > 0 {
        let filler = fit_width(filler, pad);
        row.push_str(filler);
        row.extend(std::iter::repeat_n(' ', pad - display_width(filler)));
    }
    row.push_str(text);
    row
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Display configuration: the banner text and the filler glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    banner: String,
    filler: String,
}

impl View {
    /// Create a view with the given banner and filler.
    #[must_use]
    pub fn new(banner: impl Into<String>, filler: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            filler: filler.into(),
        }
    }

    /// The banner text.
    #[inline]
    #[must_use]
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// The filler glyph.
    #[inline]
    #[must_use]
    pub fn filler(&self) -> &str {
        &self.filler
    }

    /// Write one full frame to `out`, usually a `RenderBuffer`.
    ///
    /// # Errors
    ///
    /// Returns the first error `out` reports.
    pub fn draw(
        &self,
        out: &mut impl Write,
        size: Size,
        content: &[String],
        cursor: CursorPosition,
    ) -> io::Result<()> {
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;
        self.draw_rows(out, size, content)?;
        ansi::cursor_to(out, cursor.row, cursor.col)?;
        ansi::cursor_show(out)
    }

    fn draw_rows(&self, out: &mut impl Write, size: Size, content: &[String]) -> io::Result<()> {
        let cols = usize::from(size.cols);
        let banner_at = size.rows / 2;

        for y in 0..size.rows {
            if let Some(line) = content.get(usize::from(y)) {
                out.write_all(fit_width(line, cols).as_bytes())?;
            } else if content.is_empty() && y == banner_at {
                out.write_all(banner_row(&self.banner, &self.filler, cols).as_bytes())?;
            } else {
                out.write_all(fit_width(&self.filler, cols).as_bytes())?;
            }

            ansi::erase_line(out)?;
            if y + 1 < size.rows {
                ansi::newline(out)?;
            }
        }
        Ok(())
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(
            concat!("tilde -- version ", env!("CARGO_PKG_VERSION")),
            DEFAULT_FILLER,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tilde_term::output::RenderBuffer;

    fn frame(view: &View, size: Size, content: &[String], cursor: CursorPosition) -> String {
        let mut out = RenderBuffer::new();
        view.draw(&mut out, size, content, cursor).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    /// The rows section of a frame, split on the row separator.
    fn rows(frame: &str) -> Vec<&str> {
        let body = frame
            .strip_prefix("\x1b[?25l\x1b[H")
            .and_then(|s| s.rsplit_once("\x1b[K").map(|(rows, _)| rows))
            .unwrap();
        body.split("\x1b[K\r\n").collect()
    }

    // -- Width helpers -------------------------------------------------------

    #[test]
    fn fit_width_ascii() {
        assert_eq!(fit_width("hello", 3), "hel");
        assert_eq!(fit_width("hello", 5), "hello");
        assert_eq!(fit_width("hello", 10), "hello");
        assert_eq!(fit_width("hello", 0), "");
    }

    #[test]
    fn fit_width_drops_straddling_wide_char() {
        // Each CJK character is 2 columns wide.
        assert_eq!(fit_width("日本語", 5), "日本");
        assert_eq!(fit_width("日本語", 6), "日本語");
    }

    #[test]
    fn display_width_counts_columns() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
    }

    // -- Banner --------------------------------------------------------------

    #[test]
    fn banner_is_centered_with_filler() {
        let row = banner_row("hi", "~", 10);
        // (10 - 2) / 2 = 4 columns of padding, filler first.
        assert_eq!(row, "~   hi");
    }

    #[test]
    fn banner_without_room_has_no_padding() {
        assert_eq!(banner_row("hello", "~", 5), "hello");
        assert_eq!(banner_row("hello", "~", 6), "hello");
    }

    #[test]
    fn banner_truncated_to_width() {
        assert_eq!(banner_row("hello world", "~", 4), "hell");
    }

    #[test]
    fn one_column_of_padding_is_just_filler() {
        assert_eq!(banner_row("abc", "~", 5), "~abc");
    }

    #[test]
    fn default_banner_names_version() {
        let view = View::default();
        assert!(view.banner().starts_with("tilde -- version "));
        assert_eq!(view.filler(), "~");
    }

    // -- Frames --------------------------------------------------------------

    #[test]
    fn frame_order() {
        let view = View::new("x", "~");
        let f = frame(&view, Size::new(4, 2), &[], CursorPosition::new(2, 3));
        assert_eq!(f, "\x1b[?25l\x1b[H~\x1b[K\r\n~x\x1b[K\x1b[2;3H\x1b[?25h");
    }

    #[test]
    fn banner_on_middle_row_of_24x80() {
        let view = View::new("tilde -- version 0.1.0", "~");
        let f = frame(&view, Size::new(80, 24), &[], CursorPosition::ORIGIN);
        let rows = rows(&f);

        assert_eq!(rows.len(), 24);
        for (i, row) in rows.iter().enumerate() {
            if i == 12 {
                let expected = format!("~{}tilde -- version 0.1.0", " ".repeat(28));
                assert_eq!(*row, expected);
            } else {
                assert_eq!(*row, "~", "row {i}");
            }
        }
        assert!(f.ends_with("\x1b[K\x1b[1;1H\x1b[?25h"));
        assert_eq!(f.matches("\x1b[K").count(), 24);
        assert_eq!(f.matches("\r\n").count(), 23);
    }

    #[test]
    fn content_replaces_banner() {
        let view = View::default();
        let content = vec!["first".to_string(), "second".to_string()];
        let f = frame(&view, Size::new(10, 4), &content, CursorPosition::ORIGIN);
        assert_eq!(rows(&f), vec!["first", "second", "~", "~"]);
    }

    #[test]
    fn content_truncated_to_viewport() {
        let view = View::default();
        let content = vec!["a long line of text".to_string(), "日本語".to_string()];
        let f = frame(&view, Size::new(5, 2), &content, CursorPosition::ORIGIN);
        assert_eq!(rows(&f), vec!["a lon", "日本"]);
    }

    #[test]
    fn content_beyond_viewport_is_not_drawn() {
        let view = View::default();
        let content: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let f = frame(&view, Size::new(10, 3), &content, CursorPosition::ORIGIN);
        assert_eq!(rows(&f), vec!["0", "1", "2"]);
    }

    #[test]
    fn custom_filler() {
        let view = View::new("b", ".");
        let f = frame(&view, Size::new(3, 3), &[], CursorPosition::ORIGIN);
        assert_eq!(rows(&f), vec![".", ".b", "."]);
    }

    struct Full;

    impl Write for Full {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_error_is_returned() {
        let view = View::default();
        let err = view
            .draw(&mut Full, Size::new(10, 3), &[], CursorPosition::ORIGIN)
            .unwrap_err();
        assert_eq!(err.to_string(), "no space");
    }
}
