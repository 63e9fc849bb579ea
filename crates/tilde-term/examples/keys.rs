// SPDX-License-Identifier: MIT
//
// tilde-term keys — a live key viewer that exercises the engine end to end.
//
// Session → StdinSource → KeyDecoder → App → RenderBuffer → single write().
// Press keys (arrows, page up/down, delete, anything) and watch how each one
// decodes. Resize the terminal to see the size update. Ctrl-Q to quit.
//
// Usage:
//   cargo run -p tilde-term --example keys

use std::collections::VecDeque;
use std::io::{self, Write};

use tilde_term::ansi;
use tilde_term::error::Result;
use tilde_term::event_loop::{Action, App, EventLoop};
use tilde_term::input::{KeyDecoder, KeyEvent};
use tilde_term::output::RenderBuffer;
use tilde_term::reader::StdinSource;
use tilde_term::terminal::{RawModeConfig, Session, Size};

/// Keys kept in the on-screen log.
const MAX_LOG_ENTRIES: usize = 100;

struct Viewer {
    size: Size,
    log: VecDeque<KeyEvent>,
    count: u64,
    frame: RenderBuffer,
}

impl Viewer {
    fn new(size: Size) -> Self {
        Self {
            size,
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            count: 0,
            frame: RenderBuffer::new(),
        }
    }
}

fn describe(key: KeyEvent) -> String {
    match key {
        KeyEvent::PrintableByte(b) if b.is_ascii() => format!("{:?} (0x{b:02x})", char::from(b)),
        KeyEvent::PrintableByte(b) => format!("byte 0x{b:02x}"),
        KeyEvent::ControlCode(b) => format!("control 0x{b:02x}"),
        other => format!("{other:?}"),
    }
}

impl App for Viewer {
    fn process_key(&mut self, key: KeyEvent) -> Result<Action> {
        if key == KeyEvent::Quit {
            return Ok(Action::Quit);
        }
        self.count += 1;
        if self.log.len() == MAX_LOG_ENTRIES {
            self.log.pop_back();
        }
        self.log.push_front(key);
        Ok(Action::Continue)
    }

    fn refresh(&mut self, out: &mut impl Write) -> Result<()> {
        let f = &mut self.frame;
        f.clear();
        ansi::cursor_hide(f).ok();
        ansi::cursor_home(f).ok();

        let header = format!(
            "tilde-term keys | {}x{} | {} keys | Ctrl-Q quits",
            self.size.cols, self.size.rows, self.count
        );
        let cols = usize::from(self.size.cols);
        let mut lines = vec![header];
        lines.extend(self.log.iter().map(|k| format!("  {}", describe(*k))));

        for y in 0..self.size.rows {
            if let Some(line) = lines.get(usize::from(y)) {
                // Every line here is ASCII, so bytes are columns.
                f.push_str(&line[..line.len().min(cols)]);
            }
            ansi::erase_line(f).ok();
            if y + 1 < self.size.rows {
                ansi::newline(f).ok();
            }
        }

        ansi::cursor_to(f, 1, 1).ok();
        ansi::cursor_show(f).ok();
        f.flush_to(out)
    }

    fn on_resize(&mut self, size: Size) {
        self.size = size;
    }
}

fn main() -> Result<()> {
    let session = Session::open_stdin(RawModeConfig::default())?;
    let mut viewer = Viewer::new(session.dimensions()?);
    let keys = KeyDecoder::new(StdinSource::new());

    match EventLoop::new(session, keys, io::stdout()).run(&mut viewer) {
        Err(e) if e.is_orderly() => Ok(()),
        other => other,
    }
}
