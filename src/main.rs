// SPDX-License-Identifier: MIT
//
// tilde — a full-screen terminal display driven by raw keyboard input.
//
// This is the binary that wires the crates together:
//
//   tilde-term   → raw mode session, key decoding, escape codes, control loop
//   tilde-screen → cursor tracking and full-screen redraw
//
// The Screen implements tilde-term's App trait. Each keypress flows through:
//
//   stdin → StdinSource → KeyDecoder → Screen::process_key → Screen::refresh
//   → one write to stdout
//
// Ctrl-Q quits. On every way out the screen is cleared and the terminal is
// put back the way it was found before the process exits.
//
// Exit status: 0 after Ctrl-Q or when stdin reaches end of input, 1 when
// the configuration is invalid or the terminal cannot be driven.

mod config;
mod logging;

use std::io;
use std::process;

use anyhow::Context;
use tracing::info;

use tilde_screen::Screen;
use tilde_term::event_loop::EventLoop;
use tilde_term::input::KeyDecoder;
use tilde_term::reader::StdinSource;
use tilde_term::terminal::Session;

use crate::config::Config;

fn run() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    logging::init(&config.log).context("failed to set up logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let session = Session::open_stdin(config.raw_mode()).context("failed to initialize terminal")?;
    let size = session
        .dimensions()
        .context("failed to read terminal size")?;

    let mut screen = Screen::new(size).with_view(config.view());
    let keys = KeyDecoder::new(StdinSource::new()).with_timeouts(config.timeout(), config.timeout());
    let mut event_loop = EventLoop::new(session, keys, io::stdout());

    match event_loop.run(&mut screen) {
        Ok(()) => {
            info!("quit");
            Ok(())
        }
        Err(e) if e.is_orderly() => {
            info!("input closed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    if let Err(e) = run() {
        eprintln!("tilde: {e:#}");
        process::exit(1);
    }
}
