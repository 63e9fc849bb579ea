// SPDX-License-Identifier: MIT
//
// Terminal session — raw mode entry/exit, dimension queries, RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, and raw fd writes. These are
// the standard POSIX interfaces for terminal control; there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// The session captures the cooked attributes exactly once, at `open()`,
// and never mutates them. Raw mode is derived from that snapshot and the
// snapshot is what gets reapplied on the way out. Restoring is idempotent,
// so every exit path may call it without tracking who already did.
//
// Platform access sits behind the `Device` trait. `Tty` talks to the real
// terminal through libc; `Headless` keeps everything in memory so the
// session's guarantees (round-trip, idempotent restore, restore on drop)
// can be exercised without a TTY.
//
// While raw mode is armed, the panic hook bypasses Rust's stdout lock, writing a pre-built
// restore sequence directly to fd 1, then reapplies the cooked termios from
// a global backup. A panic mid-frame must never leave the shell in raw mode.

use std::io;
#[cfg(unix)]
use std::sync::Mutex;
use std::sync::Once;
use std::time::Duration;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::error::{Result, TermError};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Create a size from columns and rows.
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

// ─── Raw Mode Configuration ─────────────────────────────────────────────────

bitflags! {
    /// Terminal features switched off while in raw mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RawFlags: u16 {
        /// Echo typed characters (`ECHO`).
        const ECHO              = 0b0000_0001;
        /// Line-at-a-time input (`ICANON`).
        const CANONICAL         = 0b0000_0010;
        /// INTR / QUIT / SUSP signal keys (`ISIG`).
        const SIGNALS           = 0b0000_0100;
        /// Ctrl-V literal-next and friends (`IEXTEN`).
        const EXTENDED_INPUT    = 0b0000_1000;
        /// Ctrl-S / Ctrl-Q output flow control (`IXON`).
        const FLOW_CONTROL      = 0b0001_0000;
        /// Carriage return translated to newline on input (`ICRNL`).
        const CR_TO_NL          = 0b0010_0000;
        /// SIGINT on a break condition (`BRKINT`).
        const BREAK_INTERRUPT   = 0b0100_0000;
        /// Output post-processing, e.g. `\n` → `\r\n` (`OPOST`).
        const OUTPUT_PROCESSING = 0b1000_0000;
    }
}

/// The attribute changes applied on top of the cooked state.
///
/// Reads are byte-at-a-time: `min_bytes` is `VMIN` and `timeout_ds` is
/// `VTIME` in tenths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawModeConfig {
    /// Features to disable.
    pub disable: RawFlags,
    /// Minimum bytes per read (`VMIN`).
    pub min_bytes: u8,
    /// Inter-byte read timeout in deciseconds (`VTIME`).
    pub timeout_ds: u8,
}

impl RawModeConfig {
    /// Raw mode with the given inter-byte timeout.
    ///
    /// The timeout is rounded to whole deciseconds and clamped to the
    /// `1..=255` range `VTIME` can express.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let ds = (timeout.as_millis() + 50) / 100;
        #[allow(clippy::cast_possible_truncation)] // Clamped to u8 range first.
        let timeout_ds = ds.clamp(1, 255) as u8;
        Self {
            timeout_ds,
            ..Self::default()
        }
    }
}

impl Default for RawModeConfig {
    fn default() -> Self {
        Self {
            disable: RawFlags::all(),
            min_bytes: 1,
            timeout_ds: 1,
        }
    }
}

// ─── Cooked Snapshot ────────────────────────────────────────────────────────

/// Snapshot of every terminal attribute, captured once before raw mode.
///
/// There is no way to mutate it: the session only ever reapplies it.
#[derive(Debug, Clone, Copy)]
pub struct TerminalState<A>(A);

impl<A> TerminalState<A> {
    /// The captured platform attributes.
    #[inline]
    #[must_use]
    pub const fn attributes(&self) -> &A {
        &self.0
    }
}

// ─── Device ─────────────────────────────────────────────────────────────────

/// Platform access to a terminal's attributes and size.
pub trait Device {
    /// The platform attribute set (e.g. `libc::termios`).
    type Attrs: Copy;

    /// Read the current attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not a terminal or the query fails.
    fn attributes(&self) -> io::Result<Self::Attrs>;

    /// Apply a full attribute set.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be applied.
    fn apply(&mut self, attrs: &Self::Attrs) -> io::Result<()>;

    /// Query the current window size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is unavailable.
    fn window_size(&self) -> io::Result<Size>;

    /// Derive the raw attribute set from a cooked snapshot.
    fn make_raw(cooked: &Self::Attrs, config: &RawModeConfig) -> Self::Attrs;

    /// Remember `cooked` so a panic can restore it. Called before raw mode
    /// is applied.
    fn arm_restore(&self, _cooked: &Self::Attrs) {}

    /// Forget the panic-restore snapshot. Called after cooked mode is back.
    fn disarm_restore(&self) {}
}

// ─── Session ────────────────────────────────────────────────────────────────

/// Owner of the terminal's raw/cooked lifecycle.
///
/// [`open`](Self::open) captures the cooked state, [`enable_raw`](Self::enable_raw)
/// enters raw mode, [`disable_raw`](Self::disable_raw) puts the cooked state
/// back. Dropping a session that is still raw restores cooked mode.
///
/// # Example
///
/// ```no_run
/// use tilde_term::terminal::{RawModeConfig, Session};
///
/// let mut session = Session::open_stdin(RawModeConfig::default())?;
/// session.enable_raw()?;
/// // ... read keys, draw frames ...
/// session.disable_raw()?;
/// # Ok::<(), tilde_term::error::TermError>(())
/// ```
pub struct Session<D: Device> {
    device: D,
    cooked: TerminalState<D::Attrs>,
    config: RawModeConfig,
    raw: bool,
}

impl Session<Tty> {
    /// Open a session on the process's controlling terminal (stdin).
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalQuery`] if stdin is not a terminal.
    pub fn open_stdin(config: RawModeConfig) -> Result<Self> {
        Self::open(Tty::stdin(), config)
    }
}

impl<D: Device> Session<D> {
    /// Capture the device's current (cooked) attributes.
    ///
    /// Read-only: nothing on the terminal changes yet.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalQuery`] if the attributes cannot be read.
    pub fn open(device: D, config: RawModeConfig) -> Result<Self> {
        let attrs = device.attributes().map_err(TermError::TerminalQuery)?;
        Ok(Self {
            device,
            cooked: TerminalState(attrs),
            config,
            raw: false,
        })
    }

    /// Enter raw mode.
    ///
    /// On failure the terminal is still cooked and [`is_raw`](Self::is_raw)
    /// stays `false`.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalConfigure`] if the raw attributes
    /// cannot be applied.
    pub fn enable_raw(&mut self) -> Result<()> {
        let raw = D::make_raw(self.cooked.attributes(), &self.config);
        self.device.arm_restore(self.cooked.attributes());

        if let Err(e) = self.device.apply(&raw) {
            self.device.disarm_restore();
            return Err(TermError::TerminalConfigure(e));
        }

        self.raw = true;
        debug!(config = ?self.config, "raw mode enabled");
        Ok(())
    }

    /// Reapply the cooked snapshot verbatim.
    ///
    /// Idempotent: calling it twice leaves the terminal exactly as calling
    /// it once does.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalConfigure`] if the cooked attributes
    /// cannot be applied. There is no fallback; callers log and exit.
    pub fn disable_raw(&mut self) -> Result<()> {
        self.device
            .apply(self.cooked.attributes())
            .map_err(TermError::TerminalConfigure)?;

        if self.raw {
            debug!("raw mode disabled");
        }
        self.raw = false;
        self.device.disarm_restore();
        Ok(())
    }

    /// Query the current terminal size.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::TerminalQuery`] if the size is unavailable.
    pub fn dimensions(&self) -> Result<Size> {
        self.device.window_size().map_err(TermError::TerminalQuery)
    }

    /// Whether raw mode is currently applied.
    #[inline]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw
    }

    /// The cooked snapshot captured by [`open`](Self::open).
    #[inline]
    #[must_use]
    pub const fn cooked_state(&self) -> &TerminalState<D::Attrs> {
        &self.cooked
    }

    /// The raw-mode configuration this session applies.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RawModeConfig {
        &self.config
    }

    /// The underlying device.
    #[inline]
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying device.
    #[inline]
    pub const fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: Device> Drop for Session<D> {
    fn drop(&mut self) {
        if self.raw {
            if let Err(e) = self.disable_raw() {
                warn!(error = %e, "failed to restore cooked mode on drop");
            }
        }
    }
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the cooked termios for panic recovery.
///
/// The [`Session`] owns its own snapshot, but the panic hook can't reach
/// it. This copy sits behind a [`Mutex`] so the hook can restore cooked
/// mode without the session.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<(libc::c_int, libc::termios)>> = Mutex::new(None);

/// Undo raw mode after a panic: clear the screen, show the cursor, then
/// reapply the cooked attributes. Does nothing once the session has left
/// raw mode. Returns whether anything was restored.
#[cfg(unix)]
fn panic_restore() -> bool {
    let Ok(guard) = TERMIOS_BACKUP.lock() else {
        return false;
    };
    let Some((fd, ref original)) = *guard else {
        return false;
    };
    emergency_restore();
    unsafe {
        let _ = libc::tcsetattr(fd, libc::TCSAFLUSH, original);
    }
    true
}

#[cfg(not(unix))]
fn panic_restore() -> bool {
    false
}

/// Restore sequence for emergency use: clear screen, home, show cursor.
#[cfg_attr(not(unix), allow(dead_code))]
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Installs the panic hook at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal with no
/// echo and no line editing. While raw mode is armed the hook writes
/// [`EMERGENCY_RESTORE`] straight to fd 1 and restores termios, then it
/// delegates to the original handler so the message prints to a working
/// terminal.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            panic_restore();
            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
///
/// Bypasses Rust's `io::stdout()` lock to avoid deadlocking if the panic
/// occurred while the lock was held (e.g., mid-frame flush).
#[cfg(unix)]
fn emergency_restore() {
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }
}

// ─── Tty ────────────────────────────────────────────────────────────────────

/// The real terminal, accessed through termios on a file descriptor.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct Tty {
    fd: libc::c_int,
}

#[cfg(unix)]
impl Tty {
    /// The terminal attached to stdin.
    #[must_use]
    pub const fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }

    /// Whether the descriptor refers to a terminal.
    #[must_use]
    pub fn is_tty(&self) -> bool {
        unsafe { libc::isatty(self.fd) != 0 }
    }
}

/// Which termios flag field a [`RawFlags`] bit lives in.
#[cfg(unix)]
#[derive(Clone, Copy)]
enum FlagField {
    Input,
    Output,
    Local,
}

/// Mapping from portable raw flags to termios bits.
#[cfg(unix)]
const TERMIOS_FLAGS: &[(RawFlags, FlagField, libc::tcflag_t)] = &[
    (RawFlags::BREAK_INTERRUPT, FlagField::Input, libc::BRKINT),
    (RawFlags::CR_TO_NL, FlagField::Input, libc::ICRNL),
    (RawFlags::FLOW_CONTROL, FlagField::Input, libc::IXON),
    (RawFlags::OUTPUT_PROCESSING, FlagField::Output, libc::OPOST),
    (RawFlags::ECHO, FlagField::Local, libc::ECHO),
    (RawFlags::CANONICAL, FlagField::Local, libc::ICANON),
    (RawFlags::SIGNALS, FlagField::Local, libc::ISIG),
    (RawFlags::EXTENDED_INPUT, FlagField::Local, libc::IEXTEN),
];

#[cfg(unix)]
impl Device for Tty {
    type Attrs = libc::termios;

    fn attributes(&self) -> io::Result<libc::termios> {
        if !self.is_tty() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not a terminal",
            ));
        }

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(termios)
        }
    }

    fn apply(&mut self, attrs: &libc::termios) -> io::Result<()> {
        unsafe {
            if libc::tcsetattr(self.fd, libc::TCSAFLUSH, attrs) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn window_size(&self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        if ws.ws_col == 0 || ws.ws_row == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "terminal reported a zero-sized window",
            ));
        }
        Ok(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    }

    fn make_raw(cooked: &libc::termios, config: &RawModeConfig) -> libc::termios {
        let mut raw = *cooked;

        for &(flag, field, bits) in TERMIOS_FLAGS {
            if !config.disable.contains(flag) {
                continue;
            }
            match field {
                FlagField::Input => raw.c_iflag &= !bits,
                FlagField::Output => raw.c_oflag &= !bits,
                FlagField::Local => raw.c_lflag &= !bits,
            }
        }

        raw.c_cc[libc::VMIN] = config.min_bytes;
        raw.c_cc[libc::VTIME] = config.timeout_ds;
        raw
    }

    fn arm_restore(&self, cooked: &libc::termios) {
        install_panic_hook();
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some((self.fd, *cooked));
        }
    }

    fn disarm_restore(&self) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
    }
}

/// Placeholder on platforms without termios. Every query fails.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy)]
pub struct Tty;

#[cfg(not(unix))]
impl Tty {
    /// The terminal attached to stdin.
    #[must_use]
    pub const fn stdin() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Device for Tty {
    type Attrs = ();

    fn attributes(&self) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn apply(&mut self, _attrs: &()) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn window_size(&self) -> io::Result<Size> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn make_raw(_cooked: &(), _config: &RawModeConfig) {}

    fn arm_restore(&self, _cooked: &()) {
        install_panic_hook();
    }
}

// ─── Headless ───────────────────────────────────────────────────────────────

/// Attribute set tracked by [`Headless`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessAttrs {
    /// Features currently switched off.
    pub disabled: RawFlags,
    /// `VMIN` equivalent.
    pub min_bytes: u8,
    /// `VTIME` equivalent.
    pub timeout_ds: u8,
}

impl HeadlessAttrs {
    /// A typical cooked terminal: everything on, line-buffered reads.
    pub const COOKED: Self = Self {
        disabled: RawFlags::empty(),
        min_bytes: 1,
        timeout_ds: 0,
    };
}

/// In-memory terminal. Records every attribute set applied to it.
#[derive(Debug, Clone)]
pub struct Headless {
    current: HeadlessAttrs,
    size: Size,
    history: Vec<HeadlessAttrs>,
    is_tty: bool,
    fail_apply: bool,
}

impl Headless {
    /// A cooked headless terminal of the given size.
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            current: HeadlessAttrs::COOKED,
            size,
            history: Vec::new(),
            is_tty: true,
            fail_apply: false,
        }
    }

    /// A device whose attribute queries fail, like a pipe on stdin.
    #[must_use]
    pub fn not_a_tty() -> Self {
        let mut this = Self::new(Size::new(80, 24));
        this.is_tty = false;
        this
    }

    /// Make every subsequent `apply` fail.
    #[must_use]
    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    /// Toggle apply failures on an existing device.
    pub const fn set_fail_apply(&mut self, fail: bool) {
        self.fail_apply = fail;
    }

    /// The attributes currently in effect.
    #[must_use]
    pub const fn current(&self) -> HeadlessAttrs {
        self.current
    }

    /// Every attribute set applied so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[HeadlessAttrs] {
        &self.history
    }

    /// Change the reported window size.
    pub const fn resize(&mut self, size: Size) {
        self.size = size;
    }
}

impl Device for Headless {
    type Attrs = HeadlessAttrs;

    fn attributes(&self) -> io::Result<HeadlessAttrs> {
        if self.is_tty {
            Ok(self.current)
        } else {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not a terminal",
            ))
        }
    }

    fn apply(&mut self, attrs: &HeadlessAttrs) -> io::Result<()> {
        if self.fail_apply {
            return Err(io::Error::other("tcsetattr failed"));
        }
        self.current = *attrs;
        self.history.push(*attrs);
        Ok(())
    }

    fn window_size(&self) -> io::Result<Size> {
        if self.is_tty {
            Ok(self.size)
        } else {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }
    }

    fn make_raw(cooked: &HeadlessAttrs, config: &RawModeConfig) -> HeadlessAttrs {
        HeadlessAttrs {
            disabled: cooked.disabled | config.disable,
            min_bytes: config.min_bytes,
            timeout_ds: config.timeout_ds,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
