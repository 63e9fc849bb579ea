//! # tilde-screen — Screen renderer for tilde
//!
//! This crate turns decoded keys into cursor movement and screen state into
//! escape-coded frames:
//!
//! - **[`position`]** — `CursorPosition` (row, col), 1-based, and the
//!   `Bounds` it is clamped to
//! - **[`view`]** — row drawing: filler glyphs, the centered banner, and
//!   width-aware truncation of content rows
//! - **[`screen`]** — the `Screen` state machine, which plugs into the
//!   tilde-term control loop as its application

pub mod position;
pub mod screen;
pub mod view;

pub use screen::{Screen, State};
