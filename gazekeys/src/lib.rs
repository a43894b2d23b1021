//! gazekeys library: gaze signal, calibration, dwell/blink key selection
//! and the session state machine behind a gaze-controlled keyboard.
//!
//! The binary entry point lives in `main.rs`.

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod gaze;
pub mod input_source;
pub mod keyboard;
pub mod session;
