//! Gaze input: the engine boundary, signal normalization, calibration,
//! and a simulated engine.

pub mod calibration;
pub mod engine;
pub mod signal;
pub mod simulated;
