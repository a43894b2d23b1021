//! Gaze-estimation engine boundary.
//!
//! The engine (camera capture, face/eye features, regression to screen
//! coordinates) is an opaque collaborator. This module only names what the
//! tracker consumes from it: lifecycle calls, a per-estimate listener, and
//! calibration sample recording.

use std::time::Instant;

use serde::Deserialize;

use crate::error::Result;

// ── Samples ─────────────────────────────────────────────────

/// A screen-coordinate position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One estimate from the engine. `point` is `None` when the engine reports
/// that it has no estimate for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub point: Option<ScreenPoint>,
    /// Engine-side timestamp of the estimate.
    pub observed_at: Instant,
}

impl GazeSample {
    pub fn at(point: ScreenPoint, observed_at: Instant) -> Self {
        Self {
            point: Some(point),
            observed_at,
        }
    }

    pub fn no_signal(observed_at: Instant) -> Self {
        Self {
            point: None,
            observed_at,
        }
    }
}

/// Callback invoked by the engine for every estimate, in emission order.
pub type GazeListener = Box<dyn FnMut(GazeSample)>;

/// Event type passed with a recorded calibration sample. Calibration is
/// user-driven, so every sample is an explicit click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Click,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
        }
    }
}

// ── Options ─────────────────────────────────────────────────

/// Regression model used by the engine to map eye features to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegressionModel {
    #[default]
    Ridge,
    WeightedRidge,
    ThreadedRidge,
}

impl RegressionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ridge => "ridge",
            Self::WeightedRidge => "weighted-ridge",
            Self::ThreadedRidge => "threaded-ridge",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ridge" => Some(Self::Ridge),
            "weighted-ridge" => Some(Self::WeightedRidge),
            "threaded-ridge" => Some(Self::ThreadedRidge),
            _ => None,
        }
    }
}

/// Engine settings applied before `begin`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Show the camera preview overlay.
    pub show_video_preview: bool,
    /// Draw the engine's own prediction points.
    pub show_prediction_points: bool,
    /// Persist calibration data between sessions.
    pub save_data_across_sessions: bool,
    pub regression: RegressionModel,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            show_video_preview: true,
            show_prediction_points: true,
            save_data_across_sessions: false,
            regression: RegressionModel::Ridge,
        }
    }
}

// ── Engine trait ────────────────────────────────────────────

/// Operations the tracker needs from a gaze-estimation engine.
///
/// All calls happen on the event-loop thread. Fallible calls report
/// `TrackerError::EngineUnavailable`; the session converts those into a
/// user-visible error phase.
pub trait GazeEngine {
    /// Apply preview, prediction-point, regression and persistence settings.
    fn configure(&mut self, options: &EngineOptions);

    /// Register the listener that receives every estimate.
    fn set_listener(&mut self, listener: GazeListener);

    /// Start camera capture and estimation.
    fn begin(&mut self) -> Result<()>;

    /// Suspend estimation; no samples are emitted until `resume`.
    fn pause(&mut self);

    fn resume(&mut self) -> Result<()>;

    /// Stop capture and release the camera.
    fn end(&mut self);

    /// Drop all recorded calibration samples.
    fn clear_saved_data(&mut self);

    /// Train the engine with the user looking at `(x, y)`.
    fn record_screen_position(&mut self, x: f64, y: f64, kind: SampleKind) -> Result<()>;
}
