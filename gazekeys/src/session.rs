//! Tracker session: the non-visual half of the UI shell.
//!
//! Owns the gaze signal, calibration, key selection and text buffer, and
//! moves through the application phases:
//!
//! ```text
//! Initializing ──prompt──▶ AwaitingCalibration ──start──▶ Calibrating ──last point──▶ Ready
//!      │                                                                               │
//!      └──engine failure──▶ Error ◀────────────── engine failure ─────────────────────┘
//! ```
//!
//! `restart_tracking` leads from `Error` (or `Ready`) back to
//! `AwaitingCalibration`. Calibration and typing never run at the same
//! time: the keyboard can only be shown in `Ready`.

use std::fmt;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::gaze::calibration::{CalibrationProgress, CalibrationSession};
use crate::gaze::engine::{GazeEngine, GazeListener, GazeSample};
use crate::gaze::signal::{GazePoint, GazeSignal};
use crate::keyboard::layout::{Key, KeyboardGeometry, KeyboardLayout};
use crate::keyboard::selection::{CommitTrigger, SelectionEngine, SelectionEvent};
use crate::keyboard::text_buffer::{KeyEffect, TextBuffer};

// ── Phase ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Engine starting; the calibration prompt is not shown yet.
    Initializing,
    /// "Calibration Required" prompt is shown.
    AwaitingCalibration,
    Calibrating,
    /// Calibrated; the keyboard may be toggled.
    Ready,
    /// Engine failure; only `restart_tracking` leaves this phase.
    Error { message: String },
}

impl TrackerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::AwaitingCalibration => "awaiting-calibration",
            Self::Calibrating => "calibrating",
            Self::Ready => "ready",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { message } => write!(f, "error: {message}"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ── Commit ──────────────────────────────────────────────────

/// A committed key and what it did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub key: Key,
    pub trigger: CommitTrigger,
    pub effect: KeyEffect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

// ── Session ─────────────────────────────────────────────────

pub struct TrackerSession<E: GazeEngine> {
    pub config: TrackerConfig,
    engine: E,
    engine_started: bool,
    phase: TrackerPhase,
    viewport: Viewport,
    layout: KeyboardLayout,
    geometry: KeyboardGeometry,
    signal: GazeSignal,
    calibration: CalibrationSession,
    selection: SelectionEngine,
    buffer: TextBuffer,
    keyboard_visible: bool,
    /// Latest recoverable engine failure (e.g. a rejected calibration sample).
    last_error: Option<String>,
}

impl<E: GazeEngine> TrackerSession<E> {
    pub fn new(engine: E, config: TrackerConfig, viewport: Viewport) -> Self {
        let layout = KeyboardLayout::qwerty();
        let geometry = KeyboardGeometry::new(&layout, viewport.width, viewport.height);
        Self {
            signal: GazeSignal::new(config.signal.clone()),
            calibration: CalibrationSession::new(config.calibration.pattern),
            selection: SelectionEngine::new(config.selection.clone()),
            config,
            engine,
            engine_started: false,
            phase: TrackerPhase::Initializing,
            viewport,
            layout,
            geometry,
            buffer: TextBuffer::new(),
            keyboard_visible: false,
            last_error: None,
        }
    }

    // ── Engine lifecycle ────────────────────────────────────

    /// Configure the engine, install `listener`, and begin capture.
    ///
    /// On failure the session enters `Error` and the error is returned.
    pub fn start(&mut self, listener: GazeListener) -> Result<()> {
        self.phase = TrackerPhase::Initializing;
        self.engine.configure(&self.config.engine);
        self.engine.set_listener(listener);
        self.begin_engine()
    }

    fn begin_engine(&mut self) -> Result<()> {
        match self.engine.begin() {
            Ok(()) => {
                self.engine_started = true;
                info!(
                    "Gaze engine started (regression {})",
                    self.config.engine.regression.as_str()
                );
                Ok(())
            }
            Err(e) => {
                self.fail(format!("Failed to start eye tracking: {e}"));
                Err(e)
            }
        }
    }

    /// Show the calibration prompt once the engine has settled.
    /// No-op unless the engine started and nothing else happened since.
    pub fn show_calibration_prompt(&mut self) -> bool {
        if self.phase == TrackerPhase::Initializing && self.engine_started {
            self.phase = TrackerPhase::AwaitingCalibration;
            info!("Calibration required");
            true
        } else {
            false
        }
    }

    /// Reset calibration and keyboard state and restart the engine.
    ///
    /// A started engine is paused, cleared and resumed; an engine that
    /// never started is started again. Typed text is kept.
    pub fn restart_tracking(&mut self) -> Result<()> {
        info!("Restarting tracking (was {})", self.phase);
        self.hide_keyboard();
        self.calibration.reset();
        self.signal.reset();
        self.last_error = None;
        self.phase = TrackerPhase::Initializing;

        if !self.engine_started {
            self.begin_engine()?;
        } else {
            self.engine.pause();
            self.engine.clear_saved_data();
            if let Err(e) = self.engine.resume() {
                self.fail(format!("Failed to restart eye tracking: {e}"));
                return Err(e);
            }
        }
        self.phase = TrackerPhase::AwaitingCalibration;
        Ok(())
    }

    /// Stop the keyboard and release the engine.
    pub fn shutdown(&mut self) {
        self.hide_keyboard();
        if self.engine_started {
            self.engine.end();
            self.engine_started = false;
        }
    }

    fn fail(&mut self, message: String) {
        error!("{}", message);
        self.hide_keyboard();
        self.phase = TrackerPhase::Error { message };
    }

    // ── Calibration ─────────────────────────────────────────

    /// Begin (or restart) the calibration walk-through for the current
    /// viewport. Hides the keyboard if it was visible.
    pub fn start_calibration(&mut self) -> Result<()> {
        match self.phase {
            TrackerPhase::AwaitingCalibration
            | TrackerPhase::Calibrating
            | TrackerPhase::Ready => {}
            ref other => {
                return Err(TrackerError::InvalidPhase {
                    action: "start calibration",
                    phase: other.as_str(),
                })
            }
        }
        self.hide_keyboard();
        self.calibration.start(self.viewport.width, self.viewport.height);
        self.phase = TrackerPhase::Calibrating;
        Ok(())
    }

    /// Confirm the fixation on the current calibration point.
    ///
    /// An engine failure leaves calibration on the same point (the user may
    /// click again) and is surfaced through `last_error`.
    pub fn confirm_calibration_point(&mut self) -> Result<CalibrationProgress> {
        if self.phase != TrackerPhase::Calibrating {
            return Err(TrackerError::CalibrationInactive);
        }
        match self.calibration.confirm_current(&mut self.engine) {
            Ok(progress) => {
                self.last_error = None;
                if let CalibrationProgress::Finished(_) = progress {
                    self.phase = TrackerPhase::Ready;
                    info!("Tracking ready");
                }
                Ok(progress)
            }
            Err(e) => {
                warn!("Calibration point not recorded: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ── Keyboard ────────────────────────────────────────────

    pub fn show_keyboard(&mut self) -> Result<()> {
        if self.phase != TrackerPhase::Ready {
            return Err(TrackerError::KeyboardUnavailable);
        }
        if !self.keyboard_visible {
            self.keyboard_visible = true;
            self.selection.activate();
            info!("Keyboard shown");
        }
        Ok(())
    }

    /// Hide the keyboard and drop any partial dwell.
    pub fn hide_keyboard(&mut self) {
        self.selection.deactivate();
        if self.keyboard_visible {
            self.keyboard_visible = false;
            info!("Keyboard hidden");
        }
    }

    /// Returns the new visibility.
    pub fn toggle_keyboard(&mut self) -> Result<bool> {
        if self.keyboard_visible {
            self.hide_keyboard();
        } else {
            self.show_keyboard()?;
        }
        Ok(self.keyboard_visible)
    }

    // ── Gaze input ──────────────────────────────────────────

    /// Feed one engine estimate.
    pub fn on_sample(&mut self, sample: GazeSample, arrived_at: Instant) {
        self.signal.on_sample(sample, arrived_at);
    }

    /// One selection period. Blink detection runs first; a blink commit
    /// pre-empts dwell accumulation for this tick.
    pub fn tick(&mut self, now: Instant) -> Option<Commit> {
        if !self.keyboard_visible {
            return None;
        }

        if self.signal.poll(now).is_some() {
            if let Some(committed) = self.selection.on_blink(now) {
                return Some(self.apply(committed.key, committed.trigger));
            }
        }

        match self.selection.tick(now, &self.signal, &self.geometry)? {
            SelectionEvent::Committed(committed) => {
                Some(self.apply(committed.key, committed.trigger))
            }
            SelectionEvent::Focused { .. } | SelectionEvent::FocusCleared { .. } => None,
        }
    }

    fn apply(&mut self, key: Key, trigger: CommitTrigger) -> Commit {
        let effect = self.buffer.apply(key);
        info!(key = %key, trigger = trigger.as_str(), "Key committed");
        if effect == KeyEffect::HideRequested {
            self.hide_keyboard();
        }
        Commit {
            key,
            trigger,
            effect,
        }
    }

    /// Change the viewport; key geometry follows immediately, calibration
    /// points keep the snapshot taken at `start_calibration`.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.geometry = KeyboardGeometry::new(&self.layout, viewport.width, viewport.height);
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn phase(&self) -> &TrackerPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == TrackerPhase::Ready
    }

    pub fn keyboard_visible(&self) -> bool {
        self.keyboard_visible
    }

    pub fn text(&self) -> &str {
        self.buffer.content()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Position of the on-screen gaze dot.
    pub fn gaze_position(&self) -> Option<GazePoint> {
        self.signal.current_position()
    }

    pub fn signal(&self) -> &GazeSignal {
        &self.signal
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    pub fn geometry(&self) -> &KeyboardGeometry {
        &self.geometry
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

// ── Tests ───────────────────────────────────────────────────
