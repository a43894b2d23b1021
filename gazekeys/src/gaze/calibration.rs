//! Calibration walk-through.
//!
//! The user looks at each point in a fixed sequence and confirms with a
//! click; every confirmation is forwarded to the engine as a training
//! sample. Points are computed once from the viewport at `start` and do not
//! move if the viewport changes mid-session.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::engine::{GazeEngine, SampleKind, ScreenPoint};
use crate::error::{Result, TrackerError};

/// Inset from the viewport edge for the five-point pattern (px).
const FIVE_POINT_INSET: f64 = 20.0;

/// Grid fractions for the nine-point pattern.
const NINE_POINT_FRACTIONS: [f64; 3] = [0.1, 0.5, 0.9];

// ── Pattern ─────────────────────────────────────────────────

/// Which set of fixation points to walk through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalibrationPattern {
    /// 3x3 grid at 10/50/90 % of the viewport, row by row.
    #[default]
    NinePoint,
    /// Four corners inset 20 px, clockwise from top-left, then center.
    FivePoint,
}

impl CalibrationPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NinePoint => "nine-point",
            Self::FivePoint => "five-point",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "nine-point" | "9" => Some(Self::NinePoint),
            "five-point" | "5" => Some(Self::FivePoint),
            _ => None,
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            Self::NinePoint => 9,
            Self::FivePoint => 5,
        }
    }

    /// Compute the ordered points for a viewport.
    pub fn points(&self, width: f64, height: f64) -> Vec<CalibrationPoint> {
        let coords: Vec<(f64, f64)> = match self {
            Self::NinePoint => NINE_POINT_FRACTIONS
                .iter()
                .flat_map(|fy| {
                    NINE_POINT_FRACTIONS
                        .iter()
                        .map(move |fx| (width * fx, height * fy))
                })
                .collect(),
            Self::FivePoint => vec![
                (FIVE_POINT_INSET, FIVE_POINT_INSET),
                (width - FIVE_POINT_INSET, FIVE_POINT_INSET),
                (width - FIVE_POINT_INSET, height - FIVE_POINT_INSET),
                (FIVE_POINT_INSET, height - FIVE_POINT_INSET),
                (width / 2.0, height / 2.0),
            ],
        };
        coords
            .into_iter()
            .enumerate()
            .map(|(index, (screen_x, screen_y))| CalibrationPoint {
                index,
                screen_x,
                screen_y,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub pattern: CalibrationPattern,
    /// Delay between a successful engine start and the calibration prompt (ms).
    pub prompt_delay_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            pattern: CalibrationPattern::NinePoint,
            prompt_delay_ms: 2000,
        }
    }
}

// ── Session ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub index: usize,
    pub screen_x: f64,
    pub screen_y: f64,
}

impl CalibrationPoint {
    pub fn screen(&self) -> ScreenPoint {
        ScreenPoint::new(self.screen_x, self.screen_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    NotStarted,
    InProgress,
    Complete,
}

impl CalibrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        }
    }
}

/// Raised once when the last point is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationFinished {
    pub points_recorded: usize,
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationProgress {
    /// Moved on to the point at `next`.
    Advanced { next: usize, remaining: usize },
    Finished(CalibrationFinished),
}

#[derive(Debug)]
pub struct CalibrationSession {
    pub pattern: CalibrationPattern,
    points: Vec<CalibrationPoint>,
    current_index: usize,
    state: CalibrationState,
}

impl CalibrationSession {
    pub fn new(pattern: CalibrationPattern) -> Self {
        Self {
            pattern,
            points: Vec::new(),
            current_index: 0,
            state: CalibrationState::NotStarted,
        }
    }

    /// Snapshot the viewport, compute the point set and begin at index 0.
    /// Calling it again restarts from scratch.
    pub fn start(&mut self, viewport_width: f64, viewport_height: f64) {
        self.points = self.pattern.points(viewport_width, viewport_height);
        self.current_index = 0;
        self.state = CalibrationState::InProgress;
        info!(
            "Calibration started ({} points, {}, viewport {:.0}x{:.0})",
            self.points.len(),
            self.pattern.as_str(),
            viewport_width,
            viewport_height
        );
    }

    /// Forward the current point to the engine, then advance.
    ///
    /// On engine failure the index is left untouched so the caller can
    /// retry the same point.
    pub fn confirm_current(&mut self, engine: &mut dyn GazeEngine) -> Result<CalibrationProgress> {
        if self.state != CalibrationState::InProgress {
            return Err(TrackerError::CalibrationInactive);
        }
        let point = self
            .current_point()
            .ok_or(TrackerError::CalibrationInactive)?;

        let recorded =
            engine.record_screen_position(point.screen_x, point.screen_y, SampleKind::Click);
        if let Err(e) = recorded {
            warn!(index = point.index, "Calibration sample rejected: {}", e);
            return Err(e);
        }
        debug!(
            index = point.index,
            x = point.screen_x,
            y = point.screen_y,
            "Calibration point recorded"
        );

        self.current_index += 1;
        if self.current_index >= self.points.len() {
            self.state = CalibrationState::Complete;
            info!("Calibration complete ({} points)", self.points.len());
            return Ok(CalibrationProgress::Finished(CalibrationFinished {
                points_recorded: self.points.len(),
            }));
        }
        Ok(CalibrationProgress::Advanced {
            next: self.current_index,
            remaining: self.points.len() - self.current_index,
        })
    }

    /// Abandon any progress and return to `NotStarted`.
    pub fn reset(&mut self) {
        self.points.clear();
        self.current_index = 0;
        self.state = CalibrationState::NotStarted;
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_calibrating(&self) -> bool {
        self.state == CalibrationState::InProgress
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The point the user should look at now.
    pub fn current_point(&self) -> Option<CalibrationPoint> {
        if self.state != CalibrationState::InProgress {
            return None;
        }
        self.points.get(self.current_index).copied()
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// `(n, N)` for the "point n of N" label; `None` unless calibrating.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.current_point()
            .map(|p| (p.index + 1, self.points.len()))
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::simulated::SimulatedEngine;

    #[test]
    fn test_nine_point_grid() {
        let pts = CalibrationPattern::NinePoint.points(1000.0, 800.0);
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0].screen(), ScreenPoint::new(100.0, 80.0));
        assert_eq!(pts[1].screen(), ScreenPoint::new(500.0, 80.0));
        assert_eq!(pts[4].screen(), ScreenPoint::new(500.0, 400.0));
        assert_eq!(pts[8].screen(), ScreenPoint::new(900.0, 720.0));
        assert!(pts.iter().enumerate().all(|(i, p)| p.index == i));
    }

    #[test]
    fn test_five_point_pattern() {
        let pts = CalibrationPattern::FivePoint.points(1000.0, 800.0);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0].screen(), ScreenPoint::new(20.0, 20.0));
        assert_eq!(pts[1].screen(), ScreenPoint::new(980.0, 20.0));
        assert_eq!(pts[2].screen(), ScreenPoint::new(980.0, 780.0));
        assert_eq!(pts[3].screen(), ScreenPoint::new(20.0, 780.0));
        assert_eq!(pts[4].screen(), ScreenPoint::new(500.0, 400.0));
    }

    #[test]
    fn test_pattern_from_str() {
        assert_eq!(CalibrationPattern::from_str("9"), Some(CalibrationPattern::NinePoint));
        assert_eq!(
            CalibrationPattern::from_str("five-point"),
            Some(CalibrationPattern::FivePoint)
        );
        assert_eq!(CalibrationPattern::from_str("7"), None);
    }

    #[test]
    fn test_full_walkthrough_finishes_once() {
        let mut engine = SimulatedEngine::new();
        let mut cal = CalibrationSession::new(CalibrationPattern::NinePoint);
        assert_eq!(cal.state(), CalibrationState::NotStarted);

        cal.start(1000.0, 800.0);
        assert_eq!(cal.state(), CalibrationState::InProgress);
        assert_eq!(cal.progress(), Some((1, 9)));

        let mut finished = 0;
        for i in 0..9 {
            match cal.confirm_current(&mut engine).unwrap() {
                CalibrationProgress::Advanced { next, remaining } => {
                    assert_eq!(next, i + 1);
                    assert_eq!(remaining, 9 - next);
                    assert_eq!(cal.state(), CalibrationState::InProgress);
                }
                CalibrationProgress::Finished(f) => {
                    assert_eq!(i, 8, "should finish only on the last point");
                    assert_eq!(f.points_recorded, 9);
                    finished += 1;
                }
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(cal.state(), CalibrationState::Complete);
        assert!(cal.current_point().is_none());
        assert_eq!(engine.recorded_samples().len(), 9);
        assert_eq!(engine.recorded_samples()[0].point, ScreenPoint::new(100.0, 80.0));

        // Further confirmations are rejected, not double-counted
        assert_eq!(
            cal.confirm_current(&mut engine),
            Err(TrackerError::CalibrationInactive)
        );
    }

    #[test]
    fn test_confirm_before_start_is_rejected() {
        let mut engine = SimulatedEngine::new();
        let mut cal = CalibrationSession::new(CalibrationPattern::FivePoint);
        assert_eq!(
            cal.confirm_current(&mut engine),
            Err(TrackerError::CalibrationInactive)
        );
        assert!(engine.recorded_samples().is_empty());
    }

    #[test]
    fn test_engine_failure_keeps_index() {
        let mut engine = SimulatedEngine::new();
        let mut cal = CalibrationSession::new(CalibrationPattern::FivePoint);
        cal.start(1000.0, 800.0);
        cal.confirm_current(&mut engine).unwrap();

        engine.set_available(false);
        let err = cal.confirm_current(&mut engine).unwrap_err();
        assert!(matches!(err, TrackerError::EngineUnavailable(_)));
        assert_eq!(cal.current_index(), 1);
        assert_eq!(cal.state(), CalibrationState::InProgress);

        // Retry succeeds on the same point
        engine.set_available(true);
        assert_eq!(
            cal.confirm_current(&mut engine).unwrap(),
            CalibrationProgress::Advanced { next: 2, remaining: 3 }
        );
    }

    #[test]
    fn test_restart_resets_index() {
        let mut engine = SimulatedEngine::new();
        let mut cal = CalibrationSession::new(CalibrationPattern::NinePoint);
        cal.start(1000.0, 800.0);
        cal.confirm_current(&mut engine).unwrap();
        cal.confirm_current(&mut engine).unwrap();

        cal.start(640.0, 480.0);
        assert_eq!(cal.current_index(), 0);
        assert_eq!(cal.current_point().unwrap().screen(), ScreenPoint::new(64.0, 48.0));

        cal.reset();
        assert_eq!(cal.state(), CalibrationState::NotStarted);
        assert!(cal.points().is_empty());
    }
}
