//! Gaze signal normalization and blink candidates.
//!
//! Collapses the engine's estimate stream into a single current position
//! and derives a lost-signal state from the time since the last estimate.
//! A lost period is reported as one `BlinkDetected`, no matter how many
//! times it is polled.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use super::engine::{GazeSample, ScreenPoint};

// ── Config ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Gap since the last estimate after which the signal counts as lost (ms).
    pub blink_threshold_ms: u64,
}

impl SignalConfig {
    pub fn blink_threshold(&self) -> Duration {
        Duration::from_millis(self.blink_threshold_ms)
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            blink_threshold_ms: 300,
        }
    }
}

// ── Types ───────────────────────────────────────────────────

/// Most recent gaze estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
    pub observed_at: Instant,
}

impl GazePoint {
    pub fn screen(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    /// An estimate arrived within the blink threshold.
    Active,
    /// No estimate within the threshold; treated as a blink in progress.
    Lost,
}

impl SignalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Lost => "lost",
        }
    }
}

/// Raised once per lost-signal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkDetected {
    /// Arrival time of the last estimate before the gap.
    pub last_seen: Instant,
    /// When the loss was noticed.
    pub detected_at: Instant,
}

// ── State ───────────────────────────────────────────────────

/// Owner of the current gaze position. Nothing else writes it.
#[derive(Debug)]
pub struct GazeSignal {
    pub config: SignalConfig,
    position: Option<GazePoint>,
    last_arrival: Option<Instant>,
    /// Whether the blink for the current lost period was already raised.
    blink_reported: bool,
    samples_seen: u64,
}

impl GazeSignal {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            position: None,
            last_arrival: None,
            blink_reported: false,
            samples_seen: 0,
        }
    }

    /// Record an estimate that arrived at `arrived_at`.
    ///
    /// "No estimate" samples are ignored: they neither move the position
    /// nor refresh the arrival time, so they let the signal go lost.
    pub fn on_sample(&mut self, sample: GazeSample, arrived_at: Instant) {
        let Some(point) = sample.point else {
            return;
        };
        self.position = Some(GazePoint {
            x: point.x,
            y: point.y,
            observed_at: sample.observed_at,
        });
        self.last_arrival = Some(arrived_at);
        self.blink_reported = false;
        self.samples_seen += 1;
    }

    /// Latest position, kept across short signal losses.
    pub fn current_position(&self) -> Option<GazePoint> {
        self.position
    }

    /// True iff an estimate arrived no more than `threshold` before `now`.
    pub fn is_signal_active(&self, now: Instant, threshold: Duration) -> bool {
        match self.last_arrival {
            Some(t) => now.saturating_duration_since(t) <= threshold,
            None => false,
        }
    }

    pub fn state(&self, now: Instant) -> SignalState {
        if self.is_signal_active(now, self.config.blink_threshold()) {
            SignalState::Active
        } else {
            SignalState::Lost
        }
    }

    /// Check for a new lost period. Returns `Some` exactly once per period;
    /// the next arrived estimate re-arms detection. Nothing is raised
    /// before the first estimate.
    pub fn poll(&mut self, now: Instant) -> Option<BlinkDetected> {
        let last_seen = self.last_arrival?;
        if self.blink_reported || self.is_signal_active(now, self.config.blink_threshold()) {
            return None;
        }
        self.blink_reported = true;
        debug!(
            gap_ms = now.saturating_duration_since(last_seen).as_millis() as u64,
            "Gaze signal lost, blink candidate"
        );
        Some(BlinkDetected {
            last_seen,
            detected_at: now,
        })
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Forget position and timing (restart flow).
    pub fn reset(&mut self) {
        self.position = None;
        self.last_arrival = None;
        self.blink_reported = false;
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, t: Instant) -> GazeSample {
        GazeSample::at(ScreenPoint::new(x, y), t)
    }

    #[test]
    fn test_no_position_before_first_sample() {
        let signal = GazeSignal::new(SignalConfig::default());
        let now = Instant::now();
        assert!(signal.current_position().is_none());
        assert!(!signal.is_signal_active(now, Duration::from_millis(300)));
    }

    #[test]
    fn test_sample_updates_position() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let t0 = Instant::now();
        signal.on_sample(sample(10.0, 20.0, t0), t0);

        let p = signal.current_position().unwrap();
        assert_eq!((p.x, p.y), (10.0, 20.0));
        assert_eq!(signal.state(t0), SignalState::Active);
        assert_eq!(signal.samples_seen(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let t0 = Instant::now();
        signal.on_sample(sample(0.0, 0.0, t0), t0);

        let threshold = Duration::from_millis(300);
        assert!(signal.is_signal_active(t0 + threshold, threshold));
        assert!(!signal.is_signal_active(t0 + Duration::from_millis(301), threshold));
    }

    #[test]
    fn test_blink_reported_once_per_lost_period() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let t0 = Instant::now();
        signal.on_sample(sample(0.0, 0.0, t0), t0);

        assert!(signal.poll(t0 + Duration::from_millis(100)).is_none());
        let blink = signal.poll(t0 + Duration::from_millis(400)).unwrap();
        assert_eq!(blink.last_seen, t0);

        // Still lost: no repeat
        assert!(signal.poll(t0 + Duration::from_millis(500)).is_none());
        assert!(signal.poll(t0 + Duration::from_millis(900)).is_none());

        // Signal returns, then is lost again: a new blink
        let t1 = t0 + Duration::from_millis(1000);
        signal.on_sample(sample(0.0, 0.0, t1), t1);
        assert!(signal.poll(t1 + Duration::from_millis(50)).is_none());
        assert!(signal.poll(t1 + Duration::from_millis(350)).is_some());
    }

    #[test]
    fn test_no_blink_before_first_sample() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let now = Instant::now();
        assert!(signal.poll(now + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_no_signal_samples_do_not_refresh() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let t0 = Instant::now();
        signal.on_sample(sample(5.0, 5.0, t0), t0);

        let t1 = t0 + Duration::from_millis(200);
        signal.on_sample(GazeSample::no_signal(t1), t1);
        assert_eq!(signal.state(t0 + Duration::from_millis(350)), SignalState::Lost);
        // Position is kept through the loss
        assert_eq!(signal.current_position().unwrap().x, 5.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut signal = GazeSignal::new(SignalConfig::default());
        let t0 = Instant::now();
        signal.on_sample(sample(1.0, 1.0, t0), t0);
        signal.reset();
        assert!(signal.current_position().is_none());
        assert!(signal.poll(t0 + Duration::from_secs(1)).is_none());
    }
}
