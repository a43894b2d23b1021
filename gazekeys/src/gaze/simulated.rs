//! Simulated gaze engine for development and testing without a camera.
//!
//! Replays an `InputProvider` script: fixations become a steady stream of
//! estimates, blinks become "no estimate" frames. Failure injection lets
//! tests and the demo binary exercise the engine-unavailable paths.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::engine::{
    EngineOptions, GazeEngine, GazeListener, GazeSample, SampleKind, ScreenPoint,
};
use crate::error::{Result, TrackerError};
use crate::input_source::{InputEvent, InputProvider, ScriptedInputProvider};

/// Default estimate rate of the simulated camera.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(33);

/// A calibration sample the engine was asked to record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedSample {
    pub point: ScreenPoint,
    pub kind: SampleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Stopped,
    Running,
    Paused,
}

pub struct SimulatedEngine {
    pub options: EngineOptions,
    /// Emitted whenever no script step is active.
    pub idle_point: Option<ScreenPoint>,
    pub sample_interval: Duration,
    phase: EnginePhase,
    listener: Option<GazeListener>,
    provider: Box<dyn InputProvider>,
    current: Option<(InputEvent, Instant)>,
    available: bool,
    /// Number of upcoming `begin` calls that fail.
    failing_begins: u32,
    recorded: Vec<RecordedSample>,
    emitted: u64,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
            idle_point: None,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            phase: EnginePhase::Stopped,
            listener: None,
            provider: Box::new(ScriptedInputProvider::default()),
            current: None,
            available: true,
            failing_begins: 0,
            recorded: Vec::new(),
            emitted: 0,
        }
    }

    /// Replace the remaining script.
    pub fn load_script(&mut self, provider: Box<dyn InputProvider>) {
        self.provider = provider;
        self.current = None;
    }

    pub fn load_events(&mut self, events: Vec<InputEvent>) {
        info!("Simulated engine: loaded {} scripted step(s)", events.len());
        self.load_script(Box::new(ScriptedInputProvider::new(events)));
    }

    /// When false, every fallible call fails with `EngineUnavailable`.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Make the next `n` calls to `begin` fail.
    pub fn fail_next_begins(&mut self, n: u32) {
        self.failing_begins = n;
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn recorded_samples(&self) -> &[RecordedSample] {
        &self.recorded
    }

    pub fn samples_emitted(&self) -> u64 {
        self.emitted
    }

    /// True once the script is exhausted.
    pub fn script_finished(&self) -> bool {
        self.current.is_none() && !self.provider.has_events()
    }

    /// Produce the estimate for `now` and hand it to the listener.
    /// Returns whether a sample was emitted.
    pub fn pump(&mut self, now: Instant) -> bool {
        if self.phase != EnginePhase::Running {
            return false;
        }
        self.advance_script(now);

        let sample = match &self.current {
            Some((InputEvent::Fixate { x, y, .. }, _)) => {
                GazeSample::at(ScreenPoint::new(*x, *y), now)
            }
            Some((InputEvent::Blink { .. }, _)) => GazeSample::no_signal(now),
            None => match self.idle_point {
                Some(p) => GazeSample::at(p, now),
                None => return false,
            },
        };

        let Some(listener) = self.listener.as_mut() else {
            return false;
        };
        listener(sample);
        self.emitted += 1;
        true
    }

    fn advance_script(&mut self, now: Instant) {
        loop {
            let expired = match &self.current {
                Some((event, started)) => {
                    now.saturating_duration_since(*started) >= event.duration()
                }
                None => true,
            };
            if !expired {
                return;
            }
            match self.provider.next_event() {
                Some(event) => {
                    debug!("Simulated engine step: {:?}", event);
                    self.current = Some((event, now));
                }
                None => {
                    self.current = None;
                    return;
                }
            }
        }
    }

    fn ensure_available(&self, op: &str) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(TrackerError::engine(format!("{op}: camera not available")))
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GazeEngine for SimulatedEngine {
    fn configure(&mut self, options: &EngineOptions) {
        self.options = options.clone();
        debug!(
            regression = options.regression.as_str(),
            preview = options.show_video_preview,
            "Simulated engine configured"
        );
    }

    fn set_listener(&mut self, listener: GazeListener) {
        self.listener = Some(listener);
    }

    fn begin(&mut self) -> Result<()> {
        if self.failing_begins > 0 {
            self.failing_begins -= 1;
            return Err(TrackerError::engine("begin: camera permission denied"));
        }
        self.ensure_available("begin")?;
        self.phase = EnginePhase::Running;
        info!("Simulated engine started");
        Ok(())
    }

    fn pause(&mut self) {
        if self.phase == EnginePhase::Running {
            self.phase = EnginePhase::Paused;
        }
    }

    fn resume(&mut self) -> Result<()> {
        self.ensure_available("resume")?;
        self.phase = EnginePhase::Running;
        Ok(())
    }

    fn end(&mut self) {
        self.phase = EnginePhase::Stopped;
        info!("Simulated engine stopped ({} samples emitted)", self.emitted);
    }

    fn clear_saved_data(&mut self) {
        self.recorded.clear();
    }

    fn record_screen_position(&mut self, x: f64, y: f64, kind: SampleKind) -> Result<()> {
        self.ensure_available("record")?;
        self.recorded.push(RecordedSample {
            point: ScreenPoint::new(x, y),
            kind,
        });
        Ok(())
    }
}
