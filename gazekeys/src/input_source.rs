//! Scripted gaze input.
//!
//! `InputEvent` describes what the user's eyes do over time (hold a point,
//! blink). Providers feed those events to the simulated engine, and
//! `typing_script` turns a phrase into the fixations and blinks that would
//! type it on the virtual keyboard.

use std::collections::VecDeque;
use std::time::Duration;

use crate::gaze::engine::ScreenPoint;
use crate::gaze::signal::SignalConfig;
use crate::keyboard::layout::{Key, KeyboardGeometry, KeyboardLayout};
use crate::keyboard::selection::SelectionConfig;

/// Extra ticks of fixation beyond the strict dwell time, to absorb timer
/// phase between the sample stream and the selection tick.
const DWELL_SLACK_TICKS: u32 = 3;

/// Glance away from the keyboard between keys.
const GLANCE_AWAY: Duration = Duration::from_millis(300);

/// One step of simulated eye behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Hold gaze at a screen point.
    Fixate { x: f64, y: f64, duration: Duration },
    /// Eyes closed: the engine produces no estimates.
    Blink { duration: Duration },
}

impl InputEvent {
    pub fn fixate(point: ScreenPoint, duration: Duration) -> Self {
        Self::Fixate {
            x: point.x,
            y: point.y,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Fixate { duration, .. } | Self::Blink { duration } => *duration,
        }
    }
}

/// Source of scripted input events.
pub trait InputProvider {
    fn next_event(&mut self) -> Option<InputEvent>;
    fn has_events(&self) -> bool;
}

/// Delivers events from a fixed queue.
#[derive(Debug, Default)]
pub struct ScriptedInputProvider {
    events: VecDeque<InputEvent>,
}

impl ScriptedInputProvider {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: VecDeque::from(events),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// Total scripted time left.
    pub fn remaining_duration(&self) -> Duration {
        self.events.iter().map(InputEvent::duration).sum()
    }
}

impl InputProvider for ScriptedInputProvider {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

// ── Typing scripts ──────────────────────────────────────────

/// How the simulated user selects each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Dwell,
    Blink,
}

impl SelectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dwell => "dwell",
            Self::Blink => "blink",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dwell" => Some(Self::Dwell),
            "blink" => Some(Self::Blink),
            _ => None,
        }
    }
}

/// Timing used to build a typing script.
#[derive(Debug, Clone)]
pub struct TypingTiming {
    /// Fixation long enough for one dwell commit.
    pub dwell_fixation: Duration,
    /// Fixation before blinking: focuses the key without completing a dwell.
    pub blink_fixation: Duration,
    /// Eyes-closed time; longer than the lost-signal threshold.
    pub blink_duration: Duration,
}

impl TypingTiming {
    pub fn new(selection: &SelectionConfig, signal: &SignalConfig) -> Self {
        let tick = selection.tick_interval();
        Self {
            dwell_fixation: tick * (selection.ticks_to_commit() + 1 + DWELL_SLACK_TICKS),
            blink_fixation: tick * 4,
            blink_duration: signal.blink_threshold() + tick * 2,
        }
    }
}

/// Build the gaze script that types `text` (then presses Hide).
///
/// Upper-case letters are typed as Shift followed by the letter. Characters
/// with no key are skipped. Between keys the gaze glances above the
/// keyboard so repeated letters are committed separately.
pub fn typing_script(
    text: &str,
    layout: &KeyboardLayout,
    geometry: &KeyboardGeometry,
    mode: SelectMode,
    timing: &TypingTiming,
) -> Vec<InputEvent> {
    let away = ScreenPoint::new(geometry.viewport_width / 2.0, geometry.panel_top / 2.0);

    let mut keys = Vec::new();
    for c in text.chars() {
        match layout.key_for_char(c) {
            Some((key, true)) => {
                keys.push(Key::Shift);
                keys.push(key);
            }
            Some((key, false)) => keys.push(key),
            None => tracing::warn!("No key for {:?}, skipping", c),
        }
    }
    keys.push(Key::Hide);

    let mut events = Vec::new();
    for key in keys {
        let Some(center) = geometry.center_of(key) else {
            continue;
        };
        match mode {
            SelectMode::Dwell => {
                events.push(InputEvent::fixate(center, timing.dwell_fixation));
            }
            SelectMode::Blink => {
                events.push(InputEvent::fixate(center, timing.blink_fixation));
                events.push(InputEvent::Blink {
                    duration: timing.blink_duration,
                });
            }
        }
        events.push(InputEvent::fixate(away, GLANCE_AWAY));
    }
    events
}
