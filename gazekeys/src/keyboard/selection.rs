//! Dwell/blink key selection.
//!
//! Driven by a periodic `tick`. Each tick hit-tests the current gaze
//! position. Looking at the same key accumulates dwell progress in fixed
//! steps, and a full bar commits the key. A blink commits the focused key
//! at once, subject to a global debounce. The engine is inert while the
//! keyboard is hidden.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use super::layout::{HitTest, Key};
use crate::gaze::signal::GazeSignal;

/// Dwell progress at which a key commits.
pub const DWELL_COMPLETE: u8 = 100;

// ── Config ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Polling cadence of `tick` (ms).
    pub tick_interval_ms: u64,
    /// Progress added per tick while the same key stays focused (percent).
    pub dwell_step: u8,
    /// Minimum time between a commit and a blink-triggered commit (ms).
    pub blink_debounce_ms: u64,
}

impl SelectionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn blink_debounce(&self) -> Duration {
        Duration::from_millis(self.blink_debounce_ms)
    }

    /// Ticks of steady gaze needed to fill the bar once a key is focused.
    pub fn ticks_to_commit(&self) -> u32 {
        let step = u32::from(self.dwell_step.max(1));
        u32::from(DWELL_COMPLETE).div_ceil(step)
    }

    /// Gaze time needed for a dwell commit after the key is focused.
    pub fn dwell_duration(&self) -> Duration {
        self.tick_interval() * self.ticks_to_commit()
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            dwell_step: 5,
            blink_debounce_ms: 500,
        }
    }
}

// ── Events ──────────────────────────────────────────────────

/// What caused a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    Dwell,
    Blink,
}

impl CommitTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dwell => "dwell",
            Self::Blink => "blink",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCommitted {
    pub key: Key,
    pub trigger: CommitTrigger,
    pub at: Instant,
}

/// Transitions reported by `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Gaze moved onto a key; progress restarted at 0.
    Focused { key: Key },
    /// Gaze left the keyboard (or the signal has no position).
    FocusCleared { previous: Key },
    Committed(KeyCommitted),
}

// ── State ───────────────────────────────────────────────────

pub struct SelectionEngine {
    pub config: SelectionConfig,
    /// False while the keyboard is hidden; `tick`/`on_blink` do nothing.
    active: bool,
    active_key: Option<Key>,
    /// Always in `0..=DWELL_COMPLETE`.
    dwell_progress: u8,
    last_commit_at: Option<Instant>,
    commits: u64,
}

impl SelectionEngine {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            active: false,
            active_key: None,
            dwell_progress: 0,
            last_commit_at: None,
            commits: 0,
        }
    }

    /// Start consuming ticks (keyboard shown).
    pub fn activate(&mut self) {
        if !self.active {
            self.active = true;
            info!("Key selection active");
        }
    }

    /// Stop consuming ticks and drop transient dwell state (keyboard hidden).
    pub fn deactivate(&mut self) {
        self.clear_focus();
        if self.active {
            self.active = false;
            info!("Key selection inert");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance one polling period.
    pub fn tick(
        &mut self,
        now: Instant,
        signal: &GazeSignal,
        hit_test: &dyn HitTest,
    ) -> Option<SelectionEvent> {
        if !self.active {
            return None;
        }

        let hit = signal
            .current_position()
            .and_then(|p| hit_test.hit_test(p.x, p.y));

        let key = match (hit, self.active_key) {
            (Some(hit), Some(current)) if hit == current => current,
            (Some(hit), _) => {
                self.active_key = Some(hit);
                self.dwell_progress = 0;
                debug!(key = %hit, "Key focused");
                return Some(SelectionEvent::Focused { key: hit });
            }
            (None, Some(previous)) => {
                self.clear_focus();
                return Some(SelectionEvent::FocusCleared { previous });
            }
            (None, None) => return None,
        };

        self.dwell_progress = self
            .dwell_progress
            .saturating_add(self.config.dwell_step)
            .min(DWELL_COMPLETE);

        if self.dwell_progress >= DWELL_COMPLETE {
            return Some(SelectionEvent::Committed(self.commit(key, CommitTrigger::Dwell, now)));
        }
        None
    }

    /// Handle a blink: commit the focused key immediately unless a commit
    /// happened within the debounce window.
    pub fn on_blink(&mut self, now: Instant) -> Option<KeyCommitted> {
        if !self.active {
            return None;
        }
        let key = self.active_key?;
        if let Some(last) = self.last_commit_at {
            if now.saturating_duration_since(last) < self.config.blink_debounce() {
                debug!(key = %key, "Blink ignored (debounce)");
                return None;
            }
        }
        Some(self.commit(key, CommitTrigger::Blink, now))
    }

    fn commit(&mut self, key: Key, trigger: CommitTrigger, now: Instant) -> KeyCommitted {
        self.dwell_progress = 0;
        self.last_commit_at = Some(now);
        self.commits += 1;
        debug!(key = %key, trigger = trigger.as_str(), "Key committed");
        KeyCommitted { key, trigger, at: now }
    }

    fn clear_focus(&mut self) {
        self.active_key = None;
        self.dwell_progress = 0;
    }

    pub fn active_key(&self) -> Option<Key> {
        self.active_key
    }

    pub fn dwell_progress(&self) -> u8 {
        self.dwell_progress
    }

    /// Progress bar width for `key`: the dwell progress if it is focused,
    /// otherwise 0.
    pub fn progress_for(&self, key: Key) -> u8 {
        if self.active_key == Some(key) {
            self.dwell_progress
        } else {
            0
        }
    }

    pub fn last_commit_at(&self) -> Option<Instant> {
        self.last_commit_at
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::engine::{GazeSample, ScreenPoint};
    use crate::gaze::signal::SignalConfig;

    const TICK: Duration = Duration::from_millis(100);

    /// Hit test mapping x < 100 to 'a', 100..200 to 'b', anything else to none.
    fn strip(x: f64, _y: f64) -> Option<Key> {
        if x < 100.0 {
            Some(Key::Char('a'))
        } else if x < 200.0 {
            Some(Key::Char('b'))
        } else {
            None
        }
    }

    struct Rig {
        engine: SelectionEngine,
        signal: GazeSignal,
        now: Instant,
    }

    impl Rig {
        fn new() -> Self {
            let mut engine = SelectionEngine::new(SelectionConfig::default());
            engine.activate();
            Self {
                engine,
                signal: GazeSignal::new(SignalConfig::default()),
                now: Instant::now(),
            }
        }

        fn look(&mut self, x: f64) {
            self.signal
                .on_sample(GazeSample::at(ScreenPoint::new(x, 0.0), self.now), self.now);
        }

        fn tick(&mut self) -> Option<SelectionEvent> {
            self.now += TICK;
            self.engine.tick(self.now, &self.signal, &strip)
        }
    }

    fn is_commit(e: &Option<SelectionEvent>) -> bool {
        matches!(e, Some(SelectionEvent::Committed(_)))
    }

    #[test]
    fn test_dwell_commits_after_twenty_steady_ticks() {
        let mut rig = Rig::new();
        rig.look(50.0);
        assert_eq!(rig.tick(), Some(SelectionEvent::Focused { key: Key::Char('a') }));

        for i in 1..20 {
            assert!(!is_commit(&rig.tick()), "early commit at tick {}", i);
            assert_eq!(rig.engine.dwell_progress(), (i * 5) as u8);
        }
        match rig.tick() {
            Some(SelectionEvent::Committed(c)) => {
                assert_eq!(c.key, Key::Char('a'));
                assert_eq!(c.trigger, CommitTrigger::Dwell);
            }
            other => panic!("expected dwell commit, got {:?}", other),
        }
        assert_eq!(rig.engine.dwell_progress(), 0);
        assert_eq!(rig.engine.active_key(), Some(Key::Char('a')));
        assert_eq!(rig.engine.commit_count(), 1);
    }

    #[test]
    fn test_continued_dwell_recommits() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        let commits = (0..40).filter(|_| is_commit(&rig.tick())).count();
        assert_eq!(commits, 2);
    }

    #[test]
    fn test_key_change_resets_progress() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        for _ in 0..15 {
            rig.tick();
        }
        assert_eq!(rig.engine.dwell_progress(), 75);

        rig.look(150.0);
        assert_eq!(rig.tick(), Some(SelectionEvent::Focused { key: Key::Char('b') }));
        assert_eq!(rig.engine.dwell_progress(), 0);
        assert_eq!(rig.engine.progress_for(Key::Char('a')), 0);
    }

    #[test]
    fn test_miss_clears_focus() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        rig.tick();
        rig.look(500.0);
        assert_eq!(
            rig.tick(),
            Some(SelectionEvent::FocusCleared { previous: Key::Char('a') })
        );
        assert_eq!(rig.engine.active_key(), None);
        assert_eq!(rig.engine.dwell_progress(), 0);
        assert_eq!(rig.tick(), None);
    }

    #[test]
    fn test_no_position_is_idempotent() {
        let mut rig = Rig::new();
        for _ in 0..50 {
            assert_eq!(rig.tick(), None);
            assert_eq!(rig.engine.active_key(), None);
        }
        assert_eq!(rig.engine.commit_count(), 0);
    }

    #[test]
    fn test_blink_commits_immediately_and_resets() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        for _ in 0..10 {
            rig.tick();
        }
        assert_eq!(rig.engine.dwell_progress(), 50);

        let c = rig.engine.on_blink(rig.now).unwrap();
        assert_eq!(c.key, Key::Char('a'));
        assert_eq!(c.trigger, CommitTrigger::Blink);
        assert_eq!(rig.engine.dwell_progress(), 0);
    }

    #[test]
    fn test_blink_debounce() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();

        assert!(rig.engine.on_blink(rig.now).is_some());
        assert!(rig.engine.on_blink(rig.now + Duration::from_millis(499)).is_none());
        assert!(rig.engine.on_blink(rig.now + Duration::from_millis(500)).is_some());
    }

    #[test]
    fn test_blink_debounce_counts_dwell_commits() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        let mut committed_at = None;
        for _ in 0..20 {
            if let Some(SelectionEvent::Committed(c)) = rig.tick() {
                committed_at = Some(c.at);
            }
        }
        let at = committed_at.unwrap();
        assert!(rig.engine.on_blink(at + Duration::from_millis(200)).is_none());
        assert!(rig.engine.on_blink(at + Duration::from_millis(600)).is_some());
    }

    #[test]
    fn test_blink_without_focus_does_nothing() {
        let mut rig = Rig::new();
        assert!(rig.engine.on_blink(rig.now).is_none());
        assert!(rig.engine.last_commit_at().is_none());
    }

    #[test]
    fn test_inert_when_deactivated() {
        let mut rig = Rig::new();
        rig.look(50.0);
        rig.tick();
        rig.tick();
        assert_eq!(rig.engine.dwell_progress(), 5);

        rig.engine.deactivate();
        assert_eq!(rig.engine.active_key(), None);
        assert_eq!(rig.engine.dwell_progress(), 0);
        for _ in 0..30 {
            assert_eq!(rig.tick(), None);
        }
        assert!(rig.engine.on_blink(rig.now).is_none());
        assert_eq!(rig.engine.commit_count(), 0);

        rig.engine.activate();
        assert_eq!(rig.tick(), Some(SelectionEvent::Focused { key: Key::Char('a') }));
    }

    #[test]
    fn test_dwell_duration_from_config() {
        let config = SelectionConfig::default();
        assert_eq!(config.ticks_to_commit(), 20);
        assert_eq!(config.dwell_duration(), Duration::from_secs(2));

        let coarse = SelectionConfig {
            dwell_step: 30,
            ..SelectionConfig::default()
        };
        assert_eq!(coarse.ticks_to_commit(), 4);
    }

    #[test]
    fn test_progress_never_exceeds_complete() {
        let mut engine = SelectionEngine::new(SelectionConfig {
            dwell_step: 30,
            ..SelectionConfig::default()
        });
        engine.activate();
        let mut signal = GazeSignal::new(SignalConfig::default());
        let mut now = Instant::now();
        signal.on_sample(GazeSample::at(ScreenPoint::new(10.0, 0.0), now), now);
        for _ in 0..12 {
            now += TICK;
            engine.tick(now, &signal, &strip);
            assert!(engine.dwell_progress() <= DWELL_COMPLETE);
        }
    }
}
