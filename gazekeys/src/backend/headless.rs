//! Headless backend: runs a full scripted session on a single-threaded
//! calloop event loop.
//!
//! Sources registered on the loop:
//! - a channel carrying engine estimates into the gaze signal,
//! - the simulated camera timer that pumps the engine,
//! - one-shot timers for the calibration prompt and restart,
//! - the simulated user's calibration clicks,
//! - the selection tick, registered while the keyboard is visible and
//!   removed the moment it is hidden,
//! - SIGTERM/SIGINT and an optional exit timer.

use std::time::Duration;

use anyhow::anyhow;
use calloop::{
    channel::{self, Channel},
    signals::{Signal, Signals},
    timer::{TimeoutAction, Timer},
    EventLoop, LoopHandle, RegistrationToken,
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::gaze::calibration::CalibrationProgress;
use crate::gaze::engine::{GazeSample, ScreenPoint};
use crate::gaze::simulated::SimulatedEngine;
use crate::input_source::{typing_script, SelectMode, TypingTiming};
use crate::session::{Commit, TrackerPhase, TrackerSession, Viewport};

/// Options for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub viewport: Viewport,
    /// Phrase the simulated user types.
    pub text: String,
    pub mode: SelectMode,
    /// Simulated camera frame interval (ms).
    pub sample_interval_ms: u64,
    /// Time the simulated user spends on each calibration point (ms).
    pub confirm_interval_ms: u64,
    /// Fail the first engine start to exercise the restart path.
    pub fail_start: bool,
    /// Delay before the simulated user presses "Restart Tracking" (ms).
    pub restart_delay_ms: u64,
    /// Hard stop after N seconds.
    pub exit_after: Option<u64>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
            },
            text: "Hello".to_string(),
            mode: SelectMode::Dwell,
            sample_interval_ms: 33,
            confirm_interval_ms: 600,
            fail_start: false,
            restart_delay_ms: 1000,
            exit_after: None,
        }
    }
}

/// What the run produced.
#[derive(Debug, Clone)]
pub struct HeadlessOutcome {
    pub text: String,
    pub commits: Vec<Commit>,
    pub final_phase: TrackerPhase,
    /// Wall time from engine start to loop exit.
    pub elapsed: Duration,
}

struct HeadlessState {
    session: TrackerSession<SimulatedEngine>,
    handle: LoopHandle<'static, HeadlessState>,
    clock: SystemClock,
    options: HeadlessOptions,
    tick_token: Option<RegistrationToken>,
    typing_started: bool,
    commits: Vec<Commit>,
    running: bool,
}

impl HeadlessState {
    /// Start the calibration walk-through and the simulated clicks.
    fn begin_calibration(&mut self) -> anyhow::Result<()> {
        self.session.start_calibration()?;
        self.follow_calibration_point();

        let interval = Duration::from_millis(self.options.confirm_interval_ms);
        self.handle
            .insert_source(Timer::from_duration(interval), move |_, _, state: &mut HeadlessState| {
                match state.session.confirm_calibration_point() {
                    Ok(CalibrationProgress::Advanced { next, remaining }) => {
                        debug!(next, remaining, "Calibration point confirmed");
                        state.follow_calibration_point();
                        TimeoutAction::ToDuration(interval)
                    }
                    Ok(CalibrationProgress::Finished(_)) => {
                        if let Err(e) = state.start_typing() {
                            warn!("Could not start typing: {}", e);
                            state.running = false;
                        }
                        TimeoutAction::Drop
                    }
                    Err(e) => {
                        warn!("Calibration click failed, retrying: {}", e);
                        TimeoutAction::ToDuration(interval)
                    }
                }
            })
            .map_err(|e| anyhow!("failed to register calibration timer: {}", e.error))?;
        Ok(())
    }

    /// The simulated user looks at the dot they are about to click.
    fn follow_calibration_point(&mut self) {
        let target = self
            .session
            .calibration()
            .current_point()
            .map(|p| p.screen());
        self.session.engine_mut().idle_point = target;
    }

    fn start_typing(&mut self) -> anyhow::Result<()> {
        self.show_keyboard()?;

        let config = &self.session.config;
        let timing = TypingTiming::new(&config.selection, &config.signal);
        let script = typing_script(
            &self.options.text,
            self.session.layout(),
            self.session.geometry(),
            self.options.mode,
            &timing,
        );
        let geometry = self.session.geometry();
        let resting = ScreenPoint::new(geometry.viewport_width / 2.0, geometry.panel_top / 2.0);

        let engine = self.session.engine_mut();
        engine.idle_point = Some(resting);
        engine.load_events(script);
        self.typing_started = true;
        info!(
            "Typing {:?} by {} selection",
            self.options.text,
            self.options.mode.as_str()
        );
        Ok(())
    }

    /// Show the keyboard and register the selection tick.
    fn show_keyboard(&mut self) -> anyhow::Result<()> {
        self.session.show_keyboard()?;
        if self.tick_token.is_some() {
            return Ok(());
        }
        let interval = self.session.config.selection.tick_interval();
        let token = self
            .handle
            .insert_source(Timer::from_duration(interval), move |_, _, state: &mut HeadlessState| {
                let now = state.clock.now();
                if let Some(commit) = state.session.tick(now) {
                    info!(
                        "Committed {} by {} -> {:?}",
                        commit.key,
                        commit.trigger.as_str(),
                        state.session.text()
                    );
                    state.commits.push(commit);
                }
                if state.session.keyboard_visible() {
                    TimeoutAction::ToDuration(interval)
                } else {
                    state.tick_token = None;
                    TimeoutAction::Drop
                }
            })
            .map_err(|e| anyhow!("failed to register tick timer: {}", e.error))?;
        self.tick_token = Some(token);
        Ok(())
    }

    /// Hide the keyboard and cancel the tick before it can fire again.
    fn hide_keyboard(&mut self) {
        self.session.hide_keyboard();
        if let Some(token) = self.tick_token.take() {
            self.handle.remove(token);
        }
    }

    /// One-shot timer after which `f` runs.
    fn after(
        &self,
        delay: Duration,
        what: &'static str,
        mut f: impl FnMut(&mut HeadlessState) + 'static,
    ) -> anyhow::Result<()> {
        self.handle
            .insert_source(Timer::from_duration(delay), move |_, _, state: &mut HeadlessState| {
                f(state);
                TimeoutAction::Drop
            })
            .map_err(|e| anyhow!("failed to register {} timer: {}", what, e.error))?;
        Ok(())
    }

    fn finish(&mut self, reason: &str) {
        info!("Headless run finished: {}", reason);
        self.hide_keyboard();
        self.running = false;
    }
}

/// Prompt, then calibrate, once the engine is up.
fn schedule_prompt(state: &HeadlessState) -> anyhow::Result<()> {
    let delay = Duration::from_millis(state.session.config.calibration.prompt_delay_ms);
    state.after(delay, "calibration prompt", |state| {
        if state.session.show_calibration_prompt() {
            if let Err(e) = state.begin_calibration() {
                warn!("Could not begin calibration: {}", e);
                state.running = false;
            }
        }
    })
}

/// Simulated user presses "Restart Tracking" on the error dialog.
fn schedule_restart(state: &HeadlessState) -> anyhow::Result<()> {
    let delay = Duration::from_millis(state.options.restart_delay_ms);
    state.after(delay, "restart", |state| {
        match state.session.restart_tracking() {
            Ok(()) => {
                if let Err(e) = state.begin_calibration() {
                    warn!("Could not begin calibration: {}", e);
                    state.running = false;
                }
            }
            Err(e) => {
                warn!("Restart failed: {}", e);
                state.running = false;
            }
        }
    })
}

/// Run a scripted session to completion.
pub fn run(config: TrackerConfig, options: HeadlessOptions) -> anyhow::Result<HeadlessOutcome> {
    config.validate()?;

    let mut event_loop: EventLoop<'static, HeadlessState> = EventLoop::try_new()?;
    let handle = event_loop.handle();

    let mut engine = SimulatedEngine::new();
    engine.sample_interval = Duration::from_millis(options.sample_interval_ms);
    engine.idle_point = Some(ScreenPoint::new(
        options.viewport.width / 2.0,
        options.viewport.height / 2.0,
    ));
    if options.fail_start {
        engine.fail_next_begins(1);
    }
    let sample_interval = engine.sample_interval;

    let mut state = HeadlessState {
        session: TrackerSession::new(engine, config, options.viewport),
        handle: handle.clone(),
        clock: SystemClock,
        options,
        tick_token: None,
        typing_started: false,
        commits: Vec::new(),
        running: true,
    };

    // Engine estimates arrive through a channel, in emission order
    let (sender, samples): (channel::Sender<GazeSample>, Channel<GazeSample>) = channel::channel();
    handle
        .insert_source(samples, |event, _, state: &mut HeadlessState| {
            if let channel::Event::Msg(sample) = event {
                let now = state.clock.now();
                state.session.on_sample(sample, now);
            }
        })
        .map_err(|e| anyhow!("failed to register sample channel: {}", e.error))?;

    // Simulated camera
    let camera = Timer::from_duration(sample_interval);
    handle
        .insert_source(camera, move |_, _, state: &mut HeadlessState| {
            let now = state.clock.now();
            state.session.engine_mut().pump(now);
            if state.typing_started && state.session.engine().script_finished() {
                state.finish("script complete");
                return TimeoutAction::Drop;
            }
            TimeoutAction::ToDuration(sample_interval)
        })
        .map_err(|e| anyhow!("failed to register camera timer: {}", e.error))?;

    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])
        .map_err(|e| anyhow!("failed to create signal source: {}", e))?;
    handle
        .insert_source(signals, |event, _, state: &mut HeadlessState| {
            info!("Received signal {:?}, shutting down", event.signal());
            state.finish("signal");
        })
        .map_err(|e| anyhow!("failed to register signal handler: {}", e.error))?;

    if let Some(seconds) = state.options.exit_after {
        info!("Will exit after {} seconds", seconds);
        state.after(Duration::from_secs(seconds), "exit", |state| {
            state.finish("exit timer");
        })?;
    }

    let started = state.clock.now();
    let listener_sender = sender.clone();
    match state.session.start(Box::new(move |sample| {
        let _ = listener_sender.send(sample);
    })) {
        Ok(()) => schedule_prompt(&state)?,
        Err(e) => {
            warn!("Engine start failed ({}), restart scheduled", e);
            schedule_restart(&state)?;
        }
    }
    drop(sender);

    info!(
        "Headless session running ({:.0}x{:.0}, tick {}ms)",
        state.options.viewport.width,
        state.options.viewport.height,
        state.session.config.selection.tick_interval_ms
    );
    let poll = Duration::from_millis(50);
    while state.running {
        event_loop.dispatch(Some(poll), &mut state)?;
    }

    state.session.shutdown();
    let elapsed = state.clock.since(started);
    info!(
        "Headless session done in {:.1}s: {} commit(s), phase {}",
        elapsed.as_secs_f64(),
        state.commits.len(),
        state.session.phase()
    );
    Ok(HeadlessOutcome {
        text: state.session.text().to_string(),
        commits: state.commits,
        final_phase: state.session.phase().clone(),
        elapsed,
    })
}
