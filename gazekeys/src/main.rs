//! gazekeys - gaze-controlled on-screen keyboard, headless runner.
//!
//! Drives a full session (engine start, calibration, typing) against the
//! simulated engine and prints the typed text.

use std::path::PathBuf;

use gazekeys::backend::{self, headless::HeadlessOptions};
use gazekeys::config::TrackerConfig;
use gazekeys::gaze::calibration::CalibrationPattern;
use gazekeys::input_source::SelectMode;

use anyhow::bail;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gazekeys", about = "Gaze-controlled on-screen keyboard")]
struct Cli {
    /// Phrase the simulated user types
    #[arg(long, default_value = "Hello")]
    text: String,

    /// Selection mode: dwell or blink
    #[arg(long, default_value = "dwell")]
    select: String,

    /// Viewport size (WxH)
    #[arg(long, default_value = "1280x800")]
    viewport: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration pattern: 9 or 5 points
    #[arg(long)]
    calibration_points: Option<String>,

    /// Selection tick interval (ms)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Dwell progress added per tick (percent)
    #[arg(long)]
    dwell_step: Option<u8>,

    /// Signal loss that counts as a blink (ms)
    #[arg(long)]
    blink_threshold_ms: Option<u64>,

    /// Exit after N seconds
    #[arg(long)]
    exit_after: Option<u64>,

    /// Fail the first engine start and recover through restart
    #[arg(long)]
    fail_start: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    fn tracker_config(&self) -> anyhow::Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load(path)?,
            None => TrackerConfig::default(),
        };
        if let Some(points) = &self.calibration_points {
            config.calibration.pattern = match CalibrationPattern::from_str(points) {
                Some(p) => p,
                None => bail!("unknown calibration pattern '{points}', use 9 or 5"),
            };
        }
        if let Some(ms) = self.tick_ms {
            config.selection.tick_interval_ms = ms;
        }
        if let Some(step) = self.dwell_step {
            config.selection.dwell_step = step;
        }
        if let Some(ms) = self.blink_threshold_ms {
            config.signal.blink_threshold_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gazekeys {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazekeys=info".into()),
        )
        .init();

    info!("gazekeys v{} starting", env!("CARGO_PKG_VERSION"));

    let Some(mode) = SelectMode::from_str(&cli.select) else {
        bail!("unknown selection mode '{}', use dwell or blink", cli.select);
    };
    let Some(viewport) = backend::parse_viewport(&cli.viewport) else {
        bail!("invalid viewport '{}', expected WxH", cli.viewport);
    };
    let config = cli.tracker_config()?;
    info!("{}", config.dwell_hint());

    let options = HeadlessOptions {
        viewport,
        text: cli.text.clone(),
        mode,
        fail_start: cli.fail_start,
        exit_after: cli.exit_after,
        ..HeadlessOptions::default()
    };

    let outcome = backend::headless::run(config, options)?;
    println!("{}", outcome.text);
    Ok(())
}
