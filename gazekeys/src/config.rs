//! Tracker configuration.
//!
//! Every field has a default, so an empty or partial
//! TOML file is valid:
//!
//! ```toml
//! [selection]
//! tick_interval_ms = 100
//! dwell_step = 5
//!
//! [calibration]
//! pattern = "five-point"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, TrackerError};
use crate::gaze::calibration::CalibrationConfig;
use crate::gaze::engine::EngineOptions;
use crate::gaze::signal::SignalConfig;
use crate::keyboard::selection::{SelectionConfig, DWELL_COMPLETE};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub engine: EngineOptions,
    pub signal: SignalConfig,
    pub selection: SelectionConfig,
    pub calibration: CalibrationConfig,
}

impl TrackerConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selection.tick_interval_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "selection.tick_interval_ms must be positive".into(),
            ));
        }
        if self.selection.dwell_step == 0 || self.selection.dwell_step > DWELL_COMPLETE {
            return Err(TrackerError::InvalidConfig(format!(
                "selection.dwell_step must be in 1..={}, got {}",
                DWELL_COMPLETE, self.selection.dwell_step
            )));
        }
        if self.signal.blink_threshold_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "signal.blink_threshold_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Instruction copy shown above the keyboard, derived from the
    /// configured dwell rather than a fixed number.
    pub fn dwell_hint(&self) -> String {
        let secs = self.selection.dwell_duration().as_secs_f64();
        format!("Dwell time: {:.1} seconds (blinking is faster)", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::calibration::CalibrationPattern;
    use crate::gaze::engine::RegressionModel;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.signal.blink_threshold_ms, 300);
        assert_eq!(config.selection.tick_interval_ms, 100);
        assert_eq!(config.selection.dwell_step, 5);
        assert_eq!(config.selection.blink_debounce_ms, 500);
        assert_eq!(config.calibration.pattern, CalibrationPattern::NinePoint);
        assert_eq!(config.calibration.prompt_delay_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(TrackerConfig::from_toml("").unwrap(), TrackerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = TrackerConfig::from_toml(
            r#"
            [selection]
            dwell_step = 10

            [calibration]
            pattern = "five-point"

            [engine]
            regression = "weighted-ridge"
            "#,
        )
        .unwrap();
        assert_eq!(config.selection.dwell_step, 10);
        assert_eq!(config.selection.tick_interval_ms, 100);
        assert_eq!(config.calibration.pattern, CalibrationPattern::FivePoint);
        assert_eq!(config.engine.regression, RegressionModel::WeightedRidge);
        assert!(!config.engine.save_data_across_sessions);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(TrackerConfig::from_toml("[selection]\ndwell_step = 0").is_err());
        assert!(TrackerConfig::from_toml("[selection]\ndwell_step = 101").is_err());
        assert!(TrackerConfig::from_toml("[selection]\ntick_interval_ms = 0").is_err());
        assert!(TrackerConfig::from_toml("[signal]\nblink_threshold_ms = 0").is_err());
        assert!(TrackerConfig::from_toml("[calibration]\npattern = \"seven\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[signal]\nblink_threshold_ms = 250").unwrap();
        let config = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(config.signal.blink_threshold_ms, 250);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrackerConfig::load(Path::new("/nonexistent/gazekeys.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_dwell_hint_reflects_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.dwell_hint(), "Dwell time: 2.0 seconds (blinking is faster)");
    }
}
