use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    ClassifierConfig, ExtrusionConfig, GestureConfig, NoteOverlayError, Result, SmoothingConfig,
    SmoothingMode, TrackerConfig,
};

/// Top-level configuration structure for the application.
///
/// Every section falls back to its defaults, so a config file only needs to
/// list what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub classifier: ClassifierConfig,
    pub smoothing: SmoothingConfig,
    pub extrusion: ExtrusionConfig,
    pub gestures: GestureConfig,
}

impl AppConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(?path, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be positive"));
        }
        if self.audio.block_size < 2 {
            return Err(invalid("audio.block_size must be at least 2"));
        }
        let tracker = &self.audio.tracker;
        if !(tracker.min_frequency >= 0.0 && tracker.min_frequency < tracker.max_frequency) {
            return Err(invalid(
                "audio.tracker.min_frequency must be non-negative and below max_frequency",
            ));
        }
        let reference = self.classifier.reference_a4_hz;
        if !(reference.is_finite() && reference > 0.0) {
            return Err(invalid("classifier.reference_a4_hz must be a positive frequency"));
        }
        if !(self.classifier.noise_floor >= 0.0) {
            return Err(invalid("classifier.noise_floor must be non-negative"));
        }
        if let SmoothingMode::TimeScaled { reference_rate_hz } = self.smoothing.mode {
            if !(reference_rate_hz.is_finite() && reference_rate_hz > 0.0) {
                return Err(invalid("smoothing.mode.reference_rate_hz must be positive"));
            }
        }
        let extrusion = &self.extrusion;
        if !(extrusion.min_depth >= 0.0 && extrusion.min_depth <= extrusion.max_depth) {
            return Err(invalid(
                "extrusion.min_depth must be non-negative and at most max_depth",
            ));
        }
        if !(extrusion.initial_depth >= extrusion.min_depth
            && extrusion.initial_depth <= extrusion.max_depth)
        {
            return Err(invalid(
                "extrusion.initial_depth must lie between min_depth and max_depth",
            ));
        }
        if !(extrusion.sensitivity.is_finite() && extrusion.sensitivity >= 0.0) {
            return Err(invalid("extrusion.sensitivity must be a non-negative number"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> NoteOverlayError {
    NoteOverlayError::InvalidConfig(message.to_string())
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub tracker: TrackerConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 4096,
            tracker: TrackerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SmoothingFactor;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.classifier.noise_floor, 0.05);
        assert_eq!(config.smoothing.factor.get(), 0.1);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_json_str(
            r#"{
                "classifier": { "reference_a4_hz": 442.0 },
                "smoothing": { "factor": 0.25, "mode": { "kind": "time_scaled", "reference_rate_hz": 60.0 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.classifier.reference_a4_hz, 442.0);
        assert_eq!(config.classifier.noise_floor, 0.05);
        assert_eq!(config.smoothing.factor, SmoothingFactor::new(0.25));
        assert_eq!(
            config.smoothing.mode,
            SmoothingMode::TimeScaled {
                reference_rate_hz: 60.0
            }
        );
        assert_eq!(config.audio.sample_rate, 48_000);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for json in [
            r#"{ "audio": { "sample_rate": 0 } }"#,
            r#"{ "audio": { "block_size": 1 } }"#,
            r#"{ "classifier": { "reference_a4_hz": -440.0 } }"#,
            r#"{ "classifier": { "noise_floor": -0.1 } }"#,
            r#"{ "smoothing": { "mode": { "kind": "time_scaled", "reference_rate_hz": 0.0 } } }"#,
            r#"{ "extrusion": { "min_depth": 1.0, "max_depth": 0.5 } }"#,
            r#"{ "extrusion": { "initial_depth": -1.0 } }"#,
            r#"{ "extrusion": { "initial_depth": 0.3 } }"#,
            r#"{ "extrusion": { "sensitivity": -2.0 } }"#,
        ] {
            let err = AppConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, NoteOverlayError::InvalidConfig(_)), "{json}");
        }
    }

    #[test]
    fn reports_malformed_json() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, NoteOverlayError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, NoteOverlayError::Io(_)));
    }
}
