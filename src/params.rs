//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables live here with:
//! - Physical units (seconds, Hz, BPM, dB)
//! - Documented ranges and meanings
//! - Validation that rejects misconfiguration up front

mod audio;
mod render;
mod sequencer;

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig, EngineConfig};
pub use render::{RecordingConfig, RenderConfig};
pub use sequencer::{
    BassParams, HiHatParams, KickParams, PatternConfig, SchedulerConfig, VoiceParams,
};

/// Complete generator configuration, loadable from TOML.
///
/// Every section and field is optional in the file; missing values fall back
/// to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub engine: EngineConfig,
    pub analyser: AnalyserConfig,
    pub scheduler: SchedulerConfig,
    pub pattern: PatternConfig,
    pub voices: VoiceParams,
}

impl GeneratorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.analyser.validate()?;
        self.scheduler.validate()?;
        self.pattern.validate()?;
        self.voices.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml_str(
            r#"
            [scheduler]
            tempo_bpm = 128.0

            [pattern]
            bass_notes_hz = [41.2, 82.4]
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.tempo_bpm, 128.0);
        assert_eq!(config.scheduler.lookahead_ms, 25);
        assert_eq!(config.pattern.bass_notes_hz, vec![41.2, 82.4]);
        assert_eq!(config.pattern.bass_probability, 0.6);
        assert_eq!(config.analyser.fft_size, 256);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let result = GeneratorConfig::from_toml_str(
            r#"
            [analyser]
            fft_size = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let documents = [
            "[scheduler]\ntempo_bpm = inf\n",
            "[scheduler]\ntempo_bpm = nan\n",
            "[scheduler]\nschedule_ahead_s = inf\n",
            "[scheduler]\nstart_offset_s = inf\n",
            "[engine]\nmaster_gain = inf\n",
            "[analyser]\nmin_db = -inf\n",
            "[pattern]\nbass_notes_hz = [55.0, inf]\n",
            "[voices.kick]\npeak_gain = 0.0\n",
            "[voices.hihat]\npeak_gain = -0.3\n",
            "[voices.bass]\nduration_s = inf\n",
        ];
        for document in documents {
            let result = GeneratorConfig::from_toml_str(document);
            assert!(
                matches!(result, Err(ConfigError::Invalid(_))),
                "accepted {:?}",
                document
            );
        }
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = GeneratorConfig::from_toml_str("[scheduler\ntempo_bpm = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
