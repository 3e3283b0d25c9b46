//! Audio engine and analysis configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Audio engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate used by the offline host (Hz).
    /// Device hosts use the device's native rate instead.
    pub sample_rate_hz: u32,

    /// Master bus gain applied before the analyser (linear)
    /// default: 0.4
    pub master_gain: f32,

    /// Hard clip applied to device output (linear, ±)
    pub output_limit: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            master_gain: 0.4,
            output_limit: 0.8,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample rate must be > 0".to_string()));
        }
        if !(self.master_gain >= 0.0 && self.master_gain.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "master gain must be finite and >= 0, got {}",
                self.master_gain
            )));
        }
        if !(self.output_limit > 0.0 && self.output_limit.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "output limit must be finite and > 0, got {}",
                self.output_limit
            )));
        }
        Ok(())
    }
}

/// Spectrum analyser configuration (byte-valued frequency snapshots)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Transform window size in samples (power of 2).
    /// Produces `fft_size / 2` frequency bins.
    /// default: 256 (= 128 bins)
    pub fft_size: usize,

    /// Temporal smoothing between successive snapshots (0 = none, 1 = frozen)
    /// default: 0.8
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (dBFS)
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ConfigError::Invalid(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "smoothing must be in [0, 1], got {}",
                self.smoothing
            )));
        }
        if !(self.min_db.is_finite() && self.max_db.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "dB range must be finite, got {}..{}",
                self.min_db, self.max_db
            )));
        }
        if self.min_db >= self.max_db {
            return Err(ConfigError::Invalid(format!(
                "min_db ({}) must be below max_db ({})",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }
}

/// Audio constants
pub mod audio_constants {
    /// Frames rendered per quantum by the offline host
    /// (= 2.9ms @ 44.1kHz)
    pub const RENDER_QUANTUM: usize = 128;

    /// Exponential ramps cannot reach zero; envelopes settle here instead
    pub const ENVELOPE_FLOOR: f32 = 0.01;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyser_bins() {
        let config = AnalyserConfig::default();
        assert_eq!(config.bin_count(), 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_analyser_rejects_bad_fft_size() {
        let mut config = AnalyserConfig::default();
        config.fft_size = 100;
        assert!(config.validate().is_err());

        config.fft_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analyser_rejects_inverted_db_range() {
        let config = AnalyserConfig {
            min_db: -20.0,
            max_db: -30.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_rejects_zero_sample_rate() {
        let config = EngineConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_engine_rejects_infinite_gain() {
        let config = EngineConfig {
            master_gain: f32::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            output_limit: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
