//! Command-line argument parsing.

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

use crate::error::ConfigError;
use crate::params::{GeneratorConfig, RecordingConfig};
use crate::vj::VisualMode;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Pulsedeck")]
#[command(about = "Procedural techno generator with an audio-reactive visualizer", long_about = None)]
pub struct Args {
    /// TOML file overriding the default generator parameters
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Tempo override (BPM)
    #[arg(long, value_name = "BPM")]
    pub tempo: Option<f64>,

    /// Seed for the pattern and noise generators (random if omitted)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Initial scene
    #[arg(long, value_enum, default_value_t = VisualMode::Studio)]
    pub mode: VisualMode,

    /// Start playback as soon as the window opens
    #[arg(long)]
    pub autoplay: bool,

    /// Record frames and audio for the given duration, then exit
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, conflicts_with = "offline")]
    pub record: Option<f32>,

    /// Render audio headlessly for the given duration instead of opening a window
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, requires = "output")]
    pub offline: Option<f32>,

    /// WAV path for offline rendering
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Durations must be finite and positive
fn parse_seconds(value: &str) -> Result<f32, String> {
    let seconds: f32 = value.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(format!("duration must be finite and > 0, got {}", value))
    }
}

impl Args {
    /// Defaults, then the config file, then command-line overrides
    pub fn load_config(&self) -> Result<GeneratorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {}", path.display());
                GeneratorConfig::load(path)?
            }
            None => GeneratorConfig::default(),
        };

        if let Some(tempo) = self.tempo {
            config.scheduler.tempo_bpm = tempo;
        }
        config.validate()?;
        Ok(config)
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> std::io::Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };
        let config = RecordingConfig::new(duration);
        std::fs::create_dir_all(config.frames_dir())?;
        Ok(Some(config))
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["pulsedeck"]).unwrap();
        assert_eq!(args.mode, VisualMode::Studio);
        assert!(!args.autoplay);
        assert!(args.record.is_none());
        assert_eq!(args.load_config().unwrap().scheduler.tempo_bpm, 138.0);
    }

    #[test]
    fn test_tempo_override_is_validated() {
        let args = Args::try_parse_from(["pulsedeck", "--tempo", "128"]).unwrap();
        assert_eq!(args.load_config().unwrap().scheduler.tempo_bpm, 128.0);

        let args = Args::try_parse_from(["pulsedeck", "--tempo", "0"]).unwrap();
        assert!(matches!(args.load_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for tempo in ["inf", "NaN", "-inf"] {
            let args = Args::try_parse_from(["pulsedeck", "--tempo", tempo]).unwrap();
            assert!(
                matches!(args.load_config(), Err(ConfigError::Invalid(_))),
                "tempo {} accepted",
                tempo
            );
        }

        assert!(Args::try_parse_from(["pulsedeck", "--record", "inf"]).is_err());
        assert!(Args::try_parse_from([
            "pulsedeck", "--offline", "NaN", "--output", "x.wav"
        ])
        .is_err());
        assert!(Args::try_parse_from(["pulsedeck", "--record", "0"]).is_err());
    }

    #[test]
    fn test_mode_flag() {
        let args = Args::try_parse_from(["pulsedeck", "--mode", "tunnel"]).unwrap();
        assert_eq!(args.mode, VisualMode::Tunnel);
        assert!(Args::try_parse_from(["pulsedeck", "--mode", "disco"]).is_err());
    }

    #[test]
    fn test_offline_requires_output() {
        assert!(Args::try_parse_from(["pulsedeck", "--offline", "4"]).is_err());
        let args =
            Args::try_parse_from(["pulsedeck", "--offline", "4", "--output", "out.wav"]).unwrap();
        assert_eq!(args.offline, Some(4.0));
    }

    #[test]
    fn test_record_conflicts_with_offline() {
        let result = Args::try_parse_from([
            "pulsedeck", "--record", "2", "--offline", "2", "--output", "x.wav",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let args = Args::try_parse_from(["pulsedeck", "--seed", "7"]).unwrap();
        let a: u64 = args.rng().gen();
        let b: u64 = args.rng().gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_file_then_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.toml");
        std::fs::write(&path, "[scheduler]\ntempo_bpm = 140.0\n[pattern]\nbass_probability = 0.2\n")
            .unwrap();

        let args = Args::try_parse_from([
            "pulsedeck",
            "--config",
            path.to_str().unwrap(),
            "--tempo",
            "150",
        ])
        .unwrap();
        let config = args.load_config().unwrap();
        assert_eq!(config.scheduler.tempo_bpm, 150.0);
        assert_eq!(config.pattern.bass_probability, 0.2);
    }
}
