//! Sequencer timing, pattern and voice parameters.

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

/// Fastest tempo the scheduler accepts (BPM)
pub const MAX_TEMPO_BPM: f64 = 1000.0;

/// Look-ahead scheduler timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tempo (beats per minute, quarter notes)
    /// default: 138
    pub tempo_bpm: f64,

    /// Wall-clock period between scheduler ticks (milliseconds)
    /// default: 25
    pub lookahead_ms: u64,

    /// Audio-clock horizon committed on each tick (seconds)
    /// default: 0.1
    pub schedule_ahead_s: f64,

    /// Worst host timer lateness the horizon must absorb (milliseconds)
    pub expected_jitter_ms: u64,

    /// Delay between start and the first step (seconds)
    pub start_offset_s: f64,

    /// Steps per pattern cycle (16 = one 4/4 bar of sixteenths)
    pub steps_per_pattern: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 138.0,
            lookahead_ms: 25,
            schedule_ahead_s: 0.1,
            expected_jitter_ms: 50,
            start_offset_s: 0.1,
            steps_per_pattern: 16,
        }
    }
}

impl SchedulerConfig {
    /// Duration of one sixteenth note on the audio clock (seconds)
    pub fn step_interval_s(&self) -> f64 {
        0.25 * (60.0 / self.tempo_bpm)
    }

    /// Host timer period
    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tempo_bpm > 0.0 && self.tempo_bpm <= MAX_TEMPO_BPM) {
            return Err(ConfigError::Invalid(format!(
                "tempo must be in (0, {}] BPM, got {}",
                MAX_TEMPO_BPM, self.tempo_bpm
            )));
        }
        if self.lookahead_ms == 0 {
            return Err(ConfigError::Invalid("lookahead must be > 0 ms".to_string()));
        }
        if self.steps_per_pattern == 0 {
            return Err(ConfigError::Invalid(
                "pattern must have at least one step".to_string(),
            ));
        }
        if !(self.start_offset_s >= 0.0 && self.start_offset_s.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "start offset must be finite and >= 0, got {}",
                self.start_offset_s
            )));
        }

        // Events are committed late (audibly) unless the horizon covers one
        // full tick period plus the worst timer lateness.
        let required_s = (self.lookahead_ms + self.expected_jitter_ms) as f64 / 1000.0;
        if !(self.schedule_ahead_s > required_s && self.schedule_ahead_s.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "schedule-ahead horizon {}s must be finite and exceed lookahead + jitter ({}s)",
                self.schedule_ahead_s, required_s
            )));
        }
        Ok(())
    }
}

/// Step pattern: which voices fire on which sixteenth
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Probability that a bass note fires on any given step
    /// default: 0.6
    pub bass_probability: f64,

    /// Candidate bass pitches (Hz), drawn uniformly. Duplicates weight a pitch.
    /// default: [55, 65, 55, 110]
    pub bass_notes_hz: Vec<f32>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            bass_probability: 0.6,
            bass_notes_hz: vec![55.0, 65.0, 55.0, 110.0],
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.bass_probability) {
            return Err(ConfigError::Invalid(format!(
                "bass probability must be in [0, 1], got {}",
                self.bass_probability
            )));
        }
        let bad_note = self
            .bass_notes_hz
            .iter()
            .find(|n| !(n.is_finite() && **n > 0.0));
        if let Some(note) = bad_note {
            return Err(ConfigError::Invalid(format!(
                "bass notes must be finite and > 0 Hz, got {}",
                note
            )));
        }
        Ok(())
    }
}

/// Kick drum: pitched sine sweep
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KickParams {
    /// Pitch at the attack (Hz)
    pub start_hz: f32,
    /// Pitch the sweep settles at (Hz, must be > 0)
    pub end_hz: f32,
    /// Peak gain (linear)
    pub peak_gain: f32,
    /// Sweep, decay and voice length (seconds)
    pub duration_s: f64,
}

impl Default for KickParams {
    fn default() -> Self {
        Self {
            start_hz: 150.0,
            end_hz: 0.01,
            peak_gain: 1.0,
            duration_s: 0.5,
        }
    }
}

/// Hi-hat: band-passed white noise burst
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HiHatParams {
    /// Length of the noise buffer (seconds)
    pub noise_duration_s: f64,
    /// Band-pass center (Hz)
    pub center_hz: f32,
    /// Band-pass resonance
    pub q: f32,
    pub peak_gain: f32,
    /// Gain decay time (seconds)
    pub decay_s: f64,
}

impl Default for HiHatParams {
    fn default() -> Self {
        Self {
            noise_duration_s: 0.1,
            center_hz: 10_000.0,
            q: 1.0,
            peak_gain: 0.3,
            decay_s: 0.05,
        }
    }
}

/// Bass: sawtooth stab
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BassParams {
    pub peak_gain: f32,
    /// Decay and voice length (seconds)
    pub duration_s: f64,
}

impl Default for BassParams {
    fn default() -> Self {
        Self {
            peak_gain: 0.2,
            duration_s: 0.3,
        }
    }
}

/// Per-voice synthesis parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    pub kick: KickParams,
    pub hihat: HiHatParams,
    pub bass: BassParams,
}

impl VoiceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("kick duration", self.kick.duration_s),
            ("hi-hat noise duration", self.hihat.noise_duration_s),
            ("hi-hat decay", self.hihat.decay_s),
            ("bass duration", self.bass.duration_s),
        ];
        for (name, value) in durations {
            require_positive(name, value, "s")?;
        }
        let levels = [
            ("kick start pitch", self.kick.start_hz, "Hz"),
            ("kick end pitch", self.kick.end_hz, "Hz"),
            ("kick peak gain", self.kick.peak_gain, ""),
            ("hi-hat center", self.hihat.center_hz, "Hz"),
            ("hi-hat Q", self.hihat.q, ""),
            ("hi-hat peak gain", self.hihat.peak_gain, ""),
            ("bass peak gain", self.bass.peak_gain, ""),
        ];
        for (name, value, unit) in levels {
            require_positive(name, value as f64, unit)?;
        }
        Ok(())
    }
}

/// Envelope ramps and filters need strictly positive, finite values
fn require_positive(name: &str, value: f64, unit: &str) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be finite and > 0{}, got {}",
            name, unit, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_interval_at_138_bpm() {
        let config = SchedulerConfig::default();
        assert!((config.step_interval_s() - 0.108_695_65).abs() < 1e-6);
    }

    #[test]
    fn test_lookahead_invariant_enforced() {
        let config = SchedulerConfig {
            schedule_ahead_s: 0.05,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pattern_rejects_probability_out_of_range() {
        let config = PatternConfig {
            bass_probability: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_voice_params_reject_zero_duration() {
        let mut voices = VoiceParams::default();
        assert!(voices.validate().is_ok());

        voices.bass.duration_s = 0.0;
        assert!(voices.validate().is_err());
    }

    #[test]
    fn test_voice_params_reject_non_positive_gain() {
        let mut voices = VoiceParams::default();
        voices.hihat.peak_gain = 0.0;
        assert!(voices.validate().is_err());

        let mut voices = VoiceParams::default();
        voices.kick.peak_gain = f32::INFINITY;
        assert!(voices.validate().is_err());
    }

    #[test]
    fn test_scheduler_rejects_non_finite_timing() {
        for tempo in [f64::INFINITY, f64::NAN, MAX_TEMPO_BPM + 1.0] {
            let config = SchedulerConfig {
                tempo_bpm: tempo,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "tempo {} accepted", tempo);
        }

        let config = SchedulerConfig {
            schedule_ahead_s: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
