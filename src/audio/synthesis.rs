//! Event synthesizer: one disposable signal graph per musical event.

use rand::Rng;
use std::collections::VecDeque;
use tracing::{trace, warn};

use super::graph::{AudioParam, GraphBuilder, SignalGraph, Source, Waveform};
use super::host::AudioContext;
use super::scheduler::{EventKind, ScheduledEvent};
use crate::error::AudioError;
use crate::params::{
    audio_constants::ENVELOPE_FLOOR, BassParams, HiHatParams, KickParams, VoiceParams,
};

/// Turns scheduled events into voices on an audio context
#[derive(Debug, Clone)]
pub struct EventSynthesizer {
    voices: VoiceParams,
    /// Committed kick times, oldest first: at most one already reached by
    /// the audio clock, then those still ahead of it
    beat_times: VecDeque<f64>,
}

impl EventSynthesizer {
    pub fn new(voices: VoiceParams) -> Self {
        Self {
            voices,
            beat_times: VecDeque::new(),
        }
    }

    /// Start time of the most recently committed kick, which may still be
    /// up to one schedule-ahead horizon in the future. 0 before any kick.
    pub fn last_beat_time(&self) -> f64 {
        self.beat_times.back().copied().unwrap_or(0.0)
    }

    /// Start time of the latest kick at or before `now`, or 0 if none has
    /// sounded yet
    pub fn sounding_beat_time(&self, now: f64) -> f64 {
        self.beat_times
            .iter()
            .rev()
            .find(|time| **time <= now)
            .copied()
            .unwrap_or(0.0)
    }

    fn record_beat(&mut self, now: f64, time: f64) {
        while self.beat_times.len() >= 2 && self.beat_times[1] <= now {
            self.beat_times.pop_front();
        }
        self.beat_times.push_back(time);
    }

    /// Build and schedule the graph for `event`.
    ///
    /// Returns `false` without complaint when no context exists yet; start
    /// clicks racing lazy initialization are expected.
    pub fn synthesize<C, R>(
        &mut self,
        context: Option<&mut C>,
        event: &ScheduledEvent,
        rng: &mut R,
    ) -> bool
    where
        C: AudioContext + ?Sized,
        R: Rng + ?Sized,
    {
        let Some(context) = context else {
            return false;
        };

        let sample_rate = context.sample_rate();
        let graph = match event.kind {
            EventKind::Kick => kick_graph(sample_rate, &self.voices.kick, event.start_time),
            EventKind::HiHat => {
                hihat_graph(sample_rate, &self.voices.hihat, event.start_time, rng)
            }
            EventKind::Bass => match event.note_hz {
                Some(note_hz) => {
                    bass_graph(sample_rate, &self.voices.bass, event.start_time, note_hz)
                }
                None => Err(AudioError::Graph("bass event without a note".to_string())),
            },
        };

        match graph {
            Ok(graph) => {
                trace!(kind = ?event.kind, time = event.start_time, "Scheduling voice");
                let now = context.current_time();
                context.schedule(graph);
                if event.kind == EventKind::Kick {
                    self.record_beat(now, event.start_time);
                }
                true
            }
            Err(e) => {
                warn!(kind = ?event.kind, "Dropping event: {}", e);
                false
            }
        }
    }
}

/// Sine sweep with matching exponential decay
pub fn kick_graph(
    sample_rate: f32,
    params: &KickParams,
    time: f64,
) -> Result<SignalGraph, AudioError> {
    let end = time + params.duration_s;
    GraphBuilder::new(sample_rate)
        .source(Source::oscillator(
            Waveform::Sine,
            AudioParam::exponential(params.start_hz, params.end_hz, time, end),
        ))
        .gain(AudioParam::exponential(params.peak_gain, ENVELOPE_FLOOR, time, end))
        .start(time)
        .stop(end)
        .build()
}

/// White-noise burst through a high band-pass
pub fn hihat_graph<R: Rng + ?Sized>(
    sample_rate: f32,
    params: &HiHatParams,
    time: f64,
    rng: &mut R,
) -> Result<SignalGraph, AudioError> {
    GraphBuilder::new(sample_rate)
        .source(Source::white_noise(rng, params.noise_duration_s, sample_rate))
        .bandpass(params.center_hz, params.q)
        .gain(AudioParam::exponential(
            params.peak_gain,
            ENVELOPE_FLOOR,
            time,
            time + params.decay_s,
        ))
        .start(time)
        .build()
}

/// Sawtooth held at `note_hz`
pub fn bass_graph(
    sample_rate: f32,
    params: &BassParams,
    time: f64,
    note_hz: f32,
) -> Result<SignalGraph, AudioError> {
    let end = time + params.duration_s;
    GraphBuilder::new(sample_rate)
        .source(Source::oscillator(Waveform::Sawtooth, AudioParam::Constant(note_hz)))
        .gain(AudioParam::exponential(params.peak_gain, ENVELOPE_FLOOR, time, end))
        .start(time)
        .stop(end)
        .build()
}
