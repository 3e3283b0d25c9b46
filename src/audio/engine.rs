//! Software audio context: sample clock, voice mixer, master bus, analyser.
//!
//! The engine is the single place the audio clock advances. Hosts call
//! [`Engine::render`] to pull output; everything else schedules against
//! [`Engine::current_time`].

use tracing::debug;

use super::fft::Analyser;
use super::graph::SignalGraph;
use crate::params::{AnalyserConfig, EngineConfig};

/// Whether the clock is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
}

/// Audio engine core shared by all hosts
pub struct Engine {
    sample_rate: f32,
    /// Frames rendered while running (the audio clock)
    frame: u64,
    state: ContextState,
    voices: Vec<SignalGraph>,
    master_gain: f32,
    analyser: Analyser,
}

impl Engine {
    /// Create a running engine; configs must already be validated
    pub fn new(sample_rate: f32, engine: &EngineConfig, analyser: &AnalyserConfig) -> Self {
        Self {
            sample_rate,
            frame: 0,
            state: ContextState::Running,
            voices: Vec::new(),
            master_gain: engine.master_gain,
            analyser: Analyser::new(analyser),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Audio clock in seconds; monotonic, frozen while suspended
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn suspend(&mut self) {
        self.state = ContextState::Suspended;
    }

    pub fn resume(&mut self) {
        self.state = ContextState::Running;
    }

    /// Queue a voice; it sounds once the clock reaches its start time
    pub fn schedule(&mut self, graph: SignalGraph) {
        self.voices.push(graph);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyser.byte_frequency_data(out);
    }

    /// Fill an interleaved buffer with `channels` identical channels.
    ///
    /// While suspended the buffer is zeroed and the clock does not move.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        if self.state == ContextState::Suspended || channels == 0 {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_mut(channels) {
            let t = self.current_time();
            let mut mix = 0.0;
            for voice in &mut self.voices {
                mix += voice.next_sample(t, self.sample_rate);
            }
            let sample = mix * self.master_gain;

            self.analyser.push(sample);
            frame.fill(sample);
            self.frame += 1;
        }

        let now = self.current_time();
        let before = self.voices.len();
        self.voices.retain(|voice| !voice.is_finished(now));
        let retired = before - self.voices.len();
        if retired > 0 {
            debug!(retired, active = self.voices.len(), "Retired finished voices");
        }
    }
}
