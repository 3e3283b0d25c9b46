//! Host audio subsystem seam, plus the headless offline host.

use tracing::{info, warn};

use super::engine::{ContextState, Engine};
use super::graph::SignalGraph;
use crate::error::AudioError;
use crate::params::{AnalyserConfig, EngineConfig};

/// A live audio-processing context: clock, voice scheduling, analysis
pub trait AudioContext {
    /// Audio clock (seconds, monotonic)
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> f32;

    fn state(&self) -> ContextState;

    fn suspend(&mut self) -> Result<(), AudioError>;

    fn resume(&mut self) -> Result<(), AudioError>;

    /// Fire-and-forget: the graph plays and tears itself down on the audio clock
    fn schedule(&mut self, graph: SignalGraph);

    /// Fixed for the lifetime of the context
    fn frequency_bin_count(&self) -> usize;

    /// Latest byte magnitude per frequency bin
    fn byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Factory for audio contexts; creation may be refused by the platform
pub trait AudioHost {
    type Context: AudioContext;

    fn create_context(
        &mut self,
        engine: &EngineConfig,
        analyser: &AnalyserConfig,
    ) -> Result<Self::Context, AudioError>;
}

/// Headless host: the clock only moves when the caller renders
#[derive(Debug, Default)]
pub struct OfflineHost {
    refusals_left: usize,
    contexts_created: usize,
}

impl OfflineHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the first `count` creation attempts, like a platform that
    /// withholds audio until a user gesture
    pub fn with_refusals(count: usize) -> Self {
        Self {
            refusals_left: count,
            contexts_created: 0,
        }
    }

    pub fn contexts_created(&self) -> usize {
        self.contexts_created
    }
}

impl AudioHost for OfflineHost {
    type Context = OfflineContext;

    fn create_context(
        &mut self,
        engine: &EngineConfig,
        analyser: &AnalyserConfig,
    ) -> Result<OfflineContext, AudioError> {
        if self.refusals_left > 0 {
            self.refusals_left -= 1;
            warn!(
                remaining = self.refusals_left,
                "Offline host refusing context creation"
            );
            return Err(AudioError::ContextRefused(
                "offline host configured to refuse".to_string(),
            ));
        }

        self.contexts_created += 1;
        let sample_rate = engine.sample_rate_hz as f32;
        info!(sample_rate, "Offline audio context created");
        Ok(OfflineContext {
            engine: Engine::new(sample_rate, engine, analyser),
        })
    }
}

/// Context driven by explicit [`OfflineContext::render`] calls
pub struct OfflineContext {
    engine: Engine,
}

impl OfflineContext {
    /// Render `frames` mono frames, advancing the clock if running
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames];
        self.engine.render(&mut buffer, 1);
        buffer
    }

    /// Advance the clock by at least `seconds`, discarding output
    pub fn advance(&mut self, seconds: f64) {
        let frames = (seconds * self.engine.sample_rate() as f64).ceil() as usize;
        self.render(frames);
    }

    pub fn active_voices(&self) -> usize {
        self.engine.active_voices()
    }
}

impl AudioContext for OfflineContext {
    fn current_time(&self) -> f64 {
        self.engine.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.engine.sample_rate()
    }

    fn state(&self) -> ContextState {
        self.engine.state()
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.engine.suspend();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.engine.resume();
        Ok(())
    }

    fn schedule(&mut self, graph: SignalGraph) {
        self.engine.schedule(graph);
    }

    fn frequency_bin_count(&self) -> usize {
        self.engine.frequency_bin_count()
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.engine.byte_frequency_data(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusals_then_success() {
        let mut host = OfflineHost::with_refusals(2);
        let engine = EngineConfig::default();
        let analyser = AnalyserConfig::default();

        assert!(host.create_context(&engine, &analyser).is_err());
        assert!(host.create_context(&engine, &analyser).is_err());
        let context = host.create_context(&engine, &analyser).unwrap();

        assert_eq!(host.contexts_created(), 1);
        assert_eq!(context.frequency_bin_count(), 128);
        assert_eq!(context.sample_rate(), 44100.0);
    }

    #[test]
    fn test_advance_moves_clock() {
        let mut host = OfflineHost::new();
        let mut context = host
            .create_context(&EngineConfig::default(), &AnalyserConfig::default())
            .unwrap();

        context.advance(0.5);
        assert!((context.current_time() - 0.5).abs() < 1e-4);

        context.suspend().unwrap();
        context.advance(0.5);
        assert!((context.current_time() - 0.5).abs() < 1e-4);
        assert_eq!(context.state(), ContextState::Suspended);
    }
}
