//! Playback controller: owns the audio context, the sequencer position and
//! the two callback chains (scheduler ticks, per-frame reductions).
//!
//! Stopped → Playing: lazily create the context, resume it, reset the
//! sequencer, arm both chains. Playing → Stopped: suspend the context and
//! cancel the scheduler re-arm; the reduce chain lapses on its next frame.

use rand::{rngs::StdRng, Rng};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{
    AudioContext, AudioHost, ContextState, EventSynthesizer, FeatureBuffer, FeatureReader,
    FrameLoop, LookAheadScheduler, RepeatingTimer, SchedulerState, SpectralReducer,
};
use crate::error::AudioError;
use crate::params::{AnalyserConfig, EngineConfig, GeneratorConfig};

/// Externally visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Session object wiring host, scheduler, synthesizer and reducer together
pub struct PlaybackController<H: AudioHost, R: Rng = StdRng> {
    host: H,
    engine_config: EngineConfig,
    analyser_config: AnalyserConfig,
    /// Created on first start, kept for the rest of the session
    context: Option<H::Context>,
    scheduler: LookAheadScheduler,
    synthesizer: EventSynthesizer,
    reducer: SpectralReducer,
    features: FeatureBuffer,
    scheduler_timer: RepeatingTimer,
    reduce_loop: FrameLoop,
    state: PlaybackState,
    rng: R,
    events_scheduled: u64,
}

impl<H: AudioHost, R: Rng> PlaybackController<H, R> {
    /// Config must already be validated
    pub fn new(host: H, config: &GeneratorConfig, rng: R) -> Self {
        Self {
            host,
            engine_config: config.engine.clone(),
            analyser_config: config.analyser.clone(),
            context: None,
            scheduler: LookAheadScheduler::new(config.scheduler.clone(), config.pattern.clone()),
            synthesizer: EventSynthesizer::new(config.voices.clone()),
            reducer: SpectralReducer::new(),
            features: FeatureBuffer::new(config.analyser.bin_count()),
            scheduler_timer: RepeatingTimer::new(config.scheduler.lookahead()),
            reduce_loop: FrameLoop::default(),
            state: PlaybackState::Stopped,
            rng,
            events_scheduled: 0,
        }
    }

    /// Create the audio context if it does not exist yet; idempotent
    pub fn init_audio(&mut self) -> Result<(), AudioError> {
        if self.context.is_some() {
            return Ok(());
        }
        let context = self
            .host
            .create_context(&self.engine_config, &self.analyser_config)?;
        info!(
            sample_rate = context.sample_rate(),
            bins = context.frequency_bin_count(),
            "Audio engine initialized"
        );
        self.context = Some(context);
        Ok(())
    }

    /// Flip between Stopped and Playing; a failed start leaves Stopped
    pub fn toggle_play(&mut self, now: Instant) -> PlaybackState {
        match self.state {
            PlaybackState::Playing => self.stop(),
            PlaybackState::Stopped => {
                if let Err(e) = self.start(now) {
                    warn!("Playback not started: {}", e);
                }
            }
        }
        self.state
    }

    pub fn start(&mut self, now: Instant) -> Result<(), AudioError> {
        if self.state == PlaybackState::Playing {
            return Ok(());
        }

        self.init_audio()?;
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        if context.state() == ContextState::Suspended {
            context.resume()?;
        }

        self.scheduler.reset(context.current_time());
        self.state = PlaybackState::Playing;
        self.scheduler_timer.start(now);
        self.poll(now);
        self.reduce_loop.request();

        info!(
            tempo_bpm = self.scheduler.config().tempo_bpm,
            "Playback started"
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.state = PlaybackState::Stopped;
        self.scheduler_timer.cancel();
        if let Some(context) = self.context.as_mut() {
            if let Err(e) = context.suspend() {
                warn!("Failed to suspend audio context: {}", e);
            }
        }
        info!(events = self.events_scheduled, "Playback stopped");
    }

    /// Run the scheduler tick if its timer is due; returns events scheduled
    pub fn poll(&mut self, now: Instant) -> usize {
        if self.state != PlaybackState::Playing || !self.scheduler_timer.poll(now) {
            return 0;
        }
        let Some(context) = self.context.as_mut() else {
            return 0;
        };

        let events = self.scheduler.tick(context.current_time(), &mut self.rng);
        let mut scheduled = 0;
        for event in &events {
            if self
                .synthesizer
                .synthesize(Some(&mut *context), event, &mut self.rng)
            {
                scheduled += 1;
            }
        }
        self.events_scheduled += scheduled as u64;
        scheduled
    }

    /// Display-refresh callback: reduce once if the chain is armed, then
    /// re-arm only while playing. Returns whether a reduction ran.
    pub fn on_frame(&mut self) -> bool {
        if !self.reduce_loop.take() {
            return false;
        }
        let reduced = self.reducer.reduce(self.context.as_mut(), &self.features);
        if self.state == PlaybackState::Playing {
            self.reduce_loop.request();
        } else {
            debug!("Reduce chain ended");
        }
        reduced
    }

    /// Earliest instant the event loop must wake for the scheduler
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler_timer.deadline()
    }

    pub fn has_pending_tick(&self) -> bool {
        self.scheduler_timer.is_armed()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Live handle on the latest feature vector
    pub fn audio_data_ref(&self) -> FeatureReader {
        self.features.reader()
    }

    /// Audio-clock time of the most recently committed kick (may be ahead
    /// of the clock by up to the schedule-ahead horizon)
    pub fn last_beat_time(&self) -> f64 {
        self.synthesizer.last_beat_time()
    }

    /// Audio-clock time of the latest kick the clock has reached; this is
    /// the one visuals should flash on
    pub fn sounding_beat_time(&self) -> f64 {
        self.audio_time()
            .map(|now| self.synthesizer.sounding_beat_time(now))
            .unwrap_or(0.0)
    }

    /// Current audio clock, if the engine exists
    pub fn audio_time(&self) -> Option<f64> {
        self.context.as_ref().map(|context| context.current_time())
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn events_scheduled(&self) -> u64 {
        self.events_scheduled
    }

    pub fn reductions(&self) -> u64 {
        self.reducer.reductions()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn context(&self) -> Option<&H::Context> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut H::Context> {
        self.context.as_mut()
    }
}
