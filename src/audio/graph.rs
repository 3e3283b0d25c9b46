//! Disposable per-hit signal graphs: source → (band-pass) → gain → master bus.
//!
//! A [`SignalGraph`] is built once, handed to the engine, rendered between its
//! start and stop times on the audio clock, then dropped. Nothing is reused.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use rand::Rng;
use std::f64::consts::TAU;

use crate::error::AudioError;

/// Parameter automation evaluated against the audio clock (seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioParam {
    Constant(f32),

    /// Holds `from` until `start`, ramps exponentially, holds `to` after `end`
    ExponentialRamp {
        from: f32,
        to: f32,
        start: f64,
        end: f64,
    },
}

impl AudioParam {
    pub fn exponential(from: f32, to: f32, start: f64, end: f64) -> Self {
        Self::ExponentialRamp {
            from,
            to,
            start,
            end,
        }
    }

    /// Value at audio-clock time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        match *self {
            Self::Constant(value) => value,
            Self::ExponentialRamp {
                from,
                to,
                start,
                end,
            } => {
                if t <= start {
                    from
                } else if t >= end {
                    to
                } else {
                    let progress = ((t - start) / (end - start)) as f32;
                    from * (to / from).powf(progress)
                }
            }
        }
    }

    fn check(&self) -> Result<(), AudioError> {
        match *self {
            Self::Constant(_) => Ok(()),
            Self::ExponentialRamp {
                from,
                to,
                start,
                end,
            } => {
                // An exponential curve through zero or across signs is undefined
                if !(from > 0.0 && to > 0.0) {
                    return Err(AudioError::Graph(format!(
                        "exponential ramp endpoints must be > 0 (got {} -> {})",
                        from, to
                    )));
                }
                if !(end > start) {
                    return Err(AudioError::Graph(format!(
                        "ramp must end after it starts (got {} -> {})",
                        start, end
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Oscillator shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

/// Sound source at the head of a graph
#[derive(Debug, Clone)]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: AudioParam,
        /// Normalized phase in [0, 1)
        phase: f64,
    },

    /// One-shot sample buffer, silent once exhausted
    Buffer { samples: Vec<f32>, position: usize },
}

impl Source {
    pub fn oscillator(waveform: Waveform, frequency: AudioParam) -> Self {
        Self::Oscillator {
            waveform,
            frequency,
            phase: 0.0,
        }
    }

    /// Buffer of uniformly distributed white noise in [-1, 1]
    pub fn white_noise<R: Rng + ?Sized>(rng: &mut R, duration_s: f64, sample_rate: f32) -> Self {
        let len = (duration_s * sample_rate as f64).round() as usize;
        let samples = (0..len).map(|_| rng.gen_range(-1.0f32..=1.0)).collect();
        Self::Buffer {
            samples,
            position: 0,
        }
    }

    /// Natural length of the source in seconds, if it has one
    fn duration_s(&self, sample_rate: f32) -> Option<f64> {
        match self {
            Self::Oscillator { .. } => None,
            Self::Buffer { samples, .. } => Some(samples.len() as f64 / sample_rate as f64),
        }
    }

    fn next_sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        match self {
            Self::Oscillator {
                waveform,
                frequency,
                phase,
            } => {
                let increment = frequency.value_at(t) as f64 / sample_rate as f64;
                let value = match waveform {
                    Waveform::Sine => (TAU * *phase).sin() as f32,
                    Waveform::Sawtooth => {
                        (2.0 * *phase - 1.0 - poly_blep(*phase, increment)) as f32
                    }
                };
                *phase = (*phase + increment).fract();
                value
            }
            Self::Buffer { samples, position } => {
                let value = samples.get(*position).copied().unwrap_or(0.0);
                *position += 1;
                value
            }
        }
    }
}

/// Polynomial band-limited step correction for the sawtooth discontinuity
fn poly_blep(phase: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return 0.0;
    }
    if phase < increment {
        let t = phase / increment;
        t + t - t * t - 1.0
    } else if phase > 1.0 - increment {
        let t = (phase - 1.0) / increment;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// One scheduled voice: source, optional band-pass, gain envelope
pub struct SignalGraph {
    source: Source,
    filter: Option<DirectForm2Transposed<f32>>,
    gain: AudioParam,
    start: f64,
    stop: f64,
}

impl SignalGraph {
    pub fn start_time(&self) -> f64 {
        self.start
    }

    pub fn stop_time(&self) -> f64 {
        self.stop
    }

    /// Gain envelope (for inspection)
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// True once the clock has passed the stop time
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.stop
    }

    /// Render one sample at audio-clock time `t` (silent outside [start, stop))
    pub fn next_sample(&mut self, t: f64, sample_rate: f32) -> f32 {
        if t < self.start || t >= self.stop {
            return 0.0;
        }
        let raw = self.source.next_sample(t, sample_rate);
        let filtered = match self.filter.as_mut() {
            Some(filter) => filter.run(raw),
            None => raw,
        };
        filtered * self.gain.value_at(t)
    }
}

/// Builder for [`SignalGraph`]; stateless between builds
pub struct GraphBuilder {
    sample_rate: f32,
    source: Option<Source>,
    bandpass: Option<(f32, f32)>,
    gain: AudioParam,
    start: f64,
    stop: Option<f64>,
}

impl GraphBuilder {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            source: None,
            bandpass: None,
            gain: AudioParam::Constant(1.0),
            start: 0.0,
            stop: None,
        }
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Insert a band-pass filter (center Hz, Q) between source and gain
    pub fn bandpass(mut self, center_hz: f32, q: f32) -> Self {
        self.bandpass = Some((center_hz, q));
        self
    }

    pub fn gain(mut self, gain: AudioParam) -> Self {
        self.gain = gain;
        self
    }

    pub fn start(mut self, time: f64) -> Self {
        self.start = time;
        self
    }

    /// Stop time; buffer sources without one stop when exhausted
    pub fn stop(mut self, time: f64) -> Self {
        self.stop = Some(time);
        self
    }

    pub fn build(self) -> Result<SignalGraph, AudioError> {
        let source = self
            .source
            .ok_or_else(|| AudioError::Graph("graph has no source".to_string()))?;
        self.gain.check()?;
        if let Source::Oscillator { frequency, .. } = &source {
            frequency.check()?;
        }

        let stop = match (self.stop, source.duration_s(self.sample_rate)) {
            (Some(stop), Some(natural)) => stop.min(self.start + natural),
            (Some(stop), None) => stop,
            (None, Some(natural)) => self.start + natural,
            (None, None) => {
                return Err(AudioError::Graph(
                    "oscillator graph needs a stop time".to_string(),
                ))
            }
        };

        let filter = match self.bandpass {
            Some((center_hz, q)) => {
                // Coefficient design fails at or above Nyquist
                let center_hz = center_hz.min(self.sample_rate * 0.45);
                let coeffs = Coefficients::<f32>::from_params(
                    Type::BandPass,
                    self.sample_rate.hz(),
                    center_hz.hz(),
                    q,
                )
                .map_err(|e| AudioError::Graph(format!("band-pass design failed: {:?}", e)))?;
                Some(DirectForm2Transposed::<f32>::new(coeffs))
            }
            None => None,
        };

        Ok(SignalGraph {
            source,
            filter,
            gain: self.gain,
            start: self.start,
            stop,
        })
    }
}
