//! Device audio host: drives the engine from a cpal output stream.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

use super::engine::{ContextState, Engine};
use super::graph::SignalGraph;
use super::host::{AudioContext, AudioHost};
use crate::error::AudioError;
use crate::params::{AnalyserConfig, EngineConfig, RecordingConfig};

type WavRecorder = Arc<Mutex<Option<hound::WavWriter<BufWriter<File>>>>>;

/// Host backed by the default cpal output device
#[derive(Debug, Default)]
pub struct CpalHost {
    recording: Option<RecordingConfig>,
}

impl CpalHost {
    pub fn new(recording: Option<RecordingConfig>) -> Self {
        Self { recording }
    }
}

impl AudioHost for CpalHost {
    type Context = CpalContext;

    fn create_context(
        &mut self,
        engine_config: &EngineConfig,
        analyser_config: &AnalyserConfig,
    ) -> Result<CpalContext, AudioError> {
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        let recorder: WavRecorder = Arc::new(Mutex::new(match &self.recording {
            Some(recording) => {
                let spec = hound::WavSpec {
                    channels: channels as u16,
                    sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let path = recording.audio_path();
                info!("Recording audio to {}", path.display());
                Some(hound::WavWriter::create(path, spec)?)
            }
            None => None,
        }));

        let engine = Arc::new(Mutex::new(Engine::new(
            sample_rate as f32,
            engine_config,
            analyser_config,
        )));
        let output = OutputStage {
            engine: Arc::clone(&engine),
            recorder: Arc::clone(&recorder),
            limit: engine_config.output_limit,
            channels,
            scratch: Vec::new(),
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), output),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), output),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), output),
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream.play()?;
        info!("Audio stream started at {} Hz", sample_rate);

        Ok(CpalContext {
            engine,
            recorder,
            stream,
            sample_rate: sample_rate as f32,
            bin_count: analyser_config.bin_count(),
        })
    }
}

/// State owned by the device callback
struct OutputStage {
    engine: Arc<Mutex<Engine>>,
    recorder: WavRecorder,
    limit: f32,
    channels: usize,
    scratch: Vec<f32>,
}

impl OutputStage {
    fn process<T>(&mut self, data: &mut [T])
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        self.scratch.resize(data.len(), 0.0);
        lock(&self.engine).render(&mut self.scratch, self.channels);

        // Safety limiter: hard clip to protect ears and speakers
        let limit = self.limit;
        for (out, sample) in data.iter_mut().zip(&self.scratch) {
            *out = T::from_sample(sample.clamp(-limit, limit));
        }

        if let Some(writer) = lock(&self.recorder).as_mut() {
            for sample in &self.scratch {
                let _ = writer.write_sample(sample.clamp(-limit, limit));
            }
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut output: OutputStage,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| output.process(data),
        |err| error!("Audio stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// A poisoned lock only means a panic elsewhere; the engine state is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Context whose clock is advanced by the device callback
pub struct CpalContext {
    engine: Arc<Mutex<Engine>>,
    recorder: WavRecorder,
    /// Output stream (kept alive)
    stream: cpal::Stream,
    sample_rate: f32,
    bin_count: usize,
}

impl CpalContext {
    /// Finalize the WAV capture, if one is running
    pub fn finish_recording(&mut self) -> Result<(), AudioError> {
        if let Some(writer) = lock(&self.recorder).take() {
            writer.finalize()?;
            info!("Audio recording finalized");
        }
        Ok(())
    }
}

impl AudioContext for CpalContext {
    fn current_time(&self) -> f64 {
        lock(&self.engine).current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn state(&self) -> ContextState {
        lock(&self.engine).state()
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        lock(&self.engine).suspend();
        self.stream.pause()?;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.stream.play()?;
        lock(&self.engine).resume();
        Ok(())
    }

    fn schedule(&mut self, graph: SignalGraph) {
        lock(&self.engine).schedule(graph);
    }

    fn frequency_bin_count(&self) -> usize {
        self.bin_count
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        lock(&self.engine).byte_frequency_data(out);
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        if let Err(e) = self.finish_recording() {
            warn!("Failed to finalize recording: {}", e);
        }
    }
}
