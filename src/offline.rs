//! Headless rendering: drives the playback controller on a simulated wall
//! clock over [`OfflineHost`] and writes the mix to a WAV file.

use rand::Rng;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use crate::audio::OfflineHost;
use crate::controller::PlaybackController;
use crate::error::AudioError;
use crate::params::{audio_constants::RENDER_QUANTUM, GeneratorConfig};

/// Display refresh rate simulated for the reduce chain (Hz)
const FRAME_RATE: f64 = 60.0;

/// Output channel count (mono mix duplicated)
const CHANNELS: u16 = 2;

/// What an offline render produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSummary {
    /// Frames written per channel
    pub frames: usize,
    pub events_scheduled: u64,
    pub reductions: u64,
    /// Mean low/mid/high levels over all reductions (0..=255)
    pub mean_bands: [f32; 3],
    /// Largest absolute sample after limiting
    pub peak: f32,
}

/// Render `seconds` of playback to a 32-bit float stereo WAV at `output`
pub fn render_offline<R: Rng>(
    config: &GeneratorConfig,
    rng: R,
    seconds: f32,
    output: &Path,
) -> Result<RenderSummary, AudioError> {
    let samples = render_samples(config, rng, seconds)?;

    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: config.engine.sample_rate_hz,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;
    for sample in &samples.mix {
        for _ in 0..CHANNELS {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;

    info!(
        path = %output.display(),
        frames = samples.summary.frames,
        events = samples.summary.events_scheduled,
        reductions = samples.summary.reductions,
        low = samples.summary.mean_bands[0],
        mid = samples.summary.mean_bands[1],
        high = samples.summary.mean_bands[2],
        "Offline render complete"
    );
    Ok(samples.summary)
}

/// Rendered mono mix plus its summary
pub struct RenderedAudio {
    pub mix: Vec<f32>,
    pub summary: RenderSummary,
}

/// Render without touching the filesystem
pub fn render_samples<R: Rng>(
    config: &GeneratorConfig,
    rng: R,
    seconds: f32,
) -> Result<RenderedAudio, AudioError> {
    let sample_rate = config.engine.sample_rate_hz as f64;
    let total_frames = (seconds.max(0.0) as f64 * sample_rate).round() as usize;
    let limit = config.engine.output_limit;

    let mut controller = PlaybackController::new(OfflineHost::new(), config, rng);
    let base = Instant::now();
    controller.start(base)?;

    let frame_period = 1.0 / FRAME_RATE;
    let mut next_frame = 0.0;
    let mut band_sums = [0.0f64; 3];
    let mut mix = Vec::with_capacity(total_frames);
    let mut peak = 0.0f32;

    while mix.len() < total_frames {
        let block = RENDER_QUANTUM.min(total_frames - mix.len());
        let Some(context) = controller.context_mut() else {
            break;
        };
        for sample in context.render(block) {
            let limited = sample.clamp(-limit, limit);
            peak = peak.max(limited.abs());
            mix.push(limited);
        }

        let elapsed = mix.len() as f64 / sample_rate;
        controller.poll(base + Duration::from_secs_f64(elapsed));

        if elapsed >= next_frame {
            next_frame += frame_period;
            if controller.on_frame() {
                let features = controller.audio_data_ref().load();
                band_sums[0] += features.low as f64;
                band_sums[1] += features.mid as f64;
                band_sums[2] += features.high as f64;
            }
        }
    }

    controller.stop();

    let reductions = controller.reductions();
    let mean = |sum: f64| {
        if reductions == 0 {
            0.0
        } else {
            (sum / reductions as f64) as f32
        }
    };

    Ok(RenderedAudio {
        summary: RenderSummary {
            frames: mix.len(),
            events_scheduled: controller.events_scheduled(),
            reductions,
            mean_bands: [mean(band_sums[0]), mean(band_sums[1]), mean(band_sums[2])],
            peak,
        },
        mix,
    })
}
