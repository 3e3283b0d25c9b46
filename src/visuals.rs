//! Maps the published feature vector and VJ state onto shader uniforms.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::audio::AudioData;
use crate::vj::VjState;

/// Spectrum bins packed four per `vec4`
pub const SPECTRUM_VEC4S: usize = 32;

pub const FLAG_PIXELATE: u32 = 1 << 0;
pub const FLAG_STROBE: u32 = 1 << 1;

/// Uniform block for `visualizer.wgsl` (std140-compatible layout)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct VisualizerUniforms {
    /// low, mid, high, average in [0, 1]
    pub bands: [f32; 4],
    pub time: f32,
    pub beat_flash: f32,
    pub mode: u32,
    pub flags: u32,
    pub glitch: f32,
    pub color_shift: f32,
    pub aspect: f32,
    pub _padding: f32,
    /// First 128 bins in [0, 1]; missing bins read as zero
    pub spectrum: [[f32; 4]; SPECTRUM_VEC4S],
}

impl VisualizerUniforms {
    pub fn from_features(
        features: &AudioData,
        vj: &VjState,
        time: f32,
        beat_flash: f32,
        aspect: f32,
    ) -> Self {
        let mut spectrum = [[0.0; 4]; SPECTRUM_VEC4S];
        for (i, bin) in features
            .frequency
            .iter()
            .take(SPECTRUM_VEC4S * 4)
            .enumerate()
        {
            spectrum[i / 4][i % 4] = *bin as f32 / 255.0;
        }

        let mut flags = 0;
        if vj.pixelate {
            flags |= FLAG_PIXELATE;
        }
        if vj.strobe {
            flags |= FLAG_STROBE;
        }

        let bands =
            Vec4::new(features.low, features.mid, features.high, features.average) / 255.0;

        Self {
            bands: bands.clamp(Vec4::ZERO, Vec4::ONE).to_array(),
            time,
            beat_flash: beat_flash.clamp(0.0, 1.0),
            mode: vj.visual_mode.index(),
            flags,
            glitch: vj.glitch_intensity,
            color_shift: vj.color_shift,
            aspect,
            _padding: 0.0,
            spectrum,
        }
    }
}

/// Flash level for a kick: 1 on the beat, decaying exponentially.
///
/// Pass the latest kick the clock has reached, not the latest one
/// committed: the scheduler commits kicks ahead of the clock, and a future
/// beat time (or none yet) gives 0.
pub fn beat_flash(audio_time: f64, last_beat_time: f64, decay_per_s: f32) -> f32 {
    if last_beat_time <= 0.0 {
        return 0.0;
    }
    let elapsed = audio_time - last_beat_time;
    if elapsed < 0.0 {
        return 0.0;
    }
    (-(elapsed as f32) * decay_per_s).exp()
}
