//! Spectrum analyser producing byte-valued frequency snapshots.
//!
//! Blackman window, magnitude smoothing across snapshots, then a dB scale
//! mapped onto 0..=255.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::params::AnalyserConfig;

/// Analysis node fed with master-bus samples
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Ring buffer of the most recent `fft_size` samples
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl Analyser {
    /// Config must already be validated (power-of-two size)
    pub fn new(config: &AnalyserConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            history: vec![0.0; fft_size],
            write_pos: 0,
            window: (0..fft_size).map(|i| blackman_window(i, fft_size)).collect(),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing,
            min_db: config.min_db,
            max_db: config.max_db,
        }
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed one sample from the master bus
    pub fn push(&mut self, sample: f32) {
        self.history[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.fft_size;
    }

    /// Analyse the current window and write byte magnitudes into `out`.
    ///
    /// Fills `min(out.len(), frequency_bin_count())` entries; each call also
    /// advances the smoothing state.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        // Oldest sample first
        for i in 0..self.fft_size {
            let sample = self.history[(self.write_pos + i) % self.fft_size];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }

        let range_db = self.max_db - self.min_db;
        for (byte, magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = magnitude_to_byte(*magnitude, self.min_db, range_db);
        }
    }
}

/// Map a linear magnitude onto 0..=255 across [min_db, min_db + range_db]
fn magnitude_to_byte(magnitude: f32, min_db: f32, range_db: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - min_db) / range_db;
    scaled.clamp(0.0, 255.0) as u8
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyser() -> Analyser {
        Analyser::new(&AnalyserConfig::default())
    }

    #[test]
    fn test_blackman_window() {
        let size = 256;

        // Blackman window is ~0 at the edge, 1 at the center
        assert!(blackman_window(0, size).abs() < 1e-6);
        assert!((blackman_window(size / 2, size) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = analyser();
        let mut bins = vec![255u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&mut bins);
        assert!(bins.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_sine_peaks_at_matching_bin() {
        let mut analyser = Analyser::new(&AnalyserConfig {
            smoothing: 0.0,
            ..Default::default()
        });
        let sample_rate = 44100.0;
        // Bin 20 of a 256-point transform
        let freq = 20.0 * sample_rate / 256.0;
        for i in 0..256 {
            analyser.push((2.0 * PI * freq * i as f32 / sample_rate).sin() * 0.08);
        }

        let mut bins = vec![0u8; 128];
        analyser.byte_frequency_data(&mut bins);

        let loudest = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| **b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, 20);
        assert!(bins[20] > 200);
        assert!(bins[100] < bins[20] / 2);
    }

    #[test]
    fn test_smoothing_lags_behind_input() {
        let mut analyser = analyser();
        for i in 0..256 {
            analyser.push(if i % 2 == 0 { 0.5 } else { -0.5 });
        }

        let mut first = vec![0u8; 128];
        let mut second = vec![0u8; 128];
        analyser.byte_frequency_data(&mut first);
        analyser.byte_frequency_data(&mut second);

        // Same window analysed twice: smoothed energy grows towards the target
        let sum = |bins: &[u8]| bins.iter().map(|b| *b as u32).sum::<u32>();
        assert!(sum(&second) > sum(&first));
    }

    #[test]
    fn test_short_output_buffer_is_partially_filled() {
        let mut analyser = analyser();
        let mut bins = vec![9u8; 4];
        analyser.byte_frequency_data(&mut bins);
        assert_eq!(bins, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_magnitude_to_byte_range() {
        assert_eq!(magnitude_to_byte(0.0, -100.0, 70.0), 0);
        assert_eq!(magnitude_to_byte(1.0, -100.0, 70.0), 255);
        // -65 dB sits halfway between -100 and -30
        let mid = magnitude_to_byte(10f32.powf(-65.0 / 20.0), -100.0, 70.0);
        assert!((126..=128).contains(&mid));
    }
}
