//! Spectral reducer and the shared feature buffer read by the render loop.

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::host::AudioContext;

/// Feature vector published once per reduction.
///
/// Band levels are byte-scale means (0..=255) over fixed fractions of the bin
/// array, not over fixed frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Byte magnitude per frequency bin
    pub frequency: Vec<u8>,
    /// Mean over all bins
    pub average: f32,
    /// Mean over the first 10% of bins
    pub low: f32,
    /// Mean over the next 40% of bins
    pub mid: f32,
    /// Mean over the remaining 50% of bins
    pub high: f32,
}

/// Bin index boundaries between the low/mid/high buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandBounds {
    /// First mid bin (`floor(n * 0.1)`)
    pub low_end: usize,
    /// First high bin (`floor(n * 0.5)`)
    pub mid_end: usize,
}

impl BandBounds {
    pub fn for_bins(bins: usize) -> Self {
        Self {
            low_end: bins / 10,
            mid_end: bins / 2,
        }
    }
}

impl AudioData {
    /// All-zero vector with `bins` bins
    pub fn silent(bins: usize) -> Self {
        Self {
            frequency: vec![0; bins],
            average: 0.0,
            low: 0.0,
            mid: 0.0,
            high: 0.0,
        }
    }

    /// Reduce a byte snapshot into band means
    pub fn from_bins(frequency: Vec<u8>) -> Self {
        let bounds = BandBounds::for_bins(frequency.len());
        let low = &frequency[..bounds.low_end];
        let mid = &frequency[bounds.low_end..bounds.mid_end];
        let high = &frequency[bounds.mid_end..];

        Self {
            average: mean(&frequency),
            low: mean(low),
            mid: mean(mid),
            high: mean(high),
            frequency,
        }
    }
}

/// Empty buckets (tiny bin counts) read as silence
fn mean(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|b| *b as u32).sum();
    sum as f32 / bins.len() as f32
}

/// Single-writer, many-reader cell holding the latest [`AudioData`].
///
/// Publishing swaps the whole value; a reader's snapshot is never a mix of
/// two reductions.
#[derive(Debug, Clone)]
pub struct FeatureBuffer {
    cell: Arc<ArcSwap<AudioData>>,
}

impl FeatureBuffer {
    pub fn new(bins: usize) -> Self {
        Self {
            cell: Arc::new(ArcSwap::from_pointee(AudioData::silent(bins))),
        }
    }

    pub fn publish(&self, data: AudioData) {
        self.cell.store(Arc::new(data));
    }

    pub fn load(&self) -> Arc<AudioData> {
        self.cell.load_full()
    }

    /// Read-only handle for consumers
    pub fn reader(&self) -> FeatureReader {
        FeatureReader {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// Read-only view of a [`FeatureBuffer`]; re-load every frame, never cache
#[derive(Debug, Clone)]
pub struct FeatureReader {
    cell: Arc<ArcSwap<AudioData>>,
}

impl FeatureReader {
    pub fn load(&self) -> Arc<AudioData> {
        self.cell.load_full()
    }
}

/// Pulls analyser snapshots and publishes reduced feature vectors
#[derive(Debug, Default)]
pub struct SpectralReducer {
    reductions: u64,
}

impl SpectralReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed reductions this session
    pub fn reductions(&self) -> u64 {
        self.reductions
    }

    /// Snapshot, reduce, publish. No-op (returns `false`) without a context.
    pub fn reduce<C>(&mut self, context: Option<&mut C>, buffer: &FeatureBuffer) -> bool
    where
        C: AudioContext + ?Sized,
    {
        let Some(context) = context else {
            return false;
        };

        let mut bins = vec![0u8; context.frequency_bin_count()];
        context.byte_frequency_data(&mut bins);
        buffer.publish(AudioData::from_bins(bins));
        self.reductions += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::host::{AudioHost, OfflineContext, OfflineHost};
    use crate::params::{AnalyserConfig, EngineConfig};

    #[test]
    fn test_bounds_for_128_bins() {
        let bounds = BandBounds::for_bins(128);
        assert_eq!(bounds.low_end, 12);
        assert_eq!(bounds.mid_end, 64);
    }

    #[test]
    fn test_flat_snapshot_reduces_to_same_level() {
        let data = AudioData::from_bins(vec![100; 128]);
        assert_eq!(data.average, 100.0);
        assert_eq!(data.low, 100.0);
        assert_eq!(data.mid, 100.0);
        assert_eq!(data.high, 100.0);
        assert_eq!(data.frequency.len(), 128);
    }

    #[test]
    fn test_bands_split_by_fraction() {
        let mut bins = vec![0u8; 128];
        bins[..12].fill(255);
        bins[64..].fill(50);

        let data = AudioData::from_bins(bins);
        assert_eq!(data.low, 255.0);
        assert_eq!(data.mid, 0.0);
        assert_eq!(data.high, 50.0);
        assert!((data.average - (12.0 * 255.0 + 64.0 * 50.0) / 128.0).abs() < 1e-4);
    }

    #[test]
    fn test_tiny_and_empty_snapshots_are_guarded() {
        let empty = AudioData::from_bins(Vec::new());
        assert_eq!(empty, AudioData::silent(0));

        // One bin: low and mid buckets are empty
        let single = AudioData::from_bins(vec![200]);
        assert_eq!(single.low, 0.0);
        assert_eq!(single.mid, 0.0);
        assert_eq!(single.high, 200.0);
        assert_eq!(single.average, 200.0);
    }

    #[test]
    fn test_levels_stay_in_byte_range() {
        for bins in [vec![255u8; 128], vec![0u8; 128], (0..=255u8).collect()] {
            let data = AudioData::from_bins(bins);
            for level in [data.average, data.low, data.mid, data.high] {
                assert!((0.0..=255.0).contains(&level));
            }
        }
    }

    #[test]
    fn test_publish_replaces_whole_snapshot() {
        let buffer = FeatureBuffer::new(4);
        let reader = buffer.reader();

        buffer.publish(AudioData::from_bins(vec![10; 4]));
        let held = reader.load();

        buffer.publish(AudioData::from_bins(vec![90; 4]));
        let fresh = reader.load();

        // An old snapshot stays internally consistent after a new publish
        assert_eq!(held.frequency, vec![10; 4]);
        assert_eq!(held.average, 10.0);
        assert_eq!(fresh.frequency, vec![90; 4]);
        assert_eq!(fresh.average, 90.0);
    }

    #[test]
    fn test_reduce_without_context_is_noop() {
        let buffer = FeatureBuffer::new(128);
        let mut reducer = SpectralReducer::new();

        assert!(!reducer.reduce::<OfflineContext>(None, &buffer));
        assert_eq!(reducer.reductions(), 0);
        assert_eq!(*buffer.load(), AudioData::silent(128));
    }

    #[test]
    fn test_reduce_publishes_fixed_length_vector() {
        let mut context = OfflineHost::new()
            .create_context(&EngineConfig::default(), &AnalyserConfig::default())
            .unwrap();
        let buffer = FeatureBuffer::new(128);
        let mut reducer = SpectralReducer::new();

        for _ in 0..3 {
            context.advance(0.02);
            assert!(reducer.reduce(Some(&mut context), &buffer));
            assert_eq!(buffer.load().frequency.len(), 128);
        }
        assert_eq!(reducer.reductions(), 3);
    }
}
