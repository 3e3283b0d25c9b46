//! End-to-end offline render through the public API.

use pulsedeck::audio::{AudioContext, OfflineHost};
use pulsedeck::controller::{PlaybackController, PlaybackState};
use pulsedeck::offline::render_offline;
use pulsedeck::params::GeneratorConfig;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

#[test]
fn test_offline_render_writes_stereo_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("set.wav");
    let config = GeneratorConfig::default();

    let summary = render_offline(&config, StdRng::seed_from_u64(5), 1.5, &path).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.duration() as usize, summary.frames);
    assert!(summary.events_scheduled > 0);
}

#[test]
fn test_custom_tempo_from_toml_speeds_up_pattern() {
    let slow = GeneratorConfig::from_toml_str("[scheduler]\ntempo_bpm = 90.0\n").unwrap();
    let fast = GeneratorConfig::from_toml_str("[scheduler]\ntempo_bpm = 180.0\n").unwrap();

    let count_events = |config: &GeneratorConfig| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        render_offline(config, StdRng::seed_from_u64(9), 3.0, &path)
            .unwrap()
            .events_scheduled
    };

    assert!(count_events(&fast) > count_events(&slow));
}

#[test]
fn test_features_follow_playback_and_freeze_after_stop() {
    let config = GeneratorConfig::default();
    let mut controller =
        PlaybackController::new(OfflineHost::new(), &config, StdRng::seed_from_u64(1));
    let reader = controller.audio_data_ref();
    let mut now = Instant::now();

    assert_eq!(controller.toggle_play(now), PlaybackState::Playing);
    for _ in 0..80 {
        now += Duration::from_millis(25);
        controller.context_mut().unwrap().advance(0.025);
        controller.poll(now);
        controller.on_frame();
    }
    let playing = reader.load();
    assert_eq!(playing.frequency.len(), 128);
    assert!(playing.average > 0.0);

    controller.toggle_play(now);
    let clock = controller.context().unwrap().current_time();
    controller.on_frame();
    let frozen = reader.load();

    // Chain has ended: further frames publish nothing
    for _ in 0..10 {
        controller.context_mut().unwrap().advance(0.025);
        assert!(!controller.on_frame());
    }
    assert_eq!(*reader.load(), *frozen);
    assert_eq!(controller.context().unwrap().current_time(), clock);
}
