//! Look-ahead scheduler: commits sixteenth-note events slightly ahead of the
//! audio clock so host timer jitter never reaches the audio.
//!
//! Each tick walks `next_event_time` forward one sixteenth at a time until it
//! leaves the horizon `clock + schedule_ahead_s`. The caller owns the timer
//! that invokes ticks; this type only owns the musical position.

use rand::Rng;
use tracing::{debug, warn};

use crate::params::{PatternConfig, SchedulerConfig};

/// Voice selected for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Kick,
    HiHat,
    Bass,
}

/// A musical event committed to the audio clock; consumed immediately
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub kind: EventKind,
    /// Absolute audio-clock time (seconds)
    pub start_time: f64,
    /// Pitch for pitched voices (Hz)
    pub note_hz: Option<f32>,
}

/// Musical position of the sequencer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerState {
    /// Audio-clock time of the next unscheduled step (seconds)
    pub next_event_time: f64,
    /// Step within the pattern, in `0..steps_per_pattern`
    pub beat_counter: u32,
}

/// Which voices fire on a given step
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    config: PatternConfig,
}

impl PatternPolicy {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Four-on-the-floor kick, off-beat hat, random bass.
    ///
    /// Appends to `events` so a tick can reuse one buffer.
    pub fn events_for_step<R: Rng + ?Sized>(
        &self,
        step: u32,
        time: f64,
        rng: &mut R,
        events: &mut Vec<ScheduledEvent>,
    ) {
        if step % 4 == 0 {
            events.push(ScheduledEvent {
                kind: EventKind::Kick,
                start_time: time,
                note_hz: None,
            });
        }
        if step % 4 == 2 {
            events.push(ScheduledEvent {
                kind: EventKind::HiHat,
                start_time: time,
                note_hz: None,
            });
        }

        let notes = &self.config.bass_notes_hz;
        if !notes.is_empty() && rng.gen_bool(self.config.bass_probability) {
            let note = notes[rng.gen_range(0..notes.len())];
            events.push(ScheduledEvent {
                kind: EventKind::Bass,
                start_time: time,
                note_hz: Some(note),
            });
        }
    }
}

/// Look-ahead scheduler state machine
#[derive(Debug, Clone)]
pub struct LookAheadScheduler {
    config: SchedulerConfig,
    pattern: PatternPolicy,
    state: SchedulerState,
}

impl LookAheadScheduler {
    pub fn new(config: SchedulerConfig, pattern: PatternConfig) -> Self {
        Self {
            config,
            pattern: PatternPolicy::new(pattern),
            state: SchedulerState {
                next_event_time: 0.0,
                beat_counter: 0,
            },
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Start over from step 0, a short offset after `now`
    pub fn reset(&mut self, now: f64) {
        self.state = SchedulerState {
            next_event_time: now + self.config.start_offset_s,
            beat_counter: 0,
        };
    }

    /// One tick: every event whose step starts before `now + schedule_ahead_s`.
    ///
    /// Returned events never start before `now`. If the timer stalled long
    /// enough that the next step is already in the past, the sequence is
    /// re-anchored at `now` rather than emitting a burst of stale steps.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<ScheduledEvent> {
        if self.state.next_event_time < now {
            warn!(
                behind_s = now - self.state.next_event_time,
                "Scheduler fell behind the audio clock; resyncing"
            );
            self.state.next_event_time = now;
        }

        let horizon = now + self.config.schedule_ahead_s;
        let interval = self.config.step_interval_s();
        // A zero step or an unbounded horizon would never leave the loop
        if !(interval > 0.0 && horizon.is_finite()) {
            warn!(interval, horizon, "Scheduler timing out of range; tick skipped");
            return Vec::new();
        }
        let mut events = Vec::new();
        while self.state.next_event_time < horizon {
            self.pattern.events_for_step(
                self.state.beat_counter,
                self.state.next_event_time,
                rng,
                &mut events,
            );
            self.state.next_event_time += interval;
            self.state.beat_counter =
                (self.state.beat_counter + 1) % self.config.steps_per_pattern;
        }

        if !events.is_empty() {
            debug!(
                count = events.len(),
                beat = self.state.beat_counter,
                "Scheduled events"
            );
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn scheduler() -> LookAheadScheduler {
        LookAheadScheduler::new(SchedulerConfig::default(), PatternConfig::default())
    }

    #[test]
    fn test_sixteen_steps_at_138_bpm() {
        let mut scheduler = scheduler();
        let mut rng = StdRng::seed_from_u64(42);
        scheduler.reset(0.0);
        let t0 = scheduler.state().next_event_time;

        let interval = scheduler.config().step_interval_s();
        assert!((interval - 0.108_70).abs() < 1e-5);

        // 25ms ticks advance at most one sixteenth each
        let mut now = 0.0;
        let mut steps = 0;
        while steps < 16 {
            let before = scheduler.state().next_event_time;
            scheduler.tick(now, &mut rng);
            steps += ((scheduler.state().next_event_time - before) / interval).round() as usize;
            now += 0.025;
        }

        assert_eq!(steps, 16);
        assert_eq!(scheduler.state().beat_counter, 0);
        assert!((scheduler.state().next_event_time - (t0 + 1.739_13)).abs() < 1e-4);
    }

    #[test]
    fn test_no_events_before_horizon_on_first_tick() {
        let mut scheduler = scheduler();
        let mut rng = StdRng::seed_from_u64(1);
        scheduler.reset(5.0);

        // First step sits exactly at the horizon edge
        assert!(scheduler.tick(5.0, &mut rng).is_empty());
        assert_eq!(scheduler.state().beat_counter, 0);
    }

    #[test]
    fn test_timing_invariant_under_jitter() {
        let mut scheduler = scheduler();
        let mut rng = StdRng::seed_from_u64(9);
        let config = SchedulerConfig::default();
        let slack = config.schedule_ahead_s + config.step_interval_s();

        scheduler.reset(0.0);
        let mut now = 0.0;
        for i in 0..2000 {
            // 25ms period with up to 50ms of lateness
            now += 0.025 + (i % 7) as f64 * 0.008;
            for event in scheduler.tick(now, &mut rng) {
                assert!(event.start_time >= now, "{} < {}", event.start_time, now);
                assert!(event.start_time < now + slack);
            }
        }
    }

    #[test]
    fn test_stalled_timer_resyncs_to_clock() {
        let mut scheduler = scheduler();
        let mut rng = StdRng::seed_from_u64(2);
        scheduler.reset(0.0);

        let events = scheduler.tick(10.0, &mut rng);
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.start_time >= 10.0 && e.start_time < 10.1));
        assert!(events.iter().any(|e| e.start_time == 10.0));
    }

    #[test]
    fn test_kick_and_hat_positions() {
        let policy = PatternPolicy::new(PatternConfig::default());
        let mut rng = StdRng::seed_from_u64(5);

        for step in 0..16 {
            let mut events = Vec::new();
            policy.events_for_step(step, 0.0, &mut rng, &mut events);
            let has = |kind| events.iter().any(|e: &ScheduledEvent| e.kind == kind);

            assert_eq!(has(EventKind::Kick), step % 4 == 0, "kick at step {}", step);
            assert_eq!(has(EventKind::HiHat), step % 4 == 2, "hat at step {}", step);
        }
    }

    #[test]
    fn test_bass_probability_converges() {
        let policy = PatternPolicy::new(PatternConfig::default());
        let mut rng = StdRng::seed_from_u64(1234);
        let samples = 10_000;

        let mut fired = 0;
        for i in 0..samples {
            let mut events = Vec::new();
            policy.events_for_step(i % 16, 0.0, &mut rng, &mut events);
            for event in events.iter().filter(|e| e.kind == EventKind::Bass) {
                fired += 1;
                let note = event.note_hz.unwrap();
                assert!([55.0, 65.0, 110.0].contains(&note));
            }
        }

        let rate = fired as f64 / samples as f64;
        assert!((rate - 0.6).abs() < 0.05, "bass rate {}", rate);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let run = |seed| {
            let mut scheduler = scheduler();
            let mut rng = StdRng::seed_from_u64(seed);
            scheduler.reset(0.0);
            (1..100)
                .flat_map(|i| scheduler.tick(i as f64 * 0.025, &mut rng))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(77), run(77));
    }

    #[test]
    fn test_empty_note_set_disables_bass() {
        let policy = PatternPolicy::new(PatternConfig {
            bass_probability: 1.0,
            bass_notes_hz: Vec::new(),
        });
        let mut rng = StdRng::seed_from_u64(0);
        let mut events = Vec::new();
        policy.events_for_step(1, 0.0, &mut rng, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_unbounded_timing_skips_tick() {
        let config = SchedulerConfig {
            tempo_bpm: f64::INFINITY,
            ..Default::default()
        };
        let mut scheduler = LookAheadScheduler::new(config, PatternConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        scheduler.reset(0.0);
        assert!(scheduler.tick(0.5, &mut rng).is_empty());

        let config = SchedulerConfig {
            schedule_ahead_s: f64::INFINITY,
            ..Default::default()
        };
        let mut scheduler = LookAheadScheduler::new(config, PatternConfig::default());
        scheduler.reset(0.0);
        assert!(scheduler.tick(0.5, &mut rng).is_empty());
    }
}
