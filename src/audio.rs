//! Procedural techno synthesis and spectral analysis.
//!
//! A look-ahead scheduler commits drum and bass events against the audio
//! clock; a reducer turns analyser snapshots into the feature vector that
//! drives the visuals.

mod engine;
mod fft;
pub mod graph;
mod host;
mod reducer;
mod scheduler;
pub mod synthesis;
mod system;
mod timer;

// Re-export public types
pub use engine::{ContextState, Engine};
pub use fft::{blackman_window, Analyser};
pub use host::{AudioContext, AudioHost, OfflineContext, OfflineHost};
pub use reducer::{AudioData, BandBounds, FeatureBuffer, FeatureReader, SpectralReducer};
pub use scheduler::{EventKind, LookAheadScheduler, PatternPolicy, ScheduledEvent, SchedulerState};
pub use synthesis::EventSynthesizer;
pub use system::{CpalContext, CpalHost};
pub use timer::{FrameLoop, RepeatingTimer};
