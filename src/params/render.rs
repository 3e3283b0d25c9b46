//! Window and recording configuration.

use std::path::PathBuf;

/// Visualizer window configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Decay rate of the beat flash (1/seconds)
    pub beat_flash_decay: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            beat_flash_decay: 8.0,
        }
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames and audio
    pub output_dir: PathBuf,

    /// Frame rate the capture is paced at (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: PathBuf::from("recording"),
            fps: 60,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs.max(0.0) * self.fps as f32).ceil() as usize
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    pub fn frame_path(&self, frame: usize) -> PathBuf {
        self.frames_dir().join(format!("frame_{:05}.png", frame))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join("audio.wav")
    }
}
