//! Error types for the audio engine, configuration and rendering.

use thiserror::Error;

/// Failures from the host audio subsystem and the synthesis graph
#[derive(Error, Debug)]
pub enum AudioError {
    /// No output device on the default host
    #[error("no audio output device found")]
    NoOutputDevice,

    /// Device refused to report a usable configuration
    #[error("failed to get audio config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to pause audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The platform declined to create an audio context (e.g. pending user gesture)
    #[error("audio context creation refused: {0}")]
    ContextRefused(String),

    /// A signal graph could not be assembled
    #[error("invalid signal graph: {0}")]
    Graph(String),

    /// WAV capture failed
    #[error("recording failed: {0}")]
    Recording(#[from] hound::Error),
}

/// Failures while loading or validating a [`crate::params::GeneratorConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameter: {0}")]
    Invalid(String),
}

/// Failures while setting up the GPU visualizer
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    /// A captured frame could not be written
    #[error("failed to save frame: {0}")]
    Capture(#[from] image::ImageError),
}
