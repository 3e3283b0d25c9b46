//! Pulsedeck - procedural techno with an audio-reactive visualizer
//!
//! A look-ahead sequencer plays four-on-the-floor techno on the audio clock;
//! the spectrum of the mix drives three line-art scenes.

use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use pulsedeck::{
    audio::CpalHost,
    cli::Args,
    controller::{PlaybackController, PlaybackState},
    error::RenderError,
    offline,
    params::{GeneratorConfig, RecordingConfig, RenderConfig},
    rendering::RenderSystem,
    visuals::{beat_flash, VisualizerUniforms},
    vj::{VisualMode, VjState},
};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio
    controller: PlaybackController<CpalHost>,

    // Visual state
    vj: VjState,
    render_config: RenderConfig,
    autoplay: bool,

    // Recording
    recording: Option<RecordingConfig>,
    frame_count: usize,

    // Time tracking
    start_time: Instant,
}

impl App {
    fn new(args: &Args, config: &GeneratorConfig, recording: Option<RecordingConfig>) -> Self {
        let controller =
            PlaybackController::new(CpalHost::new(recording.clone()), config, args.rng());

        Self {
            window: None,
            render_system: None,
            controller,
            vj: VjState::with_mode(args.mode),
            render_config: RenderConfig::default(),
            autoplay: args.autoplay || recording.is_some(),
            recording,
            frame_count: 0,
            start_time: Instant::now(),
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let window_attributes = Window::default_attributes()
            .with_title("Pulsedeck")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.recording.is_some(),
        ))?;

        self.window = Some(window);
        self.render_system = Some(render_system);
        Ok(())
    }

    fn toggle_play(&mut self) {
        match self.controller.toggle_play(Instant::now()) {
            PlaybackState::Playing => info!("Playing"),
            PlaybackState::Stopped => info!("Stopped"),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => self.toggle_play(),
            KeyCode::Digit1 => self.vj.visual_mode = VisualMode::Studio,
            KeyCode::Digit2 => self.vj.visual_mode = VisualMode::Tunnel,
            KeyCode::Digit3 => self.vj.visual_mode = VisualMode::Grid,
            KeyCode::KeyM => self.vj.cycle_mode(),
            KeyCode::KeyG => self.vj.step_glitch(),
            KeyCode::KeyC => self.vj.step_color_shift(),
            KeyCode::KeyP => self.vj.toggle_pixelate(),
            KeyCode::KeyS => self.vj.toggle_strobe(),
            _ => return,
        }
        info!(
            mode = self.vj.visual_mode.label(),
            glitch = self.vj.glitch_intensity,
            color_shift = self.vj.color_shift,
            pixelate = self.vj.pixelate,
            strobe = self.vj.strobe,
            "VJ state"
        );
    }

    /// Render a single frame; returns false once a recording is complete
    fn render_frame(&mut self) -> bool {
        // Per-frame reduction runs before the visuals read the buffer
        self.controller.on_frame();

        let Some(render_system) = self.render_system.as_mut() else {
            return true;
        };

        let time_s = self.start_time.elapsed().as_secs_f32();
        let flash = self
            .controller
            .audio_time()
            .map(|now| {
                beat_flash(
                    now,
                    self.controller.sounding_beat_time(),
                    self.render_config.beat_flash_decay,
                )
            })
            .unwrap_or(0.0);

        let features = self.controller.audio_data_ref().load();
        let uniforms = VisualizerUniforms::from_features(
            &features,
            &self.vj,
            time_s,
            flash,
            render_system.aspect(),
        );
        render_system.update_uniforms(&uniforms);

        let capture_path = self
            .recording
            .as_ref()
            .map(|recording| recording.frame_path(self.frame_count));
        if let Err(e) = render_system.render(capture_path.as_deref()) {
            warn!("Render error: {:?}", e);
        }
        self.frame_count += 1;

        match &self.recording {
            Some(recording) if self.frame_count >= recording.total_frames() => {
                info!(frames = self.frame_count, "Recording complete");
                false
            }
            _ => true,
        }
    }

    fn finish(&mut self) {
        self.controller.stop();
        if let Some(context) = self.controller.context_mut() {
            if let Err(e) = context.finish_recording() {
                error!("Failed to finalize audio recording: {}", e);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.controller.poll(Instant::now());

        if let Some(window) = &self.window {
            window.request_redraw();
        }

        match self.controller.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_window(event_loop) {
            error!("Failed to initialize visualizer: {}", e);
            event_loop.exit();
            return;
        }

        info!("Pulsedeck is running");
        info!("Space: play/stop | 1/2/3/M: scene | G: glitch | C: color");
        info!("P: pixelate | S: strobe | Esc: quit");

        if self.autoplay {
            self.toggle_play();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if !self.render_frame() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.finish();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    if let (Some(seconds), Some(output)) = (args.offline, args.output.as_deref()) {
        info!("Rendering {}s offline to {}", seconds, output.display());
        offline::render_offline(&config, args.rng(), seconds, output)?;
        return Ok(());
    }

    let recording = args.create_recording_config()?;
    if let Some(recording) = &recording {
        info!(
            "Recording {}s ({} frames) to {}",
            recording.duration_secs,
            recording.total_frames(),
            recording.output_dir.display()
        );
    }

    let mut app = App::new(&args, &config, recording);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
