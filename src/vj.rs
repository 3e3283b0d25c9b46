//! Performer-facing visual state: scene selection and effect switches.

use clap::ValueEnum;

/// Scene rendered by the visualizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VisualMode {
    #[default]
    Studio,
    Tunnel,
    Grid,
}

impl VisualMode {
    pub fn next(self) -> Self {
        match self {
            VisualMode::Studio => VisualMode::Tunnel,
            VisualMode::Tunnel => VisualMode::Grid,
            VisualMode::Grid => VisualMode::Studio,
        }
    }

    /// Index passed to the shader
    pub fn index(self) -> u32 {
        match self {
            VisualMode::Studio => 0,
            VisualMode::Tunnel => 1,
            VisualMode::Grid => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VisualMode::Studio => "STUDIO",
            VisualMode::Tunnel => "TUNNEL",
            VisualMode::Grid => "GRID",
        }
    }
}

/// Glitch slider resolution
const GLITCH_STEP: f32 = 0.1;

/// Hue rotation per color-shift step (turns)
const COLOR_SHIFT_STEP: f32 = 0.125;

/// Visual switches toggled from the keyboard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VjState {
    pub visual_mode: VisualMode,

    /// Glitch strength in [0, 1]; 0 disables the effect
    pub glitch_intensity: f32,

    /// Hue rotation in [0, 1) turns
    pub color_shift: f32,

    pub pixelate: bool,

    pub strobe: bool,
}

impl VjState {
    pub fn with_mode(visual_mode: VisualMode) -> Self {
        Self {
            visual_mode,
            ..Self::default()
        }
    }

    pub fn cycle_mode(&mut self) {
        self.visual_mode = self.visual_mode.next();
    }

    /// Raise glitch by one slider step, wrapping past full back to off
    pub fn step_glitch(&mut self) {
        let steps = (self.glitch_intensity / GLITCH_STEP).round() as u32 + 1;
        self.glitch_intensity = if steps as f32 * GLITCH_STEP > 1.0 + f32::EPSILON {
            0.0
        } else {
            steps as f32 * GLITCH_STEP
        };
    }

    pub fn step_color_shift(&mut self) {
        self.color_shift = (self.color_shift + COLOR_SHIFT_STEP).fract();
    }

    pub fn toggle_pixelate(&mut self) {
        self.pixelate = !self.pixelate;
    }

    pub fn toggle_strobe(&mut self) {
        self.strobe = !self.strobe;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_initial_scene() {
        let state = VjState::default();
        assert_eq!(state.visual_mode, VisualMode::Studio);
        assert_eq!(state.glitch_intensity, 0.0);
        assert!(!state.pixelate);
        assert!(!state.strobe);
    }

    #[test]
    fn test_mode_cycles_through_all_scenes() {
        let mut state = VjState::default();
        state.cycle_mode();
        assert_eq!(state.visual_mode, VisualMode::Tunnel);
        state.cycle_mode();
        assert_eq!(state.visual_mode, VisualMode::Grid);
        state.cycle_mode();
        assert_eq!(state.visual_mode, VisualMode::Studio);
    }

    #[test]
    fn test_glitch_steps_then_wraps_to_off() {
        let mut state = VjState::default();
        for _ in 0..10 {
            state.step_glitch();
        }
        assert!((state.glitch_intensity - 1.0).abs() < 1e-5);

        state.step_glitch();
        assert_eq!(state.glitch_intensity, 0.0);
    }

    #[test]
    fn test_color_shift_stays_below_one_turn() {
        let mut state = VjState::default();
        for _ in 0..20 {
            state.step_color_shift();
            assert!((0.0..1.0).contains(&state.color_shift));
        }
    }

    #[test]
    fn test_toggles_flip() {
        let mut state = VjState::with_mode(VisualMode::Grid);
        state.toggle_pixelate();
        state.toggle_strobe();
        assert!(state.pixelate && state.strobe);
        state.toggle_strobe();
        assert!(!state.strobe);
        assert_eq!(state.visual_mode.index(), 2);
    }
}
