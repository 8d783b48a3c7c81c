use crate::{frame::clip, Frame};

/// Visual-effect collaborator. Consumes a mel-bin vector and the "active"
/// flag (false when the volume sits below the configured threshold) and
/// returns the frame to display, with values in roughly `[0, 255]`.
pub trait EffectRenderer {
    fn render(&mut self, mel: &[f32], active: bool) -> Frame;
}

/// Fallback effect that paints the whole strip one colour scaled by the
/// overall mel level, and goes dark when the audio is inactive. Enough to
/// see a strip react without committing to a real effect library.
#[derive(Debug, Clone)]
pub struct SolidLevel {
    led_count: usize,
    colour: (f32, f32, f32),
}

impl SolidLevel {
    pub fn new(led_count: usize, colour: (f32, f32, f32)) -> Self {
        Self { led_count, colour }
    }
}

impl EffectRenderer for SolidLevel {
    fn render(&mut self, mel: &[f32], active: bool) -> Frame {
        let mut frame = Frame::new(self.led_count);
        if !active || mel.is_empty() {
            return frame;
        }
        let level = clip(mel.iter().sum::<f32>() / mel.len() as f32, 0.0, 1.0);
        let (red, green, blue) = self.colour;
        for index in 0..self.led_count {
            frame.set(
                index,
                red * level * 255.0,
                green * level * 255.0,
                blue * level * 255.0,
            );
        }
        frame
    }
}
