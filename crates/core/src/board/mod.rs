use std::sync::Arc;
use std::thread;

use crate::analysis::{AudioFeatures, SignalProcessor};
use crate::config::BoardSettings;
use crate::effect::EffectRenderer;
use crate::output::{DeviceOutput, DriverProvider};
use crate::{Frame, GammaTable, Result};

/// One board: its immutable settings, its analysis pipeline, its effect and
/// its device output. Produces one frame per tick.
pub struct Board {
    name: String,
    settings: BoardSettings,
    processor: Box<dyn SignalProcessor>,
    effect: Box<dyn EffectRenderer>,
    output: DeviceOutput,
}

impl Board {
    pub fn new(
        name: impl Into<String>,
        settings: BoardSettings,
        processor: Box<dyn SignalProcessor>,
        effect: Box<dyn EffectRenderer>,
        output: DeviceOutput,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            processor,
            effect,
            output,
        }
    }

    /// Builds the board and opens its device output from settings. Runs once
    /// at startup; transport failures here are fatal.
    pub fn from_settings(
        name: impl Into<String>,
        settings: BoardSettings,
        gamma: Option<Arc<GammaTable>>,
        processor: Box<dyn SignalProcessor>,
        effect: Box<dyn EffectRenderer>,
        drivers: &mut dyn DriverProvider,
    ) -> Result<Self> {
        let name = name.into();
        let output = DeviceOutput::from_settings(&name, &settings, gamma, drivers)?;
        Ok(Self::new(name, settings, processor, effect, output))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn led_count(&self) -> usize {
        self.settings.led_count
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub fn output_mut(&mut self) -> &mut DeviceOutput {
        &mut self.output
    }

    /// Runs this board's signal processor over one sample chunk.
    pub fn analyse(&mut self, samples: &[f32]) -> AudioFeatures {
        self.processor.update(samples)
    }

    /// Renders one frame from the analysis result. The effect sees `active`
    /// as false while the volume sits below `min_volume`. If the current
    /// effect configures a delay, the render path blocks for exactly that
    /// long; this throttles the effect rate on purpose and is expected to
    /// stall the shared render thread.
    pub fn render(&mut self, features: &AudioFeatures, min_volume: f32) -> Frame {
        let active = features.vol > min_volume;
        let frame = self.effect.render(&features.mel, active);
        if let Some(delay) = self.settings.render_delay() {
            thread::sleep(delay);
        }
        frame
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name)
            .field("led_count", &self.settings.led_count)
            .finish()
    }
}
