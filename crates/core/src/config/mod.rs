use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::output::Encoding;
use crate::{GammaTable, LedVizError, Result};

/// Top-level settings consumed (not owned) by the pipeline. Loaded once at
/// startup from a JSON file; the sync flag and brightness may be changed at
/// runtime through the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// When set, one reference board drives every strip in lock-step.
    #[serde(default)]
    pub sync: bool,
    /// Global brightness scalar applied to every rendered frame, in `[0, 1]`.
    #[serde(default = "default_brightness")]
    pub brightness: f32,
    /// Volume level below which effects are told the audio is inactive.
    #[serde(default = "default_min_volume")]
    pub min_volume_threshold: f32,
    /// Target frame rate; seeds the FPS estimator so the readout starts sane.
    #[serde(default = "default_fps")]
    pub fps: f32,
    /// Path to the persisted gamma lookup table. Required when any board
    /// enables gamma correction.
    #[serde(default)]
    pub gamma_table_path: Option<PathBuf>,
    /// Per-board configuration, keyed by board name. Iteration order is the
    /// key order, which also fixes the sync-mode tie-break.
    pub devices: BTreeMap<String, BoardSettings>,
}

fn default_brightness() -> f32 {
    1.0
}

fn default_min_volume() -> f32 {
    1e-7
}

fn default_fps() -> f32 {
    60.0
}

impl Settings {
    /// Loads and validates settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the invariants the pipeline relies on. Violations are fatal to
    /// startup, never discovered mid-tick.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(LedVizError::config(format!(
                "brightness {} is outside [0, 1]",
                self.brightness
            )));
        }
        for (name, board) in &self.devices {
            if board.led_count == 0 {
                return Err(LedVizError::InvalidLedCount {
                    board: name.clone(),
                    count: board.led_count,
                });
            }
            if board.gamma_correction && self.gamma_table_path.is_none() {
                return Err(LedVizError::config(format!(
                    "board `{name}` enables gamma correction but no gamma_table_path is set"
                )));
            }
        }
        Ok(())
    }

    /// Loads the shared gamma table when a path is configured.
    pub fn load_gamma(&self) -> Result<Option<Arc<GammaTable>>> {
        match &self.gamma_table_path {
            Some(path) => Ok(Some(Arc::new(GammaTable::load(path)?))),
            None => Ok(None),
        }
    }
}

/// Immutable per-board settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSettings {
    /// Number of LEDs on the strip. Fixed for the board's lifetime.
    pub led_count: usize,
    /// Physical transport the rendered frames are written through.
    pub transport: Transport,
    /// Upper clamp for the UDP transport's intensity values.
    #[serde(default = "default_max_brightness")]
    pub max_brightness: u8,
    /// Whether frames are mapped through the shared gamma table.
    #[serde(default)]
    pub gamma_correction: bool,
    /// Name of the effect currently driving this board.
    #[serde(default)]
    pub current_effect: String,
    /// Effect-specific options, keyed by effect name.
    #[serde(default)]
    pub effect_opts: HashMap<String, EffectOptions>,
}

fn default_max_brightness() -> u8 {
    255
}

impl BoardSettings {
    /// Render delay configured for the board's current effect, if any. The
    /// delay deliberately blocks the render thread as an effect-rate
    /// throttle.
    pub fn render_delay(&self) -> Option<Duration> {
        self.effect_opts
            .get(&self.current_effect)
            .and_then(|opts| opts.delay)
            .map(Duration::from_secs_f32)
    }
}

/// Options attached to one effect. Only the render delay is interpreted by
/// the core; everything else passes through to the effect implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectOptions {
    /// Seconds to block the board's render path per tick.
    #[serde(default)]
    pub delay: Option<f32>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Transport kind and address for one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transport {
    /// UDP-addressed strip controller (ESP8266-class firmware).
    Udp {
        ip: String,
        port: u16,
        #[serde(default)]
        encoding: Encoding,
    },
    /// Directly wired strip driven over PWM/DMA.
    Ws281x {
        pin: u8,
        freq_hz: u32,
        dma: u8,
        #[serde(default)]
        invert: bool,
    },
    /// Serial-addressed RGB stick.
    Blinkstick {
        #[serde(default)]
        serial: Option<String>,
    },
    /// No physical output; frames are discarded.
    Stripless,
}
