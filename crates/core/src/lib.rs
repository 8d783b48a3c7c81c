//! Core library for the LED Visualiser application.
//!
//! The crate implements the multi-board render-and-output pipeline: per-tick
//! orchestration across boards (independent or lock-step "sync" rendering),
//! the smoothed frame-rate estimate, and the device-output layer that turns
//! a floating point RGB frame into the byte/word protocol each physical
//! transport expects. Audio capture, signal processing and effect generation
//! are external collaborators reached through the traits in [`analysis`] and
//! [`effect`].

pub mod analysis;
pub mod board;
pub mod config;
pub mod effect;
pub mod error;
pub mod filter;
pub mod frame;
pub mod gamma;
pub mod output;
pub mod render;

pub use analysis::{AudioFeatures, LevelMeter, SignalProcessor};
pub use board::Board;
pub use config::{BoardSettings, EffectOptions, Settings, Transport};
pub use effect::{EffectRenderer, SolidLevel};
pub use error::{LedVizError, Result};
pub use filter::ExpFilter;
pub use frame::{clip, Frame};
pub use gamma::GammaTable;
pub use output::{
    DeviceOutput, DirectStrip, DriverProvider, Encoding, MemoryDrivers, MemoryStick, MemoryStrip,
    NetworkStrip, SerialStick, StickPort, StripBus,
};
pub use render::{FpsEstimator, Orchestrator, RenderOptions};
