//! Device-output layer: converts a floating point RGB [`Frame`] into the
//! exact byte/word protocol each physical transport expects and transmits
//! it. Adding a transport means adding a variant here; the orchestration
//! logic never inspects the kind.

mod direct;
mod network;
mod serial;

pub use direct::{pack, DirectStrip, MemoryStrip, StripBus};
pub use network::{Encoding, NetworkStrip};
pub use serial::{MemoryStick, SerialStick, StickPort};

use std::sync::Arc;

use crate::config::{BoardSettings, Transport};
use crate::{Frame, GammaTable, LedVizError, Result};

/// Polymorphic frame sink. Every variant implements the same `send`
/// contract: clamp, quantise, optionally gamma-correct, encode, transmit.
#[derive(Debug)]
pub enum DeviceOutput {
    Network(NetworkStrip),
    Direct(DirectStrip),
    Serial(SerialStick),
    /// Discards frames; used for stripless operation.
    Null,
}

impl DeviceOutput {
    /// Opens the output described by a board's settings. Fatal on
    /// unresolvable addresses or unavailable drivers; this runs once at
    /// startup.
    pub fn from_settings(
        board: &str,
        settings: &BoardSettings,
        gamma: Option<Arc<GammaTable>>,
        drivers: &mut dyn DriverProvider,
    ) -> Result<Self> {
        let gamma = if settings.gamma_correction {
            match gamma {
                Some(table) => Some(table),
                None => {
                    return Err(LedVizError::config(format!(
                        "board `{board}` enables gamma correction but no table was loaded"
                    )))
                }
            }
        } else {
            None
        };

        let output = match &settings.transport {
            Transport::Udp { ip, port, encoding } => Self::Network(NetworkStrip::new(
                ip,
                *port,
                settings.led_count,
                settings.max_brightness,
                *encoding,
                gamma,
            )?),
            Transport::Ws281x { .. } => Self::Direct(DirectStrip::new(
                settings.led_count,
                drivers.strip_bus(board, settings)?,
                gamma,
            )),
            Transport::Blinkstick { .. } => Self::Serial(SerialStick::new(
                settings.led_count,
                drivers.stick_port(board, settings)?,
                gamma,
            )),
            Transport::Stripless => Self::Null,
        };
        Ok(output)
    }

    /// Encodes and transmits one frame. Transient transport failures are
    /// logged inside the variant and never surface to the render loop.
    pub fn send(&mut self, frame: &Frame) {
        match self {
            Self::Network(strip) => strip.send(frame),
            Self::Direct(strip) => strip.send(frame),
            Self::Serial(stick) => stick.send(frame),
            Self::Null => {}
        }
    }
}

/// Supplies hardware driver handles for transports that are written through
/// an in-process device library rather than a socket. Real deployments
/// implement this over their PWM/DMA and serial stacks.
pub trait DriverProvider {
    fn strip_bus(&mut self, board: &str, settings: &BoardSettings) -> Result<Box<dyn StripBus>>;
    fn stick_port(&mut self, board: &str, settings: &BoardSettings) -> Result<Box<dyn StickPort>>;
}

/// Memory-backed drivers for the strand test and for hosts without LED
/// hardware attached.
#[derive(Debug, Default)]
pub struct MemoryDrivers;

impl DriverProvider for MemoryDrivers {
    fn strip_bus(&mut self, _board: &str, settings: &BoardSettings) -> Result<Box<dyn StripBus>> {
        Ok(Box::new(MemoryStrip::new(settings.led_count)))
    }

    fn stick_port(&mut self, _board: &str, _settings: &BoardSettings) -> Result<Box<dyn StickPort>> {
        Ok(Box::new(MemoryStick::default()))
    }
}

/// Clamps the first `len` columns of a frame to `[0, limit]`, rounds to the
/// nearest integer and applies the gamma lookup when present. `len` is the
/// smaller of the output's LED count and the frame width, so a wider frame
/// truncates and a narrower one leaves trailing LEDs untouched.
pub(crate) fn quantise(
    frame: &Frame,
    limit: u8,
    gamma: Option<&GammaTable>,
    len: usize,
) -> Vec<[u8; 3]> {
    let limit = f32::from(limit);
    let mut pixels = Vec::with_capacity(len);
    for index in 0..len {
        let (red, green, blue) = frame.rgb(index);
        let mut pixel = [
            crate::frame::clip(red, 0.0, limit).round() as u8,
            crate::frame::clip(green, 0.0, limit).round() as u8,
            crate::frame::clip(blue, 0.0, limit).round() as u8,
        ];
        if let Some(table) = gamma {
            pixel = pixel.map(|value| table.correct(value));
        }
        pixels.push(pixel);
    }
    pixels
}
