use std::io;
use std::sync::Arc;

use crate::{Frame, GammaTable};

use super::quantise;

/// The stick's usable intensity range stops short of full byte range; a
/// hardware limitation kept as-is.
const MAX_INTENSITY: u8 = 250;

/// Serial device behind the RGB stick. `set_led_data` rewrites `data.len()`
/// channel bytes starting at the given channel offset.
pub trait StickPort {
    fn set_led_data(&mut self, offset: usize, data: &[u8]) -> io::Result<()>;
}

/// Serial-addressed RGB stick.
///
/// The device's native wire order is GRB and every send rewrites the full
/// strip; there is no change-suppression on this path.
#[derive(Debug)]
pub struct SerialStick {
    led_count: usize,
    port: Box<dyn StickPort>,
    gamma: Option<Arc<GammaTable>>,
}

impl SerialStick {
    pub fn new(led_count: usize, port: Box<dyn StickPort>, gamma: Option<Arc<GammaTable>>) -> Self {
        Self {
            led_count,
            port,
            gamma,
        }
    }

    pub fn send(&mut self, frame: &Frame) {
        let len = self.led_count.min(frame.len());
        let pixels = quantise(frame, MAX_INTENSITY, self.gamma.as_deref(), len);
        let mut data = Vec::with_capacity(len * 3);
        for [red, green, blue] in &pixels {
            data.push(*green);
            data.push(*red);
            data.push(*blue);
        }
        if let Err(err) = self.port.set_led_data(0, &data) {
            tracing::warn!(error = %err, "stick update failed");
        }
    }
}

impl std::fmt::Debug for dyn StickPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StickPort").finish()
    }
}

/// Memory-backed [`StickPort`] for hosts without a stick attached.
#[derive(Debug, Default)]
pub struct MemoryStick {
    data: Vec<u8>,
}

impl MemoryStick {
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl StickPort for MemoryStick {
    fn set_led_data(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        let end = offset + data.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc as StdArc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingPort {
        sent: StdArc<Mutex<Vec<(usize, Vec<u8>)>>>,
    }

    impl RecordingPort {
        fn last(&self) -> (usize, Vec<u8>) {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StickPort for RecordingPort {
        fn set_led_data(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
            self.sent.lock().unwrap().push((offset, data.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn reorders_channels_to_grb() {
        let port = RecordingPort::default();
        let mut stick = SerialStick::new(2, Box::new(port.clone()), None);
        let frame =
            Frame::from_channels(vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]).unwrap();
        stick.send(&frame);

        let (offset, data) = port.last();
        assert_eq!(offset, 0);
        assert_eq!(data, vec![2, 1, 3, 5, 4, 6]);
    }

    #[test]
    fn clamps_to_the_stick_usable_range() {
        let port = RecordingPort::default();
        let mut stick = SerialStick::new(1, Box::new(port.clone()), None);
        let frame = Frame::from_channels(vec![255.0], vec![251.0], vec![-1.0]).unwrap();
        stick.send(&frame);

        let (_, data) = port.last();
        assert_eq!(data, vec![250, 250, 0]);
    }

    #[test]
    fn every_send_rewrites_the_full_strip() {
        let port = RecordingPort::default();
        let mut stick = SerialStick::new(2, Box::new(port.clone()), None);
        let frame = Frame::new(2);
        stick.send(&frame);
        stick.send(&frame);
        assert_eq!(port.sent.lock().unwrap().len(), 2);
    }
}
