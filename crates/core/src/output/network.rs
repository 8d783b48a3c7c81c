use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Frame, GammaTable, LedVizError, Result};

use super::quantise;

/// Write timeout for the strip controller socket. Bounds the only blocking
/// the transport is allowed to do; a slow or absent receiver costs at most
/// this much per tick.
const SEND_TIMEOUT: Duration = Duration::from_millis(5);

/// The indexed encoding addresses LEDs with a single byte.
const INDEXED_MAX_LEDS: usize = 256;
const MAX_PIXELS_PER_PACKET: usize = 255;

/// Wire encoding understood by the strip controller firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One contiguous `R G B` payload per frame, channel-major and
    /// index-minor. The currently active protocol.
    #[default]
    Flat,
    /// Legacy `|i|r|g|b|` framing with at most 255 LEDs per packet. Kept for
    /// receivers still running the older firmware.
    Indexed,
}

/// UDP-addressed strip controller.
///
/// Delivery is best effort: there is no acknowledgement channel, and a
/// dropped datagram is simply superseded by the next tick's frame. Send
/// failures are logged, never propagated.
#[derive(Debug)]
pub struct NetworkStrip {
    addr: SocketAddr,
    socket: UdpSocket,
    led_count: usize,
    max_brightness: u8,
    encoding: Encoding,
    gamma: Option<Arc<GammaTable>>,
}

impl NetworkStrip {
    /// Resolves the controller address and binds the sending socket. Fatal
    /// on resolution failure; runs once at startup.
    pub fn new(
        ip: &str,
        port: u16,
        led_count: usize,
        max_brightness: u8,
        encoding: Encoding,
        gamma: Option<Arc<GammaTable>>,
    ) -> Result<Self> {
        if encoding == Encoding::Indexed && led_count > INDEXED_MAX_LEDS {
            return Err(LedVizError::config(format!(
                "indexed encoding addresses at most {INDEXED_MAX_LEDS} LEDs, got {led_count}"
            )));
        }
        let addr = (ip, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| LedVizError::AddressResolve {
                address: format!("{ip}:{port}"),
            })?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_write_timeout(Some(SEND_TIMEOUT))?;
        Ok(Self {
            addr,
            socket,
            led_count,
            max_brightness,
            encoding,
            gamma,
        })
    }

    /// Quantises, encodes and transmits one frame as one or more datagrams.
    pub fn send(&mut self, frame: &Frame) {
        let len = self.led_count.min(frame.len());
        let pixels = quantise(frame, self.max_brightness, self.gamma.as_deref(), len);
        let result = match self.encoding {
            Encoding::Flat => self
                .socket
                .send_to(&encode_flat(&pixels), self.addr)
                .map(|_| ()),
            Encoding::Indexed => encode_indexed(&pixels)
                .iter()
                .try_for_each(|packet| self.socket.send_to(packet, self.addr).map(|_| ())),
        };
        if let Err(err) = result {
            tracing::warn!(addr = %self.addr, error = %err, "dropped LED frame datagram");
        }
    }
}

/// Serialises pixels as `R0 G0 B0 R1 G1 B1 ...`, one byte per channel.
fn encode_flat(pixels: &[[u8; 3]]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(pixels.len() * 3);
    for pixel in pixels {
        payload.extend_from_slice(pixel);
    }
    payload
}

/// Serialises pixels as `|i|r|g|b|` quads, split into packets of at most
/// [`MAX_PIXELS_PER_PACKET`] LEDs.
fn encode_indexed(pixels: &[[u8; 3]]) -> Vec<Vec<u8>> {
    pixels
        .chunks(MAX_PIXELS_PER_PACKET)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let base = chunk_index * MAX_PIXELS_PER_PACKET;
            let mut packet = Vec::with_capacity(chunk.len() * 4);
            for (offset, [red, green, blue]) in chunk.iter().enumerate() {
                packet.push((base + offset) as u8);
                packet.push(*red);
                packet.push(*green);
                packet.push(*blue);
            }
            packet
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels_3() -> Vec<[u8; 3]> {
        vec![[1, 4, 7], [2, 5, 8], [3, 6, 9]]
    }

    #[test]
    fn flat_encoding_is_channel_major_index_minor() {
        assert_eq!(encode_flat(&pixels_3()), vec![1, 4, 7, 2, 5, 8, 3, 6, 9]);
    }

    #[test]
    fn indexed_encoding_caps_packets_at_255_leds() {
        let pixels = vec![[9, 9, 9]; 256];
        let packets = encode_indexed(&pixels);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].len(), 255 * 4);
        assert_eq!(packets[0][0], 0);
        // The second packet carries the single remaining LED at index 255.
        assert_eq!(packets[1], vec![255, 9, 9, 9]);
    }

    #[test]
    fn indexed_encoding_rejects_oversized_strips() {
        let result = NetworkStrip::new("127.0.0.1", 7777, 300, 255, Encoding::Indexed, None);
        assert!(result.is_err());
    }

    #[test]
    fn unresolvable_address_is_fatal() {
        let result = NetworkStrip::new(
            "definitely-not-a-host.invalid",
            7777,
            3,
            255,
            Encoding::Flat,
            None,
        );
        assert!(matches!(result, Err(LedVizError::AddressResolve { .. })));
    }

    #[test]
    fn sends_one_datagram_per_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut strip = NetworkStrip::new("127.0.0.1", port, 3, 255, Encoding::Flat, None).unwrap();
        let frame = Frame::from_channels(
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        )
        .unwrap();
        strip.send(&frame);

        let mut buffer = [0u8; 64];
        let (received, _) = receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(&buffer[..received], &[1, 4, 7, 2, 5, 8, 3, 6, 9]);
    }

    #[test]
    fn wider_frames_truncate_to_the_strip() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut strip = NetworkStrip::new("127.0.0.1", port, 2, 255, Encoding::Flat, None).unwrap();
        let frame = Frame::from_channels(
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        )
        .unwrap();
        strip.send(&frame);

        let mut buffer = [0u8; 64];
        let (received, _) = receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(received, 6);
    }
}
