use std::io;
use std::sync::Arc;

use crate::{Frame, GammaTable};

use super::quantise;

/// Word-addressable hardware buffer behind a directly wired strip. The PWM/
/// DMA driver implements this; `write` stages one packed LED word and `show`
/// flushes the whole buffer to the physical strip.
pub trait StripBus {
    fn write(&mut self, index: usize, word: u32);
    fn show(&mut self) -> io::Result<()>;
}

/// Packs one LED's channels into the strip's word layout: green in bits
/// 16-23, red in bits 8-15, blue in bits 0-7.
pub fn pack(red: u8, green: u8, blue: u8) -> u32 {
    (u32::from(red) << 8) | (u32::from(green) << 16) | u32::from(blue)
}

/// Directly wired strip.
///
/// Hardware writes are index-by-index and cost cycles, so unchanged LEDs are
/// skipped by comparing each post-gamma triple against the previously sent
/// frame. The commit happens exactly once per send regardless of how many
/// LEDs changed, including zero.
#[derive(Debug)]
pub struct DirectStrip {
    led_count: usize,
    bus: Box<dyn StripBus>,
    gamma: Option<Arc<GammaTable>>,
    /// Last transmitted pixel values, post-gamma. Owned exclusively by this
    /// output and updated only after a send.
    prev: Vec<[u8; 3]>,
}

impl DirectStrip {
    pub fn new(led_count: usize, bus: Box<dyn StripBus>, gamma: Option<Arc<GammaTable>>) -> Self {
        Self {
            led_count,
            bus,
            gamma,
            // Seeded with a sentinel so the first send writes every LED.
            prev: vec![[253; 3]; led_count],
        }
    }

    pub fn send(&mut self, frame: &Frame) {
        let len = self.led_count.min(frame.len());
        let pixels = quantise(frame, u8::MAX, self.gamma.as_deref(), len);
        for (index, pixel) in pixels.iter().enumerate() {
            if *pixel == self.prev[index] {
                continue;
            }
            self.bus.write(index, pack(pixel[0], pixel[1], pixel[2]));
        }
        self.prev[..len].copy_from_slice(&pixels);
        if let Err(err) = self.bus.show() {
            tracing::warn!(error = %err, "strip commit failed");
        }
    }
}

impl std::fmt::Debug for dyn StripBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripBus").finish()
    }
}

/// Memory-backed [`StripBus`] for the strand test and for hosts without LED
/// hardware attached.
#[derive(Debug, Default)]
pub struct MemoryStrip {
    words: Vec<u32>,
    commits: u64,
}

impl MemoryStrip {
    pub fn new(led_count: usize) -> Self {
        Self {
            words: vec![0; led_count],
            commits: 0,
        }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl StripBus for MemoryStrip {
    fn write(&mut self, index: usize, word: u32) {
        if let Some(slot) = self.words.get_mut(index) {
            *slot = word;
        }
    }

    fn show(&mut self) -> io::Result<()> {
        self.commits += 1;
        Ok(())
    }
}
