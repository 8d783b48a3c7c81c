//! Per-tick orchestration: decides which boards render, applies the global
//! brightness, drives every device output and keeps the frame-rate estimate.
//!
//! One tick is one audio-capture callback. The capture stage calls
//! [`Orchestrator::on_samples`] with each chunk; `&mut self` guarantees at
//! the type level that no two ticks overlap, which is the invariant the
//! whole pipeline's lock-free ownership story rests on.

use std::time::{Duration, Instant};

use crate::analysis::AudioFeatures;
use crate::board::Board;
use crate::config::Settings;
use crate::ExpFilter;

const FPS_REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Global knobs the orchestrator re-reads every tick. Sync and brightness
/// may be flipped at runtime by a control surface.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub sync: bool,
    pub brightness: f32,
    pub min_volume_threshold: f32,
    pub fps: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sync: false,
            brightness: 1.0,
            min_volume_threshold: 1e-7,
            fps: 60.0,
        }
    }
}

impl From<&Settings> for RenderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            sync: settings.sync,
            brightness: settings.brightness,
            min_volume_threshold: settings.min_volume_threshold,
            fps: settings.fps,
        }
    }
}

/// Smoothed frames-per-second estimate.
///
/// Seeded with the configured target rate so diagnostics start sane instead
/// of climbing from zero.
#[derive(Debug, Clone)]
pub struct FpsEstimator {
    filter: ExpFilter,
    last_tick: Option<Instant>,
}

impl FpsEstimator {
    pub fn new(target_fps: f32) -> Self {
        Self {
            filter: ExpFilter::with_value(target_fps, 0.2, 0.2),
            last_tick: None,
        }
    }

    /// Records one tick and returns the updated estimate.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = self.last_tick.map(|last| now - last);
        self.last_tick = Some(now);
        match elapsed {
            Some(elapsed) => self.update_with(elapsed),
            None => self.current(),
        }
    }

    /// Feeds one measured tick interval into the estimate. A zero interval
    /// leaves the estimate unchanged: the rate is undefined at `dt = 0`.
    pub fn update_with(&mut self, elapsed: Duration) -> f32 {
        if elapsed.is_zero() {
            return self.current();
        }
        self.filter.update(1.0 / elapsed.as_secs_f32())
    }

    pub fn current(&self) -> f32 {
        self.filter.value().unwrap_or(0.0)
    }
}

/// Drives all boards once per audio chunk.
#[derive(Debug)]
pub struct Orchestrator {
    boards: Vec<Board>,
    options: RenderOptions,
    fps: FpsEstimator,
    last_fps_report: Option<Instant>,
}

impl Orchestrator {
    pub fn new(boards: Vec<Board>, options: RenderOptions) -> Self {
        let fps = FpsEstimator::new(options.fps);
        Self {
            boards,
            options,
            fps,
            last_fps_report: None,
        }
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Switches between sync and independent rendering. Takes effect on the
    /// next tick.
    pub fn set_sync(&mut self, sync: bool) {
        self.options.sync = sync;
    }

    /// Sets the global brightness scalar, clamped into `[0, 1]`.
    pub fn set_brightness(&mut self, brightness: f32) {
        self.options.brightness = crate::frame::clip(brightness, 0.0, 1.0);
    }

    /// Latest smoothed frames-per-second estimate.
    pub fn fps(&self) -> f32 {
        self.fps.current()
    }

    /// Index of the sync-mode reference board: the largest LED count, first
    /// board wins a tie.
    fn reference_board(&self) -> Option<usize> {
        let mut reference: Option<usize> = None;
        for (index, board) in self.boards.iter().enumerate() {
            let larger = match reference {
                Some(current) => board.led_count() > self.boards[current].led_count(),
                None => true,
            };
            if larger {
                reference = Some(index);
            }
        }
        reference
    }

    /// Audio-callback entry point; one invocation is one tick. Runs every
    /// board's analysis, renders per the current sync policy, scales by the
    /// global brightness, transmits, and returns the updated FPS estimate.
    ///
    /// Must not be re-entered concurrently; transient transport failures are
    /// logged by the outputs and never abort the tick.
    pub fn on_samples(&mut self, samples: &[f32]) -> f32 {
        let features: Vec<AudioFeatures> = self
            .boards
            .iter_mut()
            .map(|board| board.analyse(samples))
            .collect();

        let min_volume = self.options.min_volume_threshold;
        let brightness = self.options.brightness;

        if self.options.sync {
            if let Some(reference) = self.reference_board() {
                let mut frame = self.boards[reference].render(&features[reference], min_volume);
                frame.scale(brightness);
                for board in &mut self.boards {
                    board.output_mut().send(&frame);
                }
            }
        } else {
            for (board, features) in self.boards.iter_mut().zip(&features) {
                let mut frame = board.render(features, min_volume);
                frame.scale(brightness);
                board.output_mut().send(&frame);
            }
        }

        let fps = self.fps.tick();
        self.report_fps(fps);
        fps
    }

    /// Surfaces the FPS estimate at most every half second.
    fn report_fps(&mut self, fps: f32) {
        let now = Instant::now();
        let due = self
            .last_fps_report
            .map(|last| now - last >= FPS_REPORT_INTERVAL)
            .unwrap_or(true);
        if due {
            tracing::debug!(fps, "render rate");
            self.last_fps_report = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::analysis::SignalProcessor;
    use crate::config::BoardSettings;
    use crate::effect::EffectRenderer;
    use crate::output::{DeviceOutput, SerialStick, StickPort};
    use crate::Frame;

    struct FixedVolume(f32);

    impl SignalProcessor for FixedVolume {
        fn update(&mut self, _samples: &[f32]) -> AudioFeatures {
            AudioFeatures {
                mel: vec![self.0; 4],
                vol: self.0,
            }
        }
    }

    /// Renders red = LED index and counts invocations.
    #[derive(Clone, Default)]
    struct GradientEffect {
        led_count: usize,
        calls: Arc<Mutex<usize>>,
    }

    impl GradientEffect {
        fn new(led_count: usize) -> Self {
            Self {
                led_count,
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl EffectRenderer for GradientEffect {
        fn render(&mut self, _mel: &[f32], _active: bool) -> Frame {
            *self.calls.lock().unwrap() += 1;
            let mut frame = Frame::new(self.led_count);
            for index in 0..self.led_count {
                frame.set(index, index as f32, 0.0, 0.0);
            }
            frame
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPort {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RecordingPort {
        fn last(&self) -> Vec<u8> {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StickPort for RecordingPort {
        fn set_led_data(&mut self, _offset: usize, data: &[u8]) -> io::Result<()> {
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    fn stripless(led_count: usize) -> BoardSettings {
        serde_json::from_str(&format!(
            r#"{{"led_count": {led_count}, "transport": {{"kind": "stripless"}}}}"#
        ))
        .unwrap()
    }

    fn recording_board(
        name: &str,
        led_count: usize,
        effect: GradientEffect,
        port: RecordingPort,
    ) -> Board {
        Board::new(
            name,
            stripless(led_count),
            Box::new(FixedVolume(1.0)),
            Box::new(effect),
            DeviceOutput::Serial(SerialStick::new(led_count, Box::new(port), None)),
        )
    }

    fn options(sync: bool) -> RenderOptions {
        RenderOptions {
            sync,
            brightness: 1.0,
            min_volume_threshold: 0.1,
            fps: 60.0,
        }
    }

    #[test]
    fn sync_mode_broadcasts_the_largest_board() {
        let effect_a = GradientEffect::new(30);
        let effect_b = GradientEffect::new(60);
        let port_a = RecordingPort::default();
        let port_b = RecordingPort::default();

        let boards = vec![
            recording_board("a", 30, effect_a.clone(), port_a.clone()),
            recording_board("b", 60, effect_b.clone(), port_b.clone()),
        ];
        let mut orchestrator = Orchestrator::new(boards, options(true));
        orchestrator.on_samples(&[0.5; 16]);

        // Only the reference board rendered.
        assert_eq!(effect_a.calls(), 0);
        assert_eq!(effect_b.calls(), 1);

        // The follower received the reference frame truncated to 30 LEDs;
        // the stick wire order is GRB, so red lands in the middle byte.
        let data_a = port_a.last();
        assert_eq!(data_a.len(), 30 * 3);
        for index in 0..30 {
            assert_eq!(
                &data_a[index * 3..index * 3 + 3],
                &[0, index as u8, 0],
                "LED {index}"
            );
        }
        assert_eq!(port_b.last().len(), 60 * 3);
    }

    #[test]
    fn sync_mode_ties_break_to_the_first_board() {
        let effect_a = GradientEffect::new(30);
        let effect_b = GradientEffect::new(30);
        let boards = vec![
            recording_board("a", 30, effect_a.clone(), RecordingPort::default()),
            recording_board("b", 30, effect_b.clone(), RecordingPort::default()),
        ];
        let mut orchestrator = Orchestrator::new(boards, options(true));
        orchestrator.on_samples(&[0.5; 16]);

        assert_eq!(effect_a.calls(), 1);
        assert_eq!(effect_b.calls(), 0);
    }

    #[test]
    fn independent_mode_renders_every_board() {
        let effect_a = GradientEffect::new(8);
        let effect_b = GradientEffect::new(16);
        let boards = vec![
            recording_board("a", 8, effect_a.clone(), RecordingPort::default()),
            recording_board("b", 16, effect_b.clone(), RecordingPort::default()),
        ];
        let mut orchestrator = Orchestrator::new(boards, options(false));
        orchestrator.on_samples(&[0.5; 16]);

        assert_eq!(effect_a.calls(), 1);
        assert_eq!(effect_b.calls(), 1);
    }

    #[test]
    fn sync_policy_is_re_evaluated_each_tick() {
        let effect_a = GradientEffect::new(8);
        let effect_b = GradientEffect::new(16);
        let boards = vec![
            recording_board("a", 8, effect_a.clone(), RecordingPort::default()),
            recording_board("b", 16, effect_b.clone(), RecordingPort::default()),
        ];
        let mut orchestrator = Orchestrator::new(boards, options(true));
        orchestrator.on_samples(&[0.5; 16]);
        assert_eq!(effect_a.calls(), 0);

        orchestrator.set_sync(false);
        orchestrator.on_samples(&[0.5; 16]);
        assert_eq!(effect_a.calls(), 1);
        assert_eq!(effect_b.calls(), 2);
    }

    #[test]
    fn global_brightness_scales_the_transmitted_frame() {
        let effect = GradientEffect::new(8);
        let port = RecordingPort::default();
        let boards = vec![recording_board("a", 8, effect, port.clone())];
        let mut orchestrator = Orchestrator::new(
            boards,
            RenderOptions {
                brightness: 0.5,
                ..options(false)
            },
        );
        orchestrator.on_samples(&[0.5; 16]);

        // Red = 6 at index 6, halved to 3.
        let data = port.last();
        assert_eq!(data[6 * 3 + 1], 3);
    }

    #[test]
    fn zero_elapsed_time_keeps_the_previous_estimate() {
        let mut fps = FpsEstimator::new(60.0);
        assert_eq!(fps.current(), 60.0);
        assert_eq!(fps.update_with(Duration::ZERO), 60.0);

        let updated = fps.update_with(Duration::from_millis(20));
        assert!(updated < 60.0 && updated > 50.0);
        assert_eq!(fps.update_with(Duration::ZERO), updated);
    }

    #[test]
    fn tick_returns_a_positive_estimate() {
        let mut fps = FpsEstimator::new(60.0);
        let first = fps.tick();
        assert_eq!(first, 60.0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(fps.tick() > 0.0);
    }
}
