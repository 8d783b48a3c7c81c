use serde::{Deserialize, Serialize};

use crate::ExpFilter;

/// Per-board analysis result handed from the signal processor to the effect:
/// a mel-bin vector plus an overall volume estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub mel: Vec<f32>,
    pub vol: f32,
}

/// Signal-processing collaborator. Consumes one raw sample chunk per tick
/// and returns the features driving that board's effect. Implementations own
/// whatever spectral state they need; the pipeline assumes nothing is shared
/// across boards.
pub trait SignalProcessor {
    fn update(&mut self, samples: &[f32]) -> AudioFeatures;
}

/// Minimal processor reporting the smoothed mean absolute sample level,
/// replicated across a fixed number of bins. Stands in where a full
/// mel-spectrum pipeline is not wired up, and keeps the orchestrator
/// exercisable end-to-end.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    bands: usize,
    filter: ExpFilter,
}

impl LevelMeter {
    pub fn new(bands: usize) -> Self {
        Self {
            bands,
            filter: ExpFilter::new(0.2, 0.9),
        }
    }
}

impl SignalProcessor for LevelMeter {
    fn update(&mut self, samples: &[f32]) -> AudioFeatures {
        let level = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|sample| sample.abs()).sum::<f32>() / samples.len() as f32
        };
        let vol = self.filter.update(level);
        AudioFeatures {
            mel: vec![vol; self.bands],
            vol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_yields_zero_volume() {
        let mut meter = LevelMeter::new(4);
        let features = meter.update(&[0.0; 16]);
        assert_eq!(features.vol, 0.0);
        assert_eq!(features.mel.len(), 4);
    }

    #[test]
    fn signal_raises_the_volume_estimate() {
        let mut meter = LevelMeter::new(2);
        let features = meter.update(&[0.5; 16]);
        assert!(features.vol > 0.0);
        assert!(features.mel.iter().all(|bin| *bin == features.vol));
    }

    #[test]
    fn empty_chunks_are_tolerated() {
        let mut meter = LevelMeter::new(2);
        let features = meter.update(&[]);
        assert_eq!(features.vol, 0.0);
    }
}
