/// Exponential low-pass filter with separate rise and decay coefficients.
///
/// The filter keeps a single smoothed scalar. Inputs above the current state
/// blend with `alpha_rise`, inputs below it with `alpha_decay`, so a signal
/// can be made to track attacks quickly while releasing slowly (or the other
/// way around). The same type smooths the frames-per-second estimate and, on
/// the analysis side, audio level signals.
#[derive(Debug, Clone)]
pub struct ExpFilter {
    alpha_decay: f32,
    alpha_rise: f32,
    current: Option<f32>,
}

impl ExpFilter {
    /// Creates a filter with no initial state. The first call to
    /// [`ExpFilter::update`] adopts its input unchanged.
    pub fn new(alpha_decay: f32, alpha_rise: f32) -> Self {
        Self {
            alpha_decay,
            alpha_rise,
            current: None,
        }
    }

    /// Creates a filter seeded with an initial value.
    pub fn with_value(value: f32, alpha_decay: f32, alpha_rise: f32) -> Self {
        Self {
            alpha_decay,
            alpha_rise,
            current: Some(value),
        }
    }

    /// Feeds one sample into the filter and returns the updated state.
    pub fn update(&mut self, value: f32) -> f32 {
        let next = match self.current {
            None => value,
            Some(current) => {
                let alpha = if value > current {
                    self.alpha_rise
                } else {
                    self.alpha_decay
                };
                alpha * value + (1.0 - alpha) * current
            }
        };
        self.current = Some(next);
        next
    }

    /// Returns the current smoothed value, if any sample has been seen.
    pub fn value(&self) -> Option<f32> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_adopted_unchanged() {
        let mut filter = ExpFilter::new(0.2, 0.8);
        assert_eq!(filter.value(), None);
        assert_eq!(filter.update(42.0), 42.0);
        assert_eq!(filter.value(), Some(42.0));
    }

    #[test]
    fn constant_input_is_a_fixed_point() {
        let mut filter = ExpFilter::with_value(5.0, 0.2, 0.8);
        for _ in 0..10 {
            assert_eq!(filter.update(5.0), 5.0);
        }
    }

    #[test]
    fn rising_input_lands_strictly_between_state_and_input() {
        let mut filter = ExpFilter::with_value(1.0, 0.2, 0.5);
        let next = filter.update(2.0);
        assert!(next > 1.0 && next < 2.0);
        assert_eq!(next, 1.5);
    }

    #[test]
    fn falling_input_uses_the_decay_coefficient() {
        let mut filter = ExpFilter::with_value(2.0, 0.25, 0.9);
        let next = filter.update(1.0);
        assert!((next - 1.75).abs() < 1e-6);
    }
}
