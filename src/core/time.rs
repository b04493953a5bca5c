//! Fixed-interval timing

/// Accumulates frame time and reports how many fixed intervals elapsed.
///
/// Frame rate does not change how often the fixed-rate consumer runs: a long
/// frame yields several intervals, a short one may yield none.
#[derive(Clone, Debug)]
pub struct FixedTimestep {
    interval: f32,
    accumulator: f32,
    total_steps: u64,
}

impl FixedTimestep {
    /// Create a timestep running `rate` intervals per second.
    pub fn from_rate(rate: f32) -> Self {
        Self::new(1.0 / rate)
    }

    /// Create a timestep with the given interval in seconds.
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    /// Add `dt` seconds and return the number of whole intervals now due.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt > 0.0 {
            self.accumulator += dt;
        }

        let mut steps = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            steps += 1;
        }
        self.total_steps += steps as u64;
        steps
    }

    /// Drop any partial interval.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Seconds per interval.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Time carried over towards the next interval.
    pub fn remainder(&self) -> f32 {
        self.accumulator
    }

    /// Intervals reported since creation.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frames_accumulate() {
        let mut step = FixedTimestep::new(0.25);
        assert_eq!(step.advance(0.1), 0);
        assert_eq!(step.advance(0.1), 0);
        assert_eq!(step.advance(0.1), 1);
        assert!((step.remainder() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_long_frame_runs_multiple_steps() {
        let mut step = FixedTimestep::new(0.25);
        assert_eq!(step.advance(1.0), 4);
        assert_eq!(step.total_steps(), 4);
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut step = FixedTimestep::new(0.5);
        assert_eq!(step.advance(-3.0), 0);
        assert_eq!(step.remainder(), 0.0);
    }

    #[test]
    fn test_reset_drops_partial() {
        let mut step = FixedTimestep::from_rate(4.0);
        step.advance(0.2);
        step.reset();
        assert_eq!(step.advance(0.1), 0);
    }
}
