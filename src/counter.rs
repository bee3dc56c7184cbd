/// Threshold-crossing rep counter.
///
/// A rep is counted when the progress value rises to `enter_threshold`
/// while the counter is armed. The counter re-arms once the value falls back
/// to `exit_threshold` or below, so one full down/up cycle yields exactly
/// one increment. The count never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCounter {
    enter_threshold: f64,
    exit_threshold: f64,
    armed: bool,
    count: u32,
}

pub const DEFAULT_ENTER_THRESHOLD: f64 = 0.8;
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.2;

impl ThresholdCounter {
    pub fn new(enter_threshold: f64, exit_threshold: f64) -> Self {
        // An exit above the enter threshold would count every frame
        let exit_threshold = exit_threshold.min(enter_threshold);
        Self {
            enter_threshold,
            exit_threshold,
            armed: true,
            count: 0,
        }
    }

    /// Feed one progress sample and return the running count.
    pub fn count(&mut self, progress: f64) -> u32 {
        if !progress.is_finite() {
            return self.count;
        }
        if self.armed && progress >= self.enter_threshold {
            self.armed = false;
            self.count += 1;
        } else if !self.armed && progress <= self.exit_threshold {
            self.armed = true;
        }
        self.count
    }

    pub fn current(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.armed = true;
        self.count = 0;
    }
}

impl Default for ThresholdCounter {
    fn default() -> Self {
        Self::new(DEFAULT_ENTER_THRESHOLD, DEFAULT_EXIT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_one_rep_per_cycle() {
        let mut counter = ThresholdCounter::default();
        for _ in 0..3 {
            counter.count(0.1);
            counter.count(0.5);
            counter.count(0.9);
            counter.count(0.95);
            counter.count(0.5);
        }
        counter.count(0.1);
        assert_eq!(counter.current(), 3);
    }

    #[test]
    fn hovering_near_the_top_does_not_double_count() {
        let mut counter = ThresholdCounter::default();
        for v in [0.9, 0.7, 0.85, 0.6, 0.9, 0.3, 0.81] {
            counter.count(v);
        }
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn count_is_monotonic() {
        let mut counter = ThresholdCounter::default();
        let mut last = 0;
        for i in 0..200 {
            let v = ((i as f64) * 0.37).sin().abs();
            let c = counter.count(v);
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn ignores_non_finite_samples() {
        let mut counter = ThresholdCounter::default();
        counter.count(f64::NAN);
        counter.count(f64::INFINITY);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn reset_clears_count_and_rearms() {
        let mut counter = ThresholdCounter::default();
        counter.count(0.9);
        counter.reset();
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.count(0.9), 1);
    }

    #[test]
    fn exit_threshold_is_capped_at_enter() {
        let mut counter = ThresholdCounter::new(0.5, 0.9);
        counter.count(0.6);
        counter.count(0.6);
        assert_eq!(counter.current(), 1);
    }
}
