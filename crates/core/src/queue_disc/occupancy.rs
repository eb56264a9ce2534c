//! Time-weighted average of queue occupancy.

/// Cumulative time-weighted mean anchored at time zero.
///
/// Each sample is weighted by the simulated time that elapsed since the
/// previous sample, so the average answers "how full was the queue, on
/// average, since the start". Samples that do not move the clock forward
/// are ignored, which keeps the update free of zero or negative divisors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OccupancyStatistics {
    average: f64,
    last_update: f64,
}

impl OccupancyStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `occupancy` observed at `now` (seconds) into the average.
    ///
    /// Returns `false` when the sample was ignored because no time elapsed.
    pub fn sample(&mut self, now: f64, occupancy: u64) -> bool {
        let elapsed = now - self.last_update;
        if elapsed.is_nan() || elapsed <= 0.0 {
            return false;
        }
        self.average = (self.last_update * self.average + elapsed * occupancy as f64) / now;
        self.last_update = now;
        true
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    /// Time of the last sample that moved the average.
    pub fn last_update(&self) -> f64 {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let stats = OccupancyStatistics::new();
        assert_eq!(stats.average(), 0.0);
        assert_eq!(stats.last_update(), 0.0);
    }

    #[test]
    fn test_time_weighted_mean() {
        let mut stats = OccupancyStatistics::new();
        assert!(!stats.sample(0.0, 0));
        assert!(stats.sample(2.0, 1));
        assert!((stats.average() - 1.0).abs() < 1e-12);
        assert!(stats.sample(5.0, 3));
        assert!((stats.average() - 2.2).abs() < 1e-12);
        assert_eq!(stats.last_update(), 5.0);
    }

    #[test]
    fn test_same_timestamp_is_idempotent() {
        let mut stats = OccupancyStatistics::new();
        stats.sample(1.0, 4);
        let before = stats.average();
        assert!(!stats.sample(1.0, 100));
        assert_eq!(stats.average(), before);
    }

    #[test]
    fn test_backwards_clock_ignored() {
        let mut stats = OccupancyStatistics::new();
        stats.sample(3.0, 2);
        assert!(!stats.sample(2.0, 50));
        assert_eq!(stats.average(), 2.0);
        assert_eq!(stats.last_update(), 3.0);
    }

    #[test]
    fn test_nan_time_ignored() {
        let mut stats = OccupancyStatistics::new();
        assert!(!stats.sample(f64::NAN, 9));
        assert_eq!(stats.average(), 0.0);
    }
}
