use crate::error::{Result, StationError};
use rand::Rng;
use std::time::Duration;

/// An inclusive range of durations, sampled uniformly.
///
/// Used for how long a pump services a car and how far apart cars arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    min: Duration,
    max: Duration,
}

impl DurationRange {
    /// Create a range `[min, max]`.
    ///
    /// `what` names the setting in the error returned when `max < min`.
    pub fn new(what: &'static str, min: Duration, max: Duration) -> Result<Self> {
        if max < min {
            return Err(StationError::InvalidRange {
                what,
                min_ms: min.as_millis(),
                max_ms: max.as_millis(),
            });
        }
        Ok(Self { min, max })
    }

    /// Create a range from millisecond bounds.
    pub fn from_millis(what: &'static str, min_ms: u64, max_ms: u64) -> Result<Self> {
        Self::new(what, Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// A range that always yields `duration`.
    pub const fn fixed(duration: Duration) -> Self {
        Self {
            min: duration,
            max: duration,
        }
    }

    /// Lower bound.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a duration uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Default number of waiting slots.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Default number of pumps.
pub const DEFAULT_PUMPS: usize = 3;

/// Default number of cars generated; `0` means continuous arrivals.
pub const DEFAULT_CARS: usize = 10;

/// Default service time: 2 to 6 seconds.
pub const DEFAULT_SERVICE_TIME: DurationRange = DurationRange {
    min: Duration::from_secs(2),
    max: Duration::from_secs(6),
};

/// Default gap between arrivals: 1 to 2 seconds.
pub const DEFAULT_ARRIVAL_INTERVAL: DurationRange = DurationRange {
    min: Duration::from_secs(1),
    max: Duration::from_secs(2),
};

/// Configuration for a station run.
///
/// The bay count defaults to the pump count.
///
/// # Examples
///
/// ```rust
/// use service_station::StationConfig;
///
/// let config = StationConfig::new()
///     .queue_capacity(2)
///     .pumps(3)
///     .bays(1)
///     .cars(3);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.bay_count(), 1);
/// assert!(!config.is_continuous());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub(crate) queue_capacity: usize,
    pub(crate) pumps: usize,
    pub(crate) bays: Option<usize>,
    pub(crate) cars: usize,
    pub(crate) service_time: DurationRange,
    pub(crate) arrival_interval: DurationRange,
}

impl StationConfig {
    /// Create a configuration with the default settings.
    pub fn new() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pumps: DEFAULT_PUMPS,
            bays: None,
            cars: DEFAULT_CARS,
            service_time: DEFAULT_SERVICE_TIME,
            arrival_interval: DEFAULT_ARRIVAL_INTERVAL,
        }
    }

    /// Set the number of waiting slots.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the number of pumps.
    pub fn pumps(mut self, pumps: usize) -> Self {
        self.pumps = pumps;
        self
    }

    /// Set the number of bays. Without this the pump count is used.
    pub fn bays(mut self, bays: usize) -> Self {
        self.bays = Some(bays);
        self
    }

    /// Set how many cars to generate; `0` keeps generating until stopped.
    pub fn cars(mut self, cars: usize) -> Self {
        self.cars = cars;
        self
    }

    /// Set the service time range.
    pub fn service_time(mut self, range: DurationRange) -> Self {
        self.service_time = range;
        self
    }

    /// Set the arrival interval range.
    pub fn arrival_interval(mut self, range: DurationRange) -> Self {
        self.arrival_interval = range;
        self
    }

    /// Waiting slots.
    pub fn waiting_slots(&self) -> usize {
        self.queue_capacity
    }

    /// Pump count.
    pub fn pump_count(&self) -> usize {
        self.pumps
    }

    /// Bay count, falling back to the pump count.
    pub fn bay_count(&self) -> usize {
        self.bays.unwrap_or(self.pumps)
    }

    /// Number of cars to generate.
    pub fn car_count(&self) -> usize {
        self.cars
    }

    /// `true` when cars keep arriving until the station is stopped.
    pub fn is_continuous(&self) -> bool {
        self.cars == 0
    }

    /// Service time range.
    pub fn service_time_range(&self) -> DurationRange {
        self.service_time
    }

    /// Arrival interval range.
    pub fn arrival_interval_range(&self) -> DurationRange {
        self.arrival_interval
    }

    /// Check every count is at least one.
    ///
    /// Returns the first [`StationError::InvalidCapacity`] found.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity < 1 {
            return Err(StationError::invalid_capacity("work queue", self.queue_capacity));
        }
        if self.pumps < 1 {
            return Err(StationError::invalid_capacity("pumps", self.pumps));
        }
        if self.bay_count() < 1 {
            return Err(StationError::invalid_capacity("bay pool", self.bay_count()));
        }
        Ok(())
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StationConfig::default();
        assert_eq!(config.waiting_slots(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.pump_count(), DEFAULT_PUMPS);
        assert_eq!(config.bay_count(), DEFAULT_PUMPS);
        assert_eq!(config.car_count(), DEFAULT_CARS);
        assert_eq!(config.service_time_range(), DEFAULT_SERVICE_TIME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bays_override_pumps() {
        let config = StationConfig::new().pumps(4).bays(2);
        assert_eq!(config.pump_count(), 4);
        assert_eq!(config.bay_count(), 2);
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(matches!(
            StationConfig::new().queue_capacity(0).validate(),
            Err(StationError::InvalidCapacity { resource: "work queue", .. })
        ));
        assert!(matches!(
            StationConfig::new().pumps(0).validate(),
            Err(StationError::InvalidCapacity { resource: "pumps", .. })
        ));
        assert!(matches!(
            StationConfig::new().bays(0).validate(),
            Err(StationError::InvalidCapacity { resource: "bay pool", .. })
        ));
    }

    #[test]
    fn test_continuous_mode() {
        assert!(StationConfig::new().cars(0).is_continuous());
        assert!(!StationConfig::new().cars(1).is_continuous());
    }

    #[test]
    fn test_range_validation() {
        assert!(DurationRange::from_millis("service time", 10, 5).is_err());
        let range = DurationRange::from_millis("service time", 5, 10).unwrap();
        for _ in 0..100 {
            let sampled = range.sample();
            assert!(sampled >= range.min() && sampled <= range.max());
        }
    }

    #[test]
    fn test_fixed_range() {
        let range = DurationRange::fixed(Duration::from_millis(3));
        assert_eq!(range.sample(), Duration::from_millis(3));
    }
}
