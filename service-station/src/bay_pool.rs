use crate::error::{Result, StationError, TryAcquireError};
use crate::semaphore::{Acquire, CountingResource, ResourcePermit};

/// The station's service bays, counted by a [`CountingResource`].
///
/// A pump holds one bay permit while it services a car. Occupancy is only
/// the depletion of the counter; bays have no identity of their own.
///
/// Only acquisition, release and the advisory counts are exposed: the pool
/// cannot grow, shrink or be closed after construction.
///
/// # Examples
///
/// ```rust
/// use service_station::BayPool;
///
/// # #[tokio::main]
/// # async fn main() {
/// let bays = BayPool::new(2).unwrap();
/// let bay = bays.acquire().await.unwrap();
/// assert_eq!(bays.available_permits(), 1);
/// assert!(!bays.all_free());
///
/// drop(bay);
/// assert!(bays.all_free());
/// # }
/// ```
#[derive(Debug)]
pub struct BayPool {
    bays: CountingResource,
    capacity: usize,
}

impl BayPool {
    /// Creates a pool of `bay_count` free bays.
    ///
    /// Fails with [`StationError::InvalidCapacity`] if `bay_count` is zero.
    pub fn new(bay_count: usize) -> Result<Self> {
        if bay_count < 1 || bay_count > CountingResource::MAX_PERMITS {
            return Err(StationError::invalid_capacity("bay pool", bay_count));
        }
        Ok(Self {
            bays: CountingResource::new(bay_count),
            capacity: bay_count,
        })
    }

    /// Number of bays the pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if every bay is free. Advisory.
    pub fn all_free(&self) -> bool {
        self.bays.available_permits() == self.capacity
    }

    /// Wait for a free bay. The bay is returned when the permit drops.
    pub fn acquire(&self) -> Acquire<'_> {
        self.bays.acquire()
    }

    /// Take a free bay without waiting.
    pub fn try_acquire(&self) -> std::result::Result<ResourcePermit<'_>, TryAcquireError> {
        self.bays.try_acquire()
    }

    /// Return a bay whose permit was forgotten.
    pub fn release(&self) {
        self.bays.release();
    }

    /// Free bays. Advisory.
    pub fn available_permits(&self) -> usize {
        self.bays.available_permits()
    }

    /// Pumps waiting for a bay. Advisory.
    pub fn waiting(&self) -> usize {
        self.bays.waiting()
    }
}
