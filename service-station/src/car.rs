//! Cars: the work items, and their producer side.

use crate::error::Result;
use crate::work_queue::BoundedWorkQueue;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A car waiting to be serviced.
///
/// Immutable once created. Ownership moves into the queue on arrival and out
/// to the pump that dequeues it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Car {
    id: u64,
    name: String,
}

impl Car {
    /// Create car number `id`, named `"Car {id}"`.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("Car {id}"),
        }
    }

    /// Sequential id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit this car to the waiting queue, waiting while it is full.
    ///
    /// Once this returns the car belongs to the queue; the producer has no
    /// further part in its service.
    pub async fn arrive(self, queue: &BoundedWorkQueue<Car>) -> Result<()> {
        let id = self.id;
        info!(car_id = id, "car arrived");
        queue.enqueue(self).await?;
        info!(car_id = id, queue_len = queue.size(), "car entered the waiting queue");
        Ok(())
    }

    /// Blocking version of [`arrive`](Self::arrive) for OS-thread producers.
    pub fn arrive_blocking(self, queue: &BoundedWorkQueue<Car>) -> Result<()> {
        futures::executor::block_on(self.arrive(queue))
    }
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Hands out cars with sequential ids starting at 1.
#[derive(Debug)]
pub struct CarFactory {
    next_id: AtomicU64,
}

impl CarFactory {
    /// Create a factory whose first car is `Car 1`.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Build the next car.
    pub fn next_car(&self) -> Car {
        Car::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// How many cars have been built.
    pub fn produced(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}

impl Default for CarFactory {
    fn default() -> Self {
        Self::new()
    }
}
