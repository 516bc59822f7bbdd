//! Bounded FIFO work queue built from two counting resources.
//!
//! `free_slots` starts at the capacity and `filled_slots` at zero. A producer
//! moves one permit from the first to the second, a consumer moves one back,
//! and the item sequence itself only changes under the `items` mutex.

use crate::error::{Result, StationError};
use crate::semaphore::CountingResource;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A capacity-limited FIFO queue shared by producers and consumers.
///
/// `enqueue` waits while the queue is full and `dequeue` waits while it is
/// empty. Both waits are cancel-safe: they are the only await points, and
/// everything after the first permit is taken runs synchronously.
///
/// # Examples
///
/// ```rust
/// use service_station::BoundedWorkQueue;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = BoundedWorkQueue::new(2).unwrap();
/// queue.enqueue("first").await.unwrap();
/// queue.enqueue("second").await.unwrap();
/// assert_eq!(queue.size(), 2);
///
/// assert_eq!(queue.dequeue().await.unwrap(), "first");
/// assert_eq!(queue.dequeue().await.unwrap(), "second");
/// # }
/// ```
pub struct BoundedWorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    free_slots: CountingResource,
    filled_slots: CountingResource,
    capacity: usize,
    invariant_violations: AtomicU64,
}

/// Queue length and both permit counts, read while the queue mutex is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Items currently in the sequence.
    pub len: usize,
    /// Available free-slot permits.
    pub free_slots: usize,
    /// Available filled-slot permits.
    pub filled_slots: usize,
    /// Configured capacity.
    pub capacity: usize,
}

impl QueueSnapshot {
    /// Returns `true` if the counts are consistent with the bounded-buffer
    /// protocol.
    ///
    /// Exact conservation (`free_slots + len == capacity` and
    /// `filled_slots == len`) holds only at quiescence, when no `enqueue` or
    /// `dequeue` is between its permit and its signal; check it there with
    /// [`is_balanced`](Self::is_balanced). While operations are in flight a
    /// permit can be held by one of them, so only the inequalities are
    /// checked here.
    pub fn is_consistent(&self) -> bool {
        self.len <= self.capacity
            && self.filled_slots <= self.len
            && self.free_slots + self.len <= self.capacity
    }

    /// Returns `true` if the counts balance exactly.
    ///
    /// Only meaningful at quiescence: a snapshot taken while an operation is
    /// in flight may be consistent yet unbalanced.
    pub fn is_balanced(&self) -> bool {
        self.free_slots + self.len == self.capacity && self.filled_slots == self.len
    }
}

impl<T> BoundedWorkQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// Fails with [`StationError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 || capacity > CountingResource::MAX_PERMITS {
            return Err(StationError::invalid_capacity("work queue", capacity));
        }
        Ok(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            free_slots: CountingResource::new(capacity),
            filled_slots: CountingResource::new(0),
            capacity,
            invariant_violations: AtomicU64::new(0),
        })
    }

    /// Appends `item` to the tail, waiting while the queue is full.
    ///
    /// Returns [`StationError::Closed`] if the queue is closed before a slot
    /// frees up; the item is dropped in that case.
    pub async fn enqueue(&self, item: T) -> Result<()> {
        let slot = self.free_slots.acquire().await?;
        slot.forget();

        let len = {
            let mut items = self.lock_items();
            items.push_back(item);
            items.len()
        };
        // Only signal once the item is visible in the sequence.
        self.filled_slots.release();

        debug!(queue_len = len, "item enqueued");
        Ok(())
    }

    /// Removes and returns the head item, waiting while the queue is empty.
    ///
    /// Returns [`StationError::QueueInvariantViolation`] if a filled-slot
    /// permit was granted but the sequence was empty. In that case no
    /// free-slot permit is released, since no slot was vacated.
    pub async fn dequeue(&self) -> Result<T> {
        let filled = self.filled_slots.acquire().await?;
        filled.forget();

        let (item, len) = {
            let mut items = self.lock_items();
            let item = items.pop_front();
            (item, items.len())
        };

        let Some(item) = item else {
            let total = self.invariant_violations.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                violations = total,
                "filled-slot permit granted but the queue was empty"
            );
            return Err(StationError::QueueInvariantViolation);
        };
        // Only signal once the item has left the sequence.
        self.free_slots.release();

        debug!(queue_len = len, "item dequeued");
        Ok(item)
    }

    /// Blocking version of [`enqueue`](Self::enqueue) for OS-thread producers.
    ///
    /// Must not be called from inside an async task.
    pub fn enqueue_blocking(&self, item: T) -> Result<()> {
        futures::executor::block_on(self.enqueue(item))
    }

    /// Blocking version of [`dequeue`](Self::dequeue) for OS-thread consumers.
    ///
    /// Must not be called from inside an async task.
    pub fn dequeue_blocking(&self) -> Result<T> {
        futures::executor::block_on(self.dequeue())
    }

    /// Number of queued items. Advisory.
    pub fn size(&self) -> usize {
        self.lock_items().len()
    }

    /// Returns `true` if no item is queued. Advisory.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Available free-slot permits. Advisory.
    pub fn free_slots(&self) -> usize {
        self.free_slots.available_permits()
    }

    /// Available filled-slot permits. Advisory.
    pub fn filled_slots(&self) -> usize {
        self.filled_slots.available_permits()
    }

    /// How many times `dequeue` found the sequence empty after being granted
    /// a filled-slot permit.
    pub fn invariant_violations(&self) -> u64 {
        self.invariant_violations.load(Ordering::Relaxed)
    }

    /// Reads the length and both permit counts while holding the queue mutex.
    ///
    /// Since permit counters change outside the mutex, this is exact only
    /// with respect to the sequence; see [`QueueSnapshot::is_consistent`].
    pub fn snapshot(&self) -> QueueSnapshot {
        let items = self.lock_items();
        QueueSnapshot {
            len: items.len(),
            free_slots: self.free_slots.available_permits(),
            filled_slots: self.filled_slots.available_permits(),
            capacity: self.capacity,
        }
    }

    /// Closes the queue: blocked and future `enqueue`/`dequeue` calls fail
    /// with [`StationError::Closed`]. Items still queued are left in place.
    pub fn close(&self) {
        self.free_slots.close();
        self.filled_slots.close();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.free_slots.is_closed()
    }

    /// Grants a filled-slot permit with no item behind it.
    #[cfg(test)]
    pub(crate) fn release_phantom_filled(&self) {
        self.filled_slots.release();
    }

    fn lock_items(&self) -> MutexGuard<'_, VecDeque<T>> {
        // Pushes and pops cannot panic midway, so a poisoned guard still
        // holds a valid sequence.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for BoundedWorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedWorkQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.size())
            .field("free_slots", &self.free_slots())
            .field("filled_slots", &self.filled_slots())
            .finish()
    }
}
