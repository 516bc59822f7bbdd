use crate::error::{Result, StationError};
use crate::wait_queue::waker::WakeList;
use crate::wait_queue::WaitQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A counting semaphore: an integer number of permits plus a FIFO queue of
/// tasks waiting for one.
///
/// `CountingResource` is the building block of the station. The bounded work
/// queue uses two of them (free slots and filled slots) and the bay pool is
/// one.
///
/// Permits are handed out strictly in arrival order: a release gives its
/// permit to the oldest waiter instead of returning it to the counter, so a
/// waiter cannot be overtaken by a later `acquire` and cannot starve while
/// releases keep happening.
///
/// # Examples
///
/// ```rust
/// use service_station::CountingResource;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let resource = Arc::new(CountingResource::new(2));
///
/// let first = resource.acquire().await.unwrap();
/// let second = resource.acquire().await.unwrap();
/// assert_eq!(resource.available_permits(), 0);
///
/// drop(first);
/// assert_eq!(resource.available_permits(), 1);
/// # drop(second);
/// # }
/// ```
#[derive(Debug)]
pub struct CountingResource {
    /// Permit count and closed flag.
    /// Bit layout: [permit_count << 1 | closed_flag]
    pub(crate) permits: AtomicUsize,
    /// Tasks waiting for a permit. The counter is only incremented while this
    /// lock is held and the queue is empty, which is what keeps releases from
    /// racing past a task that is about to enqueue itself.
    pub(crate) waiters: Mutex<WaitQueue>,
}

impl CountingResource {
    /// Maximum permits (reserve 3 bits for flags, same as tokio)
    pub const MAX_PERMITS: usize = usize::MAX >> 3;

    pub(crate) const CLOSED: usize = 1;
    pub(crate) const PERMIT_SHIFT: usize = 1;

    /// Creates a resource holding `permits` permits.
    ///
    /// # Panics
    ///
    /// Panics if `permits` exceeds `MAX_PERMITS` (usize::MAX >> 3).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    ///
    /// let resource = CountingResource::new(3);
    /// assert_eq!(resource.available_permits(), 3);
    /// ```
    pub fn new(permits: usize) -> Self {
        if permits > Self::MAX_PERMITS {
            panic!("permits exceed MAX_PERMITS");
        }
        Self {
            permits: AtomicUsize::new(permits << Self::PERMIT_SHIFT),
            waiters: Mutex::new(WaitQueue::new()),
        }
    }

    /// Creates a resource from a signed initial count.
    ///
    /// Fails with [`StationError::InvalidCapacity`] when `permits` is negative
    /// or exceeds `MAX_PERMITS`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::{CountingResource, StationError};
    ///
    /// assert!(CountingResource::with_capacity(0).is_ok());
    /// assert!(matches!(
    ///     CountingResource::with_capacity(-1),
    ///     Err(StationError::InvalidCapacity { .. })
    /// ));
    /// ```
    pub fn with_capacity(permits: i64) -> Result<Self> {
        match usize::try_from(permits) {
            Ok(permits) if permits <= Self::MAX_PERMITS => Ok(Self::new(permits)),
            _ => Err(StationError::invalid_capacity("counting resource", permits)),
        }
    }

    /// Returns the current number of available permits.
    ///
    /// This is a snapshot: it may be stale as soon as it is read. Use it for
    /// diagnostics and termination polling only.
    pub fn available_permits(&self) -> usize {
        self.permits.load(Ordering::Acquire) >> Self::PERMIT_SHIFT
    }

    /// Returns the number of tasks currently blocked in `acquire`.
    ///
    /// Advisory, like [`available_permits`](Self::available_permits).
    pub fn waiting(&self) -> usize {
        self.lock_waiters().len()
    }

    /// Returns `true` if the resource has been closed.
    pub fn is_closed(&self) -> bool {
        self.permits.load(Ordering::Acquire) & Self::CLOSED == Self::CLOSED
    }

    /// Returns one permit to the resource.
    ///
    /// If tasks are waiting, the permit goes to the oldest one and that task
    /// is woken. Never blocks beyond the short internal lock.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    ///
    /// let resource = CountingResource::new(0);
    /// resource.release();
    /// assert_eq!(resource.available_permits(), 1);
    /// ```
    pub fn release(&self) {
        self.add_permits(1);
    }

    /// Adds `added` permits and notifies waiting tasks.
    ///
    /// Waiters are served in FIFO order; permits left over once the queue is
    /// empty are added to the available count.
    ///
    /// # Panics
    ///
    /// Panics if the available count would exceed `MAX_PERMITS`.
    pub fn add_permits(&self, added: usize) {
        if added == 0 {
            return;
        }
        self.add_permits_locked(added, self.lock_waiters());
    }

    /// Hand `rem` permits to waiters, then add the remainder to the counter.
    ///
    /// Waiters are woken in batches of at most 32 with the lock released. The
    /// remainder is added while the lock is held.
    pub(crate) fn add_permits_locked(&self, mut rem: usize, waiters: MutexGuard<'_, WaitQueue>) {
        let mut lock = Some(waiters);

        loop {
            let mut waiters = lock.take().unwrap_or_else(|| self.lock_waiters());
            let mut wake_list = WakeList::new();

            rem = waiters.assign_permits(rem, &mut wake_list);

            if rem == 0 || !wake_list.was_full() {
                if rem > 0 {
                    let prev = self
                        .permits
                        .fetch_add(rem << Self::PERMIT_SHIFT, Ordering::Release);
                    if (prev >> Self::PERMIT_SHIFT) + rem > Self::MAX_PERMITS {
                        panic!(
                            "number of added permits ({}) would overflow MAX_PERMITS ({})",
                            rem,
                            Self::MAX_PERMITS
                        );
                    }
                }
                drop(waiters);
                wake_list.wake_all();
                return;
            }

            // Batch full: wake outside the lock, then continue with the rest.
            drop(waiters);
            wake_list.wake_all();
        }
    }

    /// Closes the resource and cancels all pending waiters.
    ///
    /// After calling this method pending and future `acquire` calls fail with
    /// [`AcquireError`](crate::AcquireError) and `try_acquire` fails with
    /// [`TryAcquireError::Closed`](crate::TryAcquireError::Closed). Permits
    /// already granted stay valid and are returned normally on drop.
    pub fn close(&self) {
        let wakers = {
            let mut waiters = self.lock_waiters();
            self.permits.fetch_or(Self::CLOSED, Ordering::Release);
            waiters.close()
        };
        debug!(cancelled = wakers.len(), "counting resource closed");
        for waker in wakers {
            waker.wake();
        }
    }

    /// Permanently removes up to `n` available permits.
    ///
    /// Returns the number actually removed, which may be less than `n`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    ///
    /// let resource = CountingResource::new(5);
    /// assert_eq!(resource.forget_permits(3), 3);
    /// assert_eq!(resource.forget_permits(10), 2);
    /// assert_eq!(resource.available_permits(), 0);
    /// ```
    pub fn forget_permits(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }

        let mut curr_bits = self.permits.load(Ordering::Acquire);
        loop {
            let curr_permits = curr_bits >> Self::PERMIT_SHIFT;
            let removed = curr_permits.min(n);
            let new_bits = ((curr_permits - removed) << Self::PERMIT_SHIFT) | (curr_bits & Self::CLOSED);

            match self.permits.compare_exchange_weak(
                curr_bits,
                new_bits,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return removed,
                Err(actual) => curr_bits = actual,
            }
        }
    }

    /// Decrement the counter by one if it is positive and the resource is
    /// open.
    pub(crate) fn try_take_one(&self) -> std::result::Result<(), crate::TryAcquireError> {
        let one = 1 << Self::PERMIT_SHIFT;
        let mut curr = self.permits.load(Ordering::Acquire);
        loop {
            if curr & Self::CLOSED == Self::CLOSED {
                return Err(crate::TryAcquireError::Closed);
            }
            if curr < one {
                return Err(crate::TryAcquireError::NoPermits);
            }
            match self
                .permits
                .compare_exchange_weak(curr, curr - one, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(actual) => curr = actual,
            }
        }
    }

    /// The lock never guards a half-finished update, so a poisoned mutex is
    /// still consistent.
    pub(crate) fn lock_waiters(&self) -> MutexGuard<'_, WaitQueue> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
