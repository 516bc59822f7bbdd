use crate::wait_queue::waker::SafeWakerCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Waker;

// Waiter state constants
const WAITING: usize = 0;
const NOTIFIED: usize = 1;
const CANCELLED: usize = 2;

/// State of a task waiting for one permit.
///
/// `WAITING` moves to exactly one of `NOTIFIED` (a permit was handed over) or
/// `CANCELLED` (the resource closed or the future was dropped). Transitions
/// are only made while the wait queue mutex is held, so the two can never
/// both succeed.
pub(crate) struct WaiterState {
    state: AtomicUsize,
    waker: SafeWakerCell,
}

/// The acquiring future's handle on its queued [`WaiterState`].
pub(crate) struct WaiterHandle {
    pub(crate) state: Arc<WaiterState>,
}

impl WaiterState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicUsize::new(WAITING),
            waker: SafeWakerCell::new(),
        }
    }

    /// Hands a permit to this waiter. Returns `false` if it already left the
    /// `WAITING` state.
    ///
    /// Must be called with the wait queue mutex held.
    pub(crate) fn try_notify(&self) -> bool {
        self.state
            .compare_exchange(WAITING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Cancels this waiter. Returns `false` if it was already notified or
    /// cancelled.
    ///
    /// Must be called with the wait queue mutex held.
    pub(crate) fn try_cancel(&self) -> bool {
        self.state
            .compare_exchange(WAITING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_notified(&self) -> bool {
        self.state.load(Ordering::Acquire) == NOTIFIED
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    #[cfg(test)]
    pub(crate) fn is_waiting(&self) -> bool {
        self.state.load(Ordering::Acquire) == WAITING
    }

    /// # Safety
    ///
    /// The caller must hold the wait queue mutex.
    pub(crate) unsafe fn register_waker_under_lock(&self, waker: &Waker) {
        self.waker.register_under_lock(waker);
    }

    /// # Safety
    ///
    /// The caller must hold the wait queue mutex.
    pub(crate) unsafe fn take_waker_under_lock(&self) -> Option<Waker> {
        self.waker.take_under_lock()
    }
}

impl WaiterHandle {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(WaiterState::new()),
        }
    }
}

impl fmt::Debug for WaiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Ordering::Relaxed) {
            WAITING => "waiting",
            NOTIFIED => "notified",
            _ => "cancelled",
        };
        f.debug_struct("WaiterState").field("state", &state).finish()
    }
}

impl fmt::Debug for WaiterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.state.fmt(f)
    }
}
