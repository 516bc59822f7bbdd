use crate::wait_queue::waker::WakeList;
use crate::wait_queue::waiter::{WaiterHandle, WaiterState};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::task::Waker;

/// FIFO queue of tasks waiting for a permit.
///
/// Protected by the owning resource's mutex.
pub(crate) struct WaitQueue {
    waiters: VecDeque<Arc<WaiterState>>,
    closed: bool,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
            closed: false,
        }
    }

    pub(crate) fn push_waiter(&mut self) -> WaiterHandle {
        let handle = WaiterHandle::new();
        self.waiters.push_back(Arc::clone(&handle.state));
        handle
    }

    /// Hands up to `available` permits to the oldest waiters, one each, and
    /// collects their wakers into `wake_list`.
    ///
    /// Stops early when `wake_list` is full. Returns the permits left over.
    pub(crate) fn assign_permits(&mut self, mut available: usize, wake_list: &mut WakeList) -> usize {
        while available > 0 && wake_list.can_push() {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if !waiter.try_notify() {
                continue;
            }
            available -= 1;
            // Safety: the caller holds the wait queue mutex.
            if let Some(waker) = unsafe { waiter.take_waker_under_lock() } {
                wake_list.push(waker);
            }
        }
        available
    }

    /// Removes a waiter whose future was dropped before it was notified.
    pub(crate) fn remove_waiter(&mut self, waiter: &Arc<WaiterState>) {
        if let Some(pos) = self.waiters.iter().position(|w| Arc::ptr_eq(w, waiter)) {
            self.waiters.remove(pos);
        }
    }

    /// Cancels every queued waiter and returns their wakers.
    pub(crate) fn close(&mut self) -> Vec<Waker> {
        self.closed = true;
        self.waiters
            .drain(..)
            .filter(|waiter| waiter.try_cancel())
            // Safety: the caller holds the wait queue mutex.
            .filter_map(|waiter| unsafe { waiter.take_waker_under_lock() })
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}

impl fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitQueue")
            .field("waiters", &self.waiters.len())
            .field("closed", &self.closed)
            .finish()
    }
}
