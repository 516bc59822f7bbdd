use crate::error::{AcquireError, TryAcquireError};
use crate::wait_queue::WaiterHandle;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::{CountingResource, OwnedResourcePermit, ResourcePermit};

/// A future representing an ongoing permit acquisition.
///
/// Returned by [`CountingResource::acquire`]. Dropping it while it waits
/// cancels the acquisition without consuming a permit.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Acquire<'a> {
    pub(crate) resource: &'a CountingResource,
    pub(crate) waiter_handle: Option<WaiterHandle>,
}

/// A future representing an ongoing owned permit acquisition.
///
/// Returned by [`CountingResource::acquire_owned`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct AcquireOwned {
    pub(crate) resource: Arc<CountingResource>,
    pub(crate) waiter_handle: Option<WaiterHandle>,
}

impl CountingResource {
    /// Shared poll logic for both acquire futures.
    ///
    /// On the first poll the counter is tried without the lock, then once
    /// more under the lock before the task is queued. Releases only add to
    /// the counter under the same lock when nobody is queued, so a wakeup
    /// cannot be lost between the two.
    pub(crate) fn poll_acquire(
        &self,
        slot: &mut Option<WaiterHandle>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), AcquireError>> {
        let Some(handle) = slot.as_ref() else {
            match self.try_take_one() {
                Ok(()) => return Poll::Ready(Ok(())),
                Err(TryAcquireError::Closed) => return Poll::Ready(Err(AcquireError::closed())),
                Err(TryAcquireError::NoPermits) => {}
            }

            let mut waiters = self.lock_waiters();
            match self.try_take_one() {
                Ok(()) => return Poll::Ready(Ok(())),
                Err(TryAcquireError::Closed) => return Poll::Ready(Err(AcquireError::closed())),
                Err(TryAcquireError::NoPermits) => {}
            }
            if waiters.is_closed() {
                return Poll::Ready(Err(AcquireError::closed()));
            }

            let handle = waiters.push_waiter();
            // Safety: the waiter mutex is held.
            unsafe { handle.state.register_waker_under_lock(cx.waker()) };
            *slot = Some(handle);
            return Poll::Pending;
        };

        if let Some(outcome) = Self::settled(handle) {
            *slot = None;
            return Poll::Ready(outcome);
        }

        let _waiters = self.lock_waiters();
        if let Some(outcome) = Self::settled(handle) {
            *slot = None;
            return Poll::Ready(outcome);
        }
        // Safety: the waiter mutex is held.
        unsafe { handle.state.register_waker_under_lock(cx.waker()) };
        Poll::Pending
    }

    fn settled(handle: &WaiterHandle) -> Option<Result<(), AcquireError>> {
        if handle.state.is_notified() {
            Some(Ok(()))
        } else if handle.state.is_cancelled() {
            Some(Err(AcquireError::closed()))
        } else {
            None
        }
    }

    /// Withdraw a queued waiter whose future is being dropped.
    ///
    /// A waiter that was still waiting is removed and the counter is left
    /// untouched. A waiter that had already been handed a permit passes it on
    /// to the next waiter (or back to the counter).
    pub(crate) fn cancel_acquire(&self, handle: WaiterHandle) {
        let mut waiters = self.lock_waiters();
        if handle.state.try_cancel() {
            waiters.remove_waiter(&handle.state);
        } else if handle.state.is_notified() {
            self.add_permits_locked(1, waiters);
        }
    }
}

impl<'a> Future for Acquire<'a> {
    type Output = Result<ResourcePermit<'a>, AcquireError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let resource = this.resource;
        resource
            .poll_acquire(&mut this.waiter_handle, cx)
            .map_ok(|()| ResourcePermit {
                resource,
                permits: 1,
            })
    }
}

impl<'a> Drop for Acquire<'a> {
    fn drop(&mut self) {
        if let Some(handle) = self.waiter_handle.take() {
            self.resource.cancel_acquire(handle);
        }
    }
}

impl Future for AcquireOwned {
    type Output = Result<OwnedResourcePermit, AcquireError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        this.resource
            .poll_acquire(&mut this.waiter_handle, cx)
            .map_ok(|()| OwnedResourcePermit {
                resource: Arc::clone(&this.resource),
                permits: 1,
            })
    }
}

impl Drop for AcquireOwned {
    fn drop(&mut self) {
        if let Some(handle) = self.waiter_handle.take() {
            self.resource.cancel_acquire(handle);
        }
    }
}

impl<'a> fmt::Debug for Acquire<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquire")
            .field("queued", &self.waiter_handle.is_some())
            .finish()
    }
}

impl fmt::Debug for AcquireOwned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireOwned")
            .field("queued", &self.waiter_handle.is_some())
            .finish()
    }
}
