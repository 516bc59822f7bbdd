use crate::error::{AcquireError, TryAcquireError};
use std::sync::Arc;

use super::futures::{Acquire, AcquireOwned};
use super::permits::{OwnedResourcePermit, ResourcePermit};
use super::CountingResource;

impl CountingResource {
    // === Acquire methods ===

    /// Acquires one permit, waiting until one is available.
    ///
    /// Waiters are served in the order they started waiting. Dropping the
    /// returned future before it completes leaves the counter unmodified.
    ///
    /// # Returns
    ///
    /// A future that resolves to either:
    /// - `Ok(ResourcePermit)` - the permit, released on drop
    /// - `Err(AcquireError)` - the resource was closed
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let resource = CountingResource::new(1);
    /// let permit = resource.acquire().await.unwrap();
    /// assert_eq!(resource.available_permits(), 0);
    /// drop(permit);
    /// assert_eq!(resource.available_permits(), 1);
    /// # }
    /// ```
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            resource: self,
            waiter_handle: None,
        }
    }

    /// Acquires one permit, blocking the current thread.
    ///
    /// For callers running on plain OS threads. Must not be called from
    /// inside an async task.
    pub fn acquire_blocking(&self) -> Result<ResourcePermit<'_>, AcquireError> {
        futures::executor::block_on(self.acquire())
    }

    // === Owned acquire methods ===

    /// Acquires one owned permit, waiting until one is available.
    ///
    /// The resource must be wrapped in an `Arc`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let resource = Arc::new(CountingResource::new(1));
    /// let permit = Arc::clone(&resource).acquire_owned().await.unwrap();
    /// tokio::spawn(async move {
    ///     drop(permit);
    /// })
    /// .await
    /// .unwrap();
    /// assert_eq!(resource.available_permits(), 1);
    /// # }
    /// ```
    pub fn acquire_owned(self: Arc<Self>) -> AcquireOwned {
        AcquireOwned {
            resource: self,
            waiter_handle: None,
        }
    }

    // === Non-blocking acquire methods ===

    /// Attempts to acquire one permit without waiting.
    ///
    /// # Returns
    ///
    /// * `Ok(ResourcePermit)` - Successfully acquired permit
    /// * `Err(TryAcquireError::Closed)` - Resource is closed
    /// * `Err(TryAcquireError::NoPermits)` - No permits available
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::{CountingResource, TryAcquireError};
    ///
    /// let resource = CountingResource::new(1);
    /// let _permit = resource.try_acquire().unwrap();
    /// assert_eq!(resource.try_acquire().unwrap_err(), TryAcquireError::NoPermits);
    /// ```
    pub fn try_acquire(&self) -> Result<ResourcePermit<'_>, TryAcquireError> {
        self.try_take_one()?;
        Ok(ResourcePermit {
            resource: self,
            permits: 1,
        })
    }

    /// Attempts to acquire one owned permit without waiting.
    pub fn try_acquire_owned(self: Arc<Self>) -> Result<OwnedResourcePermit, TryAcquireError> {
        self.try_take_one()?;
        Ok(OwnedResourcePermit {
            resource: self,
            permits: 1,
        })
    }
}
