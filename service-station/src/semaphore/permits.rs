use std::fmt;
use std::sync::Arc;

use super::CountingResource;

/// A permit acquired from a [`CountingResource`].
///
/// The permit is returned to the resource when dropped, so a scope that holds
/// one releases it on every exit path, including panics and cancelled tasks.
///
/// # Examples
///
/// ```rust
/// use service_station::CountingResource;
///
/// # #[tokio::main]
/// # async fn main() {
/// let resource = CountingResource::new(3);
/// {
///     let _permit = resource.acquire().await.unwrap();
///     assert_eq!(resource.available_permits(), 2);
/// }
/// assert_eq!(resource.available_permits(), 3);
/// # }
/// ```
pub struct ResourcePermit<'a> {
    pub(crate) resource: &'a CountingResource,
    pub(crate) permits: usize,
}

/// An owned permit, holding its [`CountingResource`] through an `Arc`.
///
/// Returned by [`CountingResource::acquire_owned`]; can be moved into spawned
/// tasks.
pub struct OwnedResourcePermit {
    pub(crate) resource: Arc<CountingResource>,
    pub(crate) permits: usize,
}

impl<'a> ResourcePermit<'a> {
    /// Forgets this permit without releasing it back to the resource.
    ///
    /// The bounded work queue uses this to move a slot from one counter to
    /// the other: the free-slot permit taken by `enqueue` is never returned to
    /// the free-slot resource, a filled-slot permit is released instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_station::CountingResource;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let resource = CountingResource::new(3);
    /// let permit = resource.acquire().await.unwrap();
    /// permit.forget();
    /// assert_eq!(resource.available_permits(), 2);
    /// # }
    /// ```
    pub fn forget(mut self) {
        self.permits = 0;
    }

    /// Returns the number of permits held by this permit object.
    pub fn num_permits(&self) -> usize {
        self.permits
    }
}

impl<'a> Drop for ResourcePermit<'a> {
    fn drop(&mut self) {
        if self.permits == 0 {
            return;
        }
        self.resource.add_permits(self.permits);
    }
}

impl OwnedResourcePermit {
    /// Forgets this permit without releasing it back to the resource.
    pub fn forget(mut self) {
        self.permits = 0;
    }

    /// Returns the number of permits held by this permit object.
    pub fn num_permits(&self) -> usize {
        self.permits
    }

    /// Returns the resource this permit was acquired from.
    pub fn resource(&self) -> &Arc<CountingResource> {
        &self.resource
    }
}

impl Drop for OwnedResourcePermit {
    fn drop(&mut self) {
        if self.permits == 0 {
            return;
        }
        self.resource.add_permits(self.permits);
    }
}

impl<'a> fmt::Debug for ResourcePermit<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePermit")
            .field("permits", &self.permits)
            .finish()
    }
}

impl fmt::Debug for OwnedResourcePermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedResourcePermit")
            .field("permits", &self.permits)
            .finish()
    }
}
