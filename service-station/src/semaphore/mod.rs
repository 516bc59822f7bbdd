pub(crate) mod core;
pub(crate) mod futures;
pub(crate) mod methods;
pub(crate) mod permits;

pub use self::core::CountingResource;
pub use self::futures::{Acquire, AcquireOwned};
pub use self::permits::{OwnedResourcePermit, ResourcePermit};
