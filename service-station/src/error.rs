use std::fmt;
use thiserror::Error;

/// Error returned from acquire operations when the resource has been closed.
#[derive(Debug, PartialEq, Eq)]
pub struct AcquireError(());

/// Error returned from try_acquire operations.
#[derive(Debug, PartialEq, Eq)]
pub enum TryAcquireError {
    /// The resource has been closed and cannot issue new permits.
    Closed,
    /// The resource has no available permits.
    NoPermits,
}

impl AcquireError {
    pub(crate) fn closed() -> AcquireError {
        AcquireError(())
    }
}

impl fmt::Display for AcquireError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "counting resource closed")
    }
}

impl std::error::Error for AcquireError {}

impl TryAcquireError {
    /// Returns `true` if the error was caused by a closed resource.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryAcquireError::Closed)
    }

    /// Returns `true` if the error was caused by insufficient permits.
    pub fn is_no_permits(&self) -> bool {
        matches!(self, TryAcquireError::NoPermits)
    }
}

impl fmt::Display for TryAcquireError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryAcquireError::Closed => write!(fmt, "counting resource closed"),
            TryAcquireError::NoPermits => write!(fmt, "no permits available"),
        }
    }
}

impl std::error::Error for TryAcquireError {}

/// Errors surfaced by the station: queue, bay pool and pump operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StationError {
    /// A capacity below the allowed minimum was requested at construction.
    #[error("invalid capacity for {resource}: {requested}")]
    InvalidCapacity {
        /// Which component rejected the capacity.
        resource: &'static str,
        /// The value that was requested.
        requested: i64,
    },

    /// A duration range whose upper bound is below its lower bound.
    #[error("invalid {what} range: {min_ms}ms..={max_ms}ms")]
    InvalidRange {
        /// Which setting the range configures.
        what: &'static str,
        /// Lower bound in milliseconds.
        min_ms: u128,
        /// Upper bound in milliseconds.
        max_ms: u128,
    },

    /// A filled-slot permit was granted but the queue held no item.
    #[error("queue invariant violated: filled-slot permit granted on an empty queue")]
    QueueInvariantViolation,

    /// The stop signal was observed at a blocking point.
    #[error("cancelled by stop signal")]
    Cancelled,

    /// The underlying counting resource was closed.
    #[error("resource closed")]
    Closed,
}

impl StationError {
    pub(crate) fn invalid_capacity(resource: &'static str, requested: impl TryInto<i64>) -> Self {
        StationError::InvalidCapacity {
            resource,
            requested: requested.try_into().unwrap_or(i64::MAX),
        }
    }
}

impl From<AcquireError> for StationError {
    fn from(_: AcquireError) -> Self {
        StationError::Closed
    }
}

/// Result type alias using [`StationError`].
pub type Result<T> = std::result::Result<T, StationError>;
