//! # service-station
//!
//! **Synchronization core for a car wash: a bounded waiting queue, a pool of
//! service bays and the pumps that move cars between them.**
//!
//! ## Components
//! - [`CountingResource`]: a FIFO counting semaphore with cancel-safe async
//!   acquisition and RAII permits. Works with any async runtime.
//! - [`BoundedWorkQueue`]: the classic bounded buffer, built from two counting
//!   resources (free slots, filled slots) and a mutex around the sequence.
//! - [`BayPool`]: a counting resource sized to the number of bays.
//! - [`Car`]: the work item; `arrive` submits it to the queue.
//! - [`Pump`]: the consumer loop. It takes a car first, then waits for a bay,
//!   so it never waits on the bay pool while holding anything of the queue.
//!
//! ## Quick Start
//! ```rust
//! use service_station::{BayPool, BoundedWorkQueue, Car, DurationRange, Pump};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = Arc::new(BoundedWorkQueue::new(2).unwrap());
//!     let bays = Arc::new(BayPool::new(1).unwrap());
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//!     let pump = Pump::new(1, Arc::clone(&queue), Arc::clone(&bays))
//!         .service_time(DurationRange::fixed(Duration::from_millis(5)))
//!         .with_completions(tx)
//!         .spawn();
//!
//!     for id in 1..=3 {
//!         Car::new(id).arrive(&queue).await.unwrap();
//!     }
//!     for id in 1..=3 {
//!         assert_eq!(rx.recv().await.unwrap().car.id(), id);
//!     }
//!
//!     pump.stop();
//!     pump.join().await.unwrap();
//!     assert_eq!(queue.size(), 0);
//!     assert!(bays.all_free());
//! }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, unreachable_pub, missing_debug_implementations)]
#![deny(rust_2018_idioms)]

mod bay_pool;
mod car;
mod config;
mod error;
mod pump;
mod semaphore;
mod shutdown;
mod wait_queue;
mod work_queue;

pub use bay_pool::BayPool;
pub use car::{Car, CarFactory};
pub use config::{
    DurationRange, StationConfig, DEFAULT_ARRIVAL_INTERVAL, DEFAULT_CARS, DEFAULT_PUMPS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SERVICE_TIME,
};
pub use error::{AcquireError, Result, StationError, TryAcquireError};
pub use pump::{Pump, PumpHandle, PumpReport, PumpState, ServiceRecord};
pub use semaphore::{Acquire, AcquireOwned, CountingResource, OwnedResourcePermit, ResourcePermit};
pub use shutdown::{stop_channel, StopSender, StopToken};
pub use work_queue::{BoundedWorkQueue, QueueSnapshot};
