//! Pumps: the long-running consumers of the waiting queue.
//!
//! Each iteration takes one car from the queue and only then waits for a bay,
//! so a pump blocked on the bay pool never holds the queue's mutex or a queue
//! permit. A pump holds at most one resource at a time while it waits.

use crate::bay_pool::BayPool;
use crate::car::Car;
use crate::config::DurationRange;
use crate::error::{Result, StationError};
use crate::semaphore::ResourcePermit;
use crate::shutdown::{stop_channel, StopSender, StopToken};
use crate::work_queue::BoundedWorkQueue;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Where a pump is in its service cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpState {
    /// Between iterations.
    Idle = 0,
    /// Waiting for a car to appear in the queue.
    AwaitingItem = 1,
    /// Holding a car, waiting for a free bay.
    AwaitingBay = 2,
    /// Holding a car and a bay.
    Servicing = 3,
    /// The loop has exited.
    Stopped = 4,
}

impl PumpState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PumpState::Idle,
            1 => PumpState::AwaitingItem,
            2 => PumpState::AwaitingBay,
            3 => PumpState::Servicing,
            _ => PumpState::Stopped,
        }
    }
}

/// One finished service, sent to the completion channel if one is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Pump that did the work.
    pub pump_id: usize,
    /// The car that was serviced.
    pub car: Car,
    /// Time spent holding the bay.
    pub elapsed: Duration,
}

/// Summary returned when a pump loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Pump id.
    pub pump_id: usize,
    /// Cars serviced to completion.
    pub serviced: u64,
    /// Cars taken from the queue but dropped because the pump was stopped
    /// or the bay pool closed before service finished.
    pub abandoned: u64,
    /// Dequeues that reported a queue invariant violation.
    pub invariant_violations: u64,
}

/// A consumer that repeatedly takes a car, acquires a bay and services it.
///
/// # Examples
///
/// ```rust
/// use service_station::{BayPool, BoundedWorkQueue, Car, DurationRange, Pump};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = Arc::new(BoundedWorkQueue::new(2).unwrap());
/// let bays = Arc::new(BayPool::new(1).unwrap());
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
///
/// let pump = Pump::new(1, Arc::clone(&queue), Arc::clone(&bays))
///     .service_time(DurationRange::fixed(Duration::from_millis(1)))
///     .with_completions(tx)
///     .spawn();
///
/// Car::new(1).arrive(&queue).await.unwrap();
/// assert_eq!(rx.recv().await.unwrap().car.id(), 1);
///
/// pump.stop();
/// let report = pump.join().await.unwrap();
/// assert_eq!(report.serviced, 1);
/// # }
/// ```
pub struct Pump {
    id: usize,
    queue: Arc<BoundedWorkQueue<Car>>,
    bays: Arc<BayPool>,
    service_time: DurationRange,
    completions: Option<mpsc::UnboundedSender<ServiceRecord>>,
    state: Arc<AtomicU8>,
}

impl Pump {
    /// Create pump `id` working `queue` with bays from `bays`.
    ///
    /// Service time defaults to [`DEFAULT_SERVICE_TIME`](crate::DEFAULT_SERVICE_TIME).
    pub fn new(id: usize, queue: Arc<BoundedWorkQueue<Car>>, bays: Arc<BayPool>) -> Self {
        Self {
            id,
            queue,
            bays,
            service_time: crate::config::DEFAULT_SERVICE_TIME,
            completions: None,
            state: Arc::new(AtomicU8::new(PumpState::Idle as u8)),
        }
    }

    /// Set how long a service takes.
    pub fn service_time(mut self, range: DurationRange) -> Self {
        self.service_time = range;
        self
    }

    /// Send a [`ServiceRecord`] to `tx` after every finished service.
    pub fn with_completions(mut self, tx: mpsc::UnboundedSender<ServiceRecord>) -> Self {
        self.completions = Some(tx);
        self
    }

    /// Pump id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current state. Advisory.
    pub fn state(&self) -> PumpState {
        PumpState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Run the loop on a tokio task with its own stop signal.
    pub fn spawn(self) -> PumpHandle {
        let (stop, token) = stop_channel();
        self.spawn_inner(stop, token)
    }

    /// Run the loop on a tokio task that stops when `stop` fires.
    ///
    /// Stopping the returned handle stops every pump sharing `stop`.
    pub fn spawn_with(self, stop: &StopSender) -> PumpHandle {
        self.spawn_inner(stop.clone(), stop.token())
    }

    fn spawn_inner(self, stop: StopSender, token: StopToken) -> PumpHandle {
        let id = self.id;
        let state = Arc::clone(&self.state);
        let join = tokio::spawn(self.run(token));
        PumpHandle {
            id,
            stop,
            state,
            join,
        }
    }

    /// Run the service loop until `stop` fires or the queue is closed.
    ///
    /// The stop signal is checked at the top of every iteration and raced
    /// against each blocking point. A bay held when the stop arrives is
    /// released before this returns.
    pub async fn run(self, mut stop: StopToken) -> PumpReport {
        let mut report = PumpReport {
            pump_id: self.id,
            ..PumpReport::default()
        };
        info!(pump_id = self.id, "pump started");

        loop {
            self.set_state(PumpState::Idle);
            if stop.is_stopped() {
                break;
            }

            match self.serve_next(&mut stop, &mut report).await {
                Ok(record) => {
                    report.serviced += 1;
                    if let Some(tx) = &self.completions {
                        // The coordinator may have stopped listening.
                        let _ = tx.send(record);
                    }
                }
                Err(StationError::QueueInvariantViolation) => {
                    report.invariant_violations += 1;
                    warn!(pump_id = self.id, "dequeue returned no car, continuing");
                }
                Err(StationError::Cancelled) => {
                    info!(pump_id = self.id, "pump interrupted");
                    break;
                }
                Err(err) => {
                    info!(pump_id = self.id, error = %err, "pump exiting");
                    break;
                }
            }
        }

        self.set_state(PumpState::Stopped);
        info!(
            pump_id = self.id,
            serviced = report.serviced,
            abandoned = report.abandoned,
            "pump stopped"
        );
        report
    }

    async fn serve_next(&self, stop: &mut StopToken, report: &mut PumpReport) -> Result<ServiceRecord> {
        self.set_state(PumpState::AwaitingItem);
        let car = tokio::select! {
            biased;
            _ = stop.stopped() => return Err(StationError::Cancelled),
            car = self.queue.dequeue() => car?,
        };
        info!(
            pump_id = self.id,
            car_id = car.id(),
            queue_len = self.queue.size(),
            "{} taken from queue",
            car
        );

        // The queue mutex and both queue permits are already released here.
        self.set_state(PumpState::AwaitingBay);
        let bay = match self.acquire_bay(stop).await {
            Ok(bay) => bay,
            Err(err) => {
                self.abandon(&car, report);
                return Err(err);
            }
        };

        self.set_state(PumpState::Servicing);
        let duration = self.service_time.sample();
        info!(
            pump_id = self.id,
            car_id = car.id(),
            bays_free = self.bays.available_permits(),
            "{} begins service",
            car
        );
        let started = Instant::now();
        let interrupted = tokio::select! {
            biased;
            _ = stop.stopped() => true,
            _ = tokio::time::sleep(duration) => false,
        };
        drop(bay);
        if interrupted {
            self.abandon(&car, report);
            return Err(StationError::Cancelled);
        }

        let elapsed = started.elapsed();
        info!(
            pump_id = self.id,
            car_id = car.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "{} finishes service, bay is now free",
            car
        );
        Ok(ServiceRecord {
            pump_id: self.id,
            car,
            elapsed,
        })
    }

    async fn acquire_bay(&self, stop: &mut StopToken) -> Result<ResourcePermit<'_>> {
        tokio::select! {
            biased;
            _ = stop.stopped() => Err(StationError::Cancelled),
            bay = self.bays.acquire() => {
                let bay = bay?;
                debug!(pump_id = self.id, bays_free = self.bays.available_permits(), "bay acquired");
                Ok(bay)
            }
        }
    }

    fn abandon(&self, car: &Car, report: &mut PumpReport) {
        report.abandoned += 1;
        warn!(pump_id = self.id, car_id = car.id(), "{} abandoned before service finished", car);
    }

    fn set_state(&self, state: PumpState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl fmt::Debug for Pump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pump")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("service_time", &self.service_time)
            .finish()
    }
}

/// Handle to a spawned pump.
#[derive(Debug)]
pub struct PumpHandle {
    id: usize,
    stop: StopSender,
    state: Arc<AtomicU8>,
    join: JoinHandle<PumpReport>,
}

impl PumpHandle {
    /// Pump id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Request cooperative cancellation. Idempotent.
    ///
    /// The pump exits at its next safe point: before taking another car, or
    /// while blocked on the queue, the bay pool or a service. Any bay it
    /// holds is released first.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Current state. Advisory.
    pub fn state(&self) -> PumpState {
        PumpState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to exit and return its report.
    pub async fn join(self) -> std::result::Result<PumpReport, JoinError> {
        self.join.await
    }
}
