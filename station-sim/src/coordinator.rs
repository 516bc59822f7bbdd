//! Wires the queue, the bay pool and the pumps together and drives arrivals.

use anyhow::{Context, Result};
use service_station::{
    BayPool, BoundedWorkQueue, Car, CarFactory, DurationRange, Pump, PumpHandle, ServiceRecord,
    StationConfig, StationError, StopSender, StopToken,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// How long to wait for a pump to exit after the stop signal.
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cars the arrival generator created.
    pub produced: u64,
    /// Cars serviced to completion, summed over the pump reports.
    pub serviced: u64,
    /// Cars a pump took from the queue but dropped when it was stopped.
    pub abandoned: u64,
    /// Cars whose arrival failed because the queue closed first.
    pub turned_away: u64,
    /// Completion records the coordinator received from the pumps.
    pub completions: u64,
    /// Dequeues that found the queue empty after a filled-slot permit.
    pub invariant_violations: u64,
    /// Left in the queue at shutdown.
    pub left_in_queue: usize,
    /// `true` if every produced car was serviced and every bay was free.
    pub drained: bool,
    /// `true` if the interrupt ended the run.
    pub interrupted: bool,
    /// Wall time from opening the station to the last pump joined.
    pub elapsed: Duration,
}

struct Station {
    queue: Arc<BoundedWorkQueue<Car>>,
    bays: Arc<BayPool>,
    stop: StopSender,
    pumps: Vec<PumpHandle>,
    completions: mpsc::UnboundedReceiver<ServiceRecord>,
    completed: u64,
}

impl Station {
    fn open(config: &StationConfig) -> Result<Self> {
        let queue = Arc::new(BoundedWorkQueue::new(config.waiting_slots())?);
        let bays = Arc::new(BayPool::new(config.bay_count())?);
        let (stop, _) = service_station::stop_channel();
        let (tx, completions) = mpsc::unbounded_channel();

        let pumps = (1..=config.pump_count())
            .map(|id| {
                Pump::new(id, Arc::clone(&queue), Arc::clone(&bays))
                    .service_time(config.service_time_range())
                    .with_completions(tx.clone())
                    .spawn_with(&stop)
            })
            .collect();

        info!(
            queue_size = config.waiting_slots(),
            pumps = config.pump_count(),
            bays = config.bay_count(),
            cars = config.car_count(),
            "station open"
        );
        Ok(Self {
            queue,
            bays,
            stop,
            pumps,
            completions,
            completed: 0,
        })
    }

    /// Receive completion records until `limit` have arrived in total, or
    /// forever when `limit` is `None`.
    ///
    /// Records are counted as they arrive, so the count survives this future
    /// being dropped. Returns early if every pump is gone.
    async fn await_completions(&mut self, limit: Option<u64>) -> u64 {
        while limit.map_or(true, |limit| self.completed < limit) {
            let Some(record) = self.completions.recv().await else {
                break;
            };
            self.completed += 1;
            debug!(
                pump_id = record.pump_id,
                car_id = record.car.id(),
                completed = self.completed,
                "completion recorded"
            );
        }
        self.completed
    }

    /// Count records sent after the pumps were told to stop.
    fn drain_completions(&mut self) {
        while self.completions.try_recv().is_ok() {
            self.completed += 1;
        }
    }
}

/// Cars produced by the arrival generator.
struct Arrivals {
    produced: u64,
    turned_away: u64,
}

/// Generate `cars` arrivals (or unbounded when zero), one task per car, paced
/// by `interval`.
fn spawn_arrivals(
    queue: Arc<BoundedWorkQueue<Car>>,
    cars: usize,
    interval: DurationRange,
    mut stop: StopToken,
) -> JoinHandle<Arrivals> {
    tokio::spawn(async move {
        let factory = CarFactory::new();
        let mut arrivals = JoinSet::new();
        let mut turned_away = 0;

        while cars == 0 || (factory.produced() as usize) < cars {
            let car = factory.next_car();
            let queue = Arc::clone(&queue);
            arrivals.spawn(async move {
                let id = car.id();
                car.arrive(&queue).await.map_err(|err| (id, err))
            });

            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                _ = tokio::time::sleep(interval.sample()) => {}
            }
            reap_finished(&mut arrivals, &mut turned_away);
        }

        while let Some(joined) = arrivals.join_next().await {
            record_arrival(joined, &mut turned_away);
        }

        Arrivals {
            produced: factory.produced(),
            turned_away,
        }
    })
}

type ArrivalResult = std::result::Result<(), (u64, StationError)>;

/// Collect arrival tasks that have already finished, without waiting.
fn reap_finished(arrivals: &mut JoinSet<ArrivalResult>, turned_away: &mut u64) {
    while let Some(joined) = arrivals.try_join_next() {
        record_arrival(joined, turned_away);
    }
}

fn record_arrival(
    joined: std::result::Result<ArrivalResult, tokio::task::JoinError>,
    turned_away: &mut u64,
) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err((car_id, StationError::Closed))) => {
            *turned_away += 1;
            info!(car_id, "car turned away, station closed");
        }
        Ok(Err((car_id, err))) => {
            *turned_away += 1;
            warn!(car_id, error = %err, "car failed to enter the queue");
        }
        Err(err) => error!(error = %err, "arrival task failed"),
    }
}

/// Run the station until the configured cars are serviced, or until
/// `interrupt` completes.
///
/// In continuous mode (`cars == 0`) only `interrupt` ends the run.
pub async fn run<F>(config: StationConfig, interrupt: F) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    config.validate().context("invalid station configuration")?;
    let started = Instant::now();
    let mut station = Station::open(&config)?;
    let generator = spawn_arrivals(
        Arc::clone(&station.queue),
        config.car_count(),
        config.arrival_interval_range(),
        station.stop.token(),
    );

    let mut summary = RunSummary::default();
    let target = config.car_count() as u64;
    tokio::pin!(interrupt);
    let received = if config.is_continuous() {
        // Keep consuming records so the channel stays empty while cars flow.
        tokio::select! {
            _ = &mut interrupt => None,
            _ = station.await_completions(None) => {
                warn!("every pump exited before the interrupt");
                None
            }
        }
    } else {
        tokio::select! {
            _ = &mut interrupt => None,
            received = station.await_completions(Some(target)) => Some(received),
        }
    };

    match received {
        Some(received) => {
            let left = station.queue.size();
            let bays_free = station.bays.all_free();
            summary.drained = received == target && left == 0 && bays_free;
            info!(
                serviced = received,
                queue_len = left,
                bays_free,
                drained = summary.drained,
                "drain check"
            );
        }
        None => {
            summary.interrupted = true;
            info!("interrupted, shutting down");
        }
    }

    station.stop.stop();
    station.queue.close();

    let arrivals = generator.await.context("arrival generator panicked")?;
    summary.produced = arrivals.produced;
    summary.turned_away = arrivals.turned_away;

    for pump in station.pumps.drain(..) {
        let pump_id = pump.id();
        match tokio::time::timeout(PUMP_JOIN_TIMEOUT, pump.join()).await {
            Ok(Ok(report)) => {
                summary.serviced += report.serviced;
                summary.abandoned += report.abandoned;
                summary.invariant_violations += report.invariant_violations;
            }
            Ok(Err(err)) => error!(pump_id, error = %err, "pump task failed"),
            Err(_) => warn!(pump_id, "pump did not stop in time"),
        }
    }

    station.drain_completions();
    summary.completions = station.completed;
    summary.left_in_queue = station.queue.size();
    summary.elapsed = started.elapsed();
    Ok(summary)
}
