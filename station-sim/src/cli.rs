use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use service_station::{
    DurationRange, StationConfig, DEFAULT_ARRIVAL_INTERVAL, DEFAULT_CARS, DEFAULT_PUMPS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SERVICE_TIME,
};

/// Largest waiting queue the simulation accepts.
pub const MAX_QUEUE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, multi-line output
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "station-sim")]
#[command(about = "Car wash simulation: cars queue for pumps, pumps wait for bays", long_about = None)]
#[command(version)]
pub struct Args {
    /// Waiting slots in the queue (1-10)
    #[arg(short, long, env = "STATION_QUEUE_SIZE", default_value_t = DEFAULT_QUEUE_CAPACITY, value_parser = parse_queue_size)]
    pub queue_size: usize,

    /// Number of pumps
    #[arg(short, long, env = "STATION_PUMPS", default_value_t = DEFAULT_PUMPS, value_parser = parse_positive)]
    pub pumps: usize,

    /// Number of service bays (defaults to the pump count)
    #[arg(short, long, env = "STATION_BAYS", value_parser = parse_positive)]
    pub bays: Option<usize>,

    /// Cars to generate; 0 keeps them coming until Ctrl-C
    #[arg(short, long, env = "STATION_CARS", default_value_t = DEFAULT_CARS)]
    pub cars: usize,

    /// Shortest service, in milliseconds
    #[arg(long, env = "STATION_SERVICE_MIN_MS", default_value_t = millis(DEFAULT_SERVICE_TIME.min()))]
    pub service_min_ms: u64,

    /// Longest service, in milliseconds
    #[arg(long, env = "STATION_SERVICE_MAX_MS", default_value_t = millis(DEFAULT_SERVICE_TIME.max()))]
    pub service_max_ms: u64,

    /// Shortest gap between arrivals, in milliseconds
    #[arg(long, env = "STATION_ARRIVAL_MIN_MS", default_value_t = millis(DEFAULT_ARRIVAL_INTERVAL.min()))]
    pub arrival_min_ms: u64,

    /// Longest gap between arrivals, in milliseconds
    #[arg(long, env = "STATION_ARRIVAL_MAX_MS", default_value_t = millis(DEFAULT_ARRIVAL_INTERVAL.max()))]
    pub arrival_max_ms: u64,

    /// Log output format
    #[arg(long, env = "STATION_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    /// Build and validate the station configuration.
    pub fn station_config(&self) -> Result<StationConfig> {
        let service_time =
            DurationRange::from_millis("service time", self.service_min_ms, self.service_max_ms)?;
        let arrival_interval =
            DurationRange::from_millis("arrival interval", self.arrival_min_ms, self.arrival_max_ms)?;

        let mut config = StationConfig::new()
            .queue_capacity(self.queue_size)
            .pumps(self.pumps)
            .cars(self.cars)
            .service_time(service_time)
            .arrival_interval(arrival_interval);
        if let Some(bays) = self.bays {
            config = config.bays(bays);
        }

        config.validate().context("invalid station configuration")?;
        Ok(config)
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    duration.as_millis() as u64
}

fn parse_positive(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s.parse().map_err(|e| format!("`{s}` is not a number: {e}"))?;
    if value == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(value)
}

fn parse_queue_size(s: &str) -> std::result::Result<usize, String> {
    let value = parse_positive(s)?;
    if value > MAX_QUEUE_SIZE {
        return Err(format!("must be at most {MAX_QUEUE_SIZE}"));
    }
    Ok(value)
}
