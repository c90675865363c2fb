use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::time::Instant;

lazy_static! {
    pub static ref SHIPPER_UP: IntGauge = register_int_gauge!(
        "shipper_up",
        "Whether the shipper loop is running (1) or not (0)"
    ).unwrap();

    pub static ref TICKS_TOTAL: IntCounter = register_int_counter!(
        "shipper_ticks_total",
        "Total number of ticks started"
    ).unwrap();

    pub static ref TICK_FAILURES: IntCounter = register_int_counter!(
        "shipper_tick_failures_total",
        "Total number of ticks aborted by an error"
    ).unwrap();

    pub static ref QUERIES_TOTAL: IntCounter = register_int_counter!(
        "shipper_range_queries_total",
        "Total number of range queries issued"
    ).unwrap();

    pub static ref SERIES_SUBMITTED: IntCounter = register_int_counter!(
        "shipper_series_submitted_total",
        "Total number of series sent to and accepted by the submission backend"
    ).unwrap();

    pub static ref TICK_DURATION: Histogram = register_histogram!(
        "shipper_tick_duration_seconds",
        "Duration of a full tick in seconds",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();
}

pub fn init_metrics() {
    SHIPPER_UP.set(1);
}

pub fn mark_stopped() {
    SHIPPER_UP.set(0);
}

/// Counts a tick on creation and observes its duration on drop.
pub struct TickTimer {
    start: Instant,
}

impl TickTimer {
    pub fn new() -> Self {
        TICKS_TOTAL.inc();
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        TICK_DURATION.observe(self.start.elapsed().as_secs_f64());
    }
}

pub fn record_query() {
    QUERIES_TOTAL.inc();
}

pub fn record_tick_failure() {
    TICK_FAILURES.inc();
}

pub fn record_submitted(series: usize) {
    SERIES_SUBMITTED.inc_by(series as u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub ticks: u64,
    pub failures: u64,
    pub queries: u64,
    pub series_submitted: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        ticks: TICKS_TOTAL.get(),
        failures: TICK_FAILURES.get(),
        queries: QUERIES_TOTAL.get(),
        series_submitted: SERIES_SUBMITTED.get(),
    }
}
