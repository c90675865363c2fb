//! In-memory collaborators shared by the worker and scheduler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    api::{MetricsQuerier, MetricsSubmitter},
    models::{MetricCatalog, SampleMatrix, TargetSeries},
    window::QueryWindow,
    worker::Clock,
    Result, ShipperError,
};

pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Self(Utc.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Moves forward by `step` on every reading.
pub struct SteppingClock {
    base: DateTime<Utc>,
    step: chrono::Duration,
    readings: AtomicUsize,
}

impl SteppingClock {
    pub fn new(base: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            base,
            step,
            readings: AtomicUsize::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.readings.fetch_add(1, Ordering::SeqCst) as i32;
        self.base + self.step * n
    }
}

#[derive(Default)]
pub struct MockQuerier {
    histograms: Vec<String>,
    counters: Vec<String>,
    matrix: SampleMatrix,
    fail_on: Option<String>,
    fail_discovery: bool,
    discovery_delay: Option<Duration>,
    discoveries: AtomicUsize,
    queries: Mutex<Vec<String>>,
    windows: Mutex<Vec<QueryWindow>>,
}

impl MockQuerier {
    pub fn new(histograms: &[&str], counters: &[&str]) -> Self {
        Self {
            histograms: histograms.iter().map(|s| s.to_string()).collect(),
            counters: counters.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Every range query answers with `matrix`.
    pub fn with_matrix(mut self, matrix: SampleMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn failing_on(mut self, expr: &str) -> Self {
        self.fail_on = Some(expr.to_string());
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    /// Discovery sleeps on the tokio clock before answering.
    pub fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.discovery_delay = Some(delay);
        self
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn windows(&self) -> Vec<QueryWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsQuerier for MockQuerier {
    async fn list_metrics(&self, _prefix: &str) -> Result<MetricCatalog> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.discovery_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_discovery {
            return Err(ShipperError::Discovery("backend unavailable".to_string()));
        }
        Ok(MetricCatalog {
            histogram_names: self.histograms.iter().cloned().collect(),
            counter_names: self.counters.iter().cloned().collect(),
        })
    }

    async fn query_range(&self, expr: &str, window: &QueryWindow) -> Result<SampleMatrix> {
        self.queries.lock().unwrap().push(expr.to_string());
        self.windows.lock().unwrap().push(*window);
        if self.fail_on.as_deref() == Some(expr) {
            return Err(ShipperError::Query(format!("{}: timeout", expr)));
        }
        Ok(self.matrix.clone())
    }
}

#[derive(Default)]
pub struct RecordingSubmitter {
    fail: bool,
    attempts: AtomicUsize,
    batches: Mutex<Vec<Vec<TargetSeries>>>,
}

impl RecordingSubmitter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Batches that were accepted.
    pub fn batches(&self) -> Vec<Vec<TargetSeries>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSubmitter for RecordingSubmitter {
    async fn submit_metrics(&self, batch: &[TargetSeries]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ShipperError::Submission("intake returned 503".to_string()));
        }
        self.batches.lock().unwrap().push(batch.to_vec());
        Ok(())
    }
}
