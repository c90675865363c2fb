use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One sample of a range query result. Timestamps are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A single labelled series inside a range query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

/// Raw result of one range query, in backend order.
pub type SampleMatrix = Vec<SampleStream>;

/// Metric names discovered for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCatalog {
    pub histogram_names: BTreeSet<String>,
    pub counter_names: BTreeSet<String>,
}

impl MetricCatalog {
    /// Classifies raw metric names. Names outside `prefix` are dropped,
    /// `_bucket` names are histograms, `_sum` names are skipped and
    /// everything else is treated as a counter.
    pub fn from_names<I, S>(prefix: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = MetricCatalog::default();
        for name in names.into_iter().map(Into::into) {
            if !name.starts_with(prefix) {
                continue;
            }
            if name.ends_with("_bucket") {
                catalog.histogram_names.insert(name);
            } else if !name.ends_with("_sum") {
                catalog.counter_names.insert(name);
            }
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.histogram_names.is_empty() && self.counter_names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Gauge,
    Rate,
    Count,
}

/// A series in the submission format, built from exactly one source series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSeries {
    pub metric_name: String,
    pub kind: MetricKind,
    pub tags: BTreeMap<String, String>,
    pub points: Vec<Sample>,
}

/// Series submitted together at the end of one tick.
pub type Batch = Vec<TargetSeries>;
