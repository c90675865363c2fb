use std::time::Duration;

use async_trait::async_trait;

use crate::{
    models::{MetricCatalog, SampleMatrix, TargetSeries},
    window::QueryWindow,
    Result,
};

pub mod datadog;
pub mod prometheus;

pub use datadog::DatadogClient;
pub use prometheus::PrometheusClient;

/// Applied to every outbound HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source side: metric discovery and range queries.
#[async_trait]
pub trait MetricsQuerier: Send + Sync {
    /// Lists the histogram and counter names starting with `prefix`.
    async fn list_metrics(&self, prefix: &str) -> Result<MetricCatalog>;

    /// Evaluates `expr` over `window`, one stream per label set.
    async fn query_range(&self, expr: &str, window: &QueryWindow) -> Result<SampleMatrix>;
}

/// Destination side. A batch is accepted as a whole or rejected with an error.
#[async_trait]
pub trait MetricsSubmitter: Send + Sync {
    async fn submit_metrics(&self, batch: &[TargetSeries]) -> Result<()>;
}
