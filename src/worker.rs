use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    api::{MetricsQuerier, MetricsSubmitter},
    config::Config,
    metrics::TickTimer,
    models::Batch,
    query::{histogram_queries, rate_expr, raw_expr, HistogramQuery},
    translate::{count_to_count, count_to_rate, histogram_to_gauge},
    window::QueryWindow,
    Result,
};

/// Source of wall-clock time for window computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a worker queries and how it names the results.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub metric_prefix: String,
    pub metric_namespace: String,
    pub quantiles: Vec<f64>,
    pub histogram_group_by: Vec<String>,
    pub query_interval: Duration,
    pub step: Duration,
}

impl From<&Config> for WorkerSettings {
    fn from(config: &Config) -> Self {
        Self {
            metric_prefix: config.metric_prefix.clone(),
            metric_namespace: config.metric_namespace.clone(),
            quantiles: config.quantiles.clone(),
            histogram_group_by: config.histogram_group_by.clone(),
            query_interval: config.query_interval,
            step: config.step,
        }
    }
}

/// Runs one discover, query, translate and submit cycle per call to [`Worker::tick`].
pub struct Worker {
    querier: Arc<dyn MetricsQuerier>,
    submitter: Arc<dyn MetricsSubmitter>,
    clock: Arc<dyn Clock>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        querier: Arc<dyn MetricsQuerier>,
        submitter: Arc<dyn MetricsSubmitter>,
        clock: Arc<dyn Clock>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            querier,
            submitter,
            clock,
            settings,
        }
    }

    /// Runs a single tick.
    ///
    /// The first failing query or the failing submission aborts the tick and
    /// nothing is submitted. A failed discovery is returned as a fatal error.
    pub async fn tick(&self) -> Result<()> {
        let _timer = TickTimer::new();
        let settings = &self.settings;

        let window = QueryWindow::compute(self.clock.now(), settings.query_interval, settings.step)?;
        let catalog = self.querier.list_metrics(&settings.metric_prefix).await?;

        info!(
            "Querying Prometheus over [{} .. {}] step {}s",
            window.start,
            window.end,
            window.step_secs()
        );
        info!(
            "Found {} histogram metrics: {:?}",
            catalog.histogram_names.len(),
            catalog.histogram_names
        );
        info!(
            "Found {} counter metrics: {:?}",
            catalog.counter_names.len(),
            catalog.counter_names
        );
        if catalog.is_empty() {
            warn!("No metrics found with prefix {}", settings.metric_prefix);
        }

        // Collected up front: the lazy iterator borrows the catalog and would
        // otherwise be held across the query awaits.
        let queries: Vec<HistogramQuery> = histogram_queries(
            &settings.quantiles,
            &catalog.histogram_names,
            &settings.histogram_group_by,
        )
        .collect();

        let mut batch: Batch = Vec::new();

        for query in queries {
            let matrix = self.querier.query_range(&query.expr, &window).await?;
            batch.extend(histogram_to_gauge(
                &settings.metric_namespace,
                &query.bucket_name,
                query.quantile,
                matrix,
            ));
        }
        let histogram_count = batch.len();
        info!("Received {} histogram series", histogram_count);

        let mut rates = Vec::new();
        let mut counts = Vec::new();
        for counter in &catalog.counter_names {
            let matrix = self.querier.query_range(&rate_expr(counter), &window).await?;
            rates.extend(count_to_rate(&settings.metric_namespace, counter, matrix));

            let matrix = self.querier.query_range(&raw_expr(counter), &window).await?;
            counts.extend(count_to_count(&settings.metric_namespace, counter, matrix));
        }
        info!("Received {} rate series", rates.len());
        info!("Received {} count series", counts.len());

        batch.extend(rates);
        batch.extend(counts);

        debug!("Submitting {} series to Datadog", batch.len());
        self.submitter.submit_metrics(&batch).await?;
        info!("Submitted total of {} series", batch.len());

        Ok(())
    }
}
