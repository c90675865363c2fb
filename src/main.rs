use std::process;
use std::sync::Arc;

use promql_to_datadog::{
    api::{DatadogClient, PrometheusClient},
    config::Config,
    logging, metrics,
    scheduler::Scheduler,
    worker::{SystemClock, Worker, WorkerSettings},
    Result,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = logging::init_logger(config.log_format) {
        eprintln!("{}", e);
        process::exit(1);
    }

    metrics::init_metrics();

    if let Err(e) = run(config).await {
        error!("Shipper stopped: {}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let querier = Arc::new(PrometheusClient::new(config.prometheus_url.clone())?);
    let submitter = Arc::new(DatadogClient::new(
        config.datadog_site.clone(),
        config.datadog_api_key.clone(),
    )?);
    let worker = Arc::new(Worker::new(
        querier,
        submitter,
        Arc::new(SystemClock),
        WorkerSettings::from(&config),
    ));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
    });

    info!(
        "Shipping {}* from {} to {} every {}s (query interval {}s, step {}s, quantiles {:?})",
        config.metric_prefix,
        config.prometheus_url,
        config.datadog_site,
        config.sleep.as_secs(),
        config.query_interval.as_secs(),
        config.step.as_secs(),
        config.quantiles
    );

    let result = Scheduler::new(worker, config.sleep, shutdown).run().await;

    metrics::mark_stopped();
    let totals = metrics::snapshot();
    info!(
        "Totals: {} ticks, {} failed, {} range queries, {} series submitted",
        totals.ticks, totals.failures, totals.queries, totals.series_submitted
    );

    result
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                    _ = term.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
