use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, info};

use super::{MetricsSubmitter, REQUEST_TIMEOUT};
use crate::{
    metrics,
    models::{MetricKind, TargetSeries},
    Result, ShipperError,
};

const API_KEY_HEADER: &str = "DD-API-KEY";

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: Vec<SeriesBody<'a>>,
}

#[derive(Debug, Serialize)]
struct SeriesBody<'a> {
    metric: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    points: Vec<PointBody>,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PointBody {
    timestamp: i64,
    value: f64,
}

fn kind_code(kind: MetricKind) -> u8 {
    match kind {
        MetricKind::Count => 1,
        MetricKind::Rate => 2,
        MetricKind::Gauge => 3,
    }
}

/// Builds the v2 series payload. Non-finite values have no JSON encoding,
/// so those points are left out, along with series that end up empty.
fn build_payload(batch: &[TargetSeries]) -> SeriesPayload<'_> {
    let series = batch
        .iter()
        .filter_map(|series| {
            let points: Vec<_> = series
                .points
                .iter()
                .filter(|p| p.value.is_finite())
                .map(|p| PointBody {
                    timestamp: p.timestamp,
                    value: p.value,
                })
                .collect();
            if points.is_empty() {
                return None;
            }
            Some(SeriesBody {
                metric: &series.metric_name,
                kind: kind_code(series.kind),
                points,
                tags: series
                    .tags
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect(),
            })
        })
        .collect();
    SeriesPayload { series }
}

/// Client for the Datadog v2 series intake.
#[derive(Debug, Clone)]
pub struct DatadogClient {
    client: Client,
    series_url: Url,
    api_key: String,
}

impl DatadogClient {
    pub fn new(site: Url, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ShipperError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let series_url = site
            .join("api/v2/series")
            .map_err(|e| ShipperError::Config(format!("Invalid Datadog site: {}", e)))?;

        Ok(Self {
            client,
            series_url,
            api_key,
        })
    }
}

#[async_trait]
impl MetricsSubmitter for DatadogClient {
    async fn submit_metrics(&self, batch: &[TargetSeries]) -> Result<()> {
        let payload = build_payload(batch);
        if payload.series.is_empty() {
            debug!("Nothing to submit");
            return Ok(());
        }

        let response = self
            .client
            .post(self.series_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShipperError::Submission(format!("Failed to send series: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShipperError::Submission(format!(
                "intake returned {}: {}",
                status, body
            )));
        }

        metrics::record_submitted(payload.series.len());
        info!("Datadog accepted {} series", payload.series.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn series(name: &str, kind: MetricKind, points: &[(i64, f64)]) -> TargetSeries {
        let mut tags = BTreeMap::new();
        tags.insert("operation".to_string(), "Poll".to_string());
        tags.insert("env".to_string(), "prod".to_string());
        TargetSeries {
            metric_name: name.to_string(),
            kind,
            tags,
            points: points.iter().map(|&(t, v)| Sample::new(t, v)).collect(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let batch = vec![
            series("latency_p99", MetricKind::Gauge, &[(60, 0.5)]),
            series("requests", MetricKind::Rate, &[(60, 2.0)]),
            series("requests", MetricKind::Count, &[(60, 10.0), (75, 12.0)]),
        ];
        let payload = serde_json::to_value(build_payload(&batch)).unwrap();

        assert_eq!(
            payload["series"][0],
            json!({
                "metric": "latency_p99",
                "type": 3,
                "points": [{"timestamp": 60, "value": 0.5}],
                "tags": ["env:prod", "operation:Poll"],
            })
        );
        assert_eq!(payload["series"][1]["type"], 2);
        assert_eq!(payload["series"][2]["type"], 1);
        assert_eq!(payload["series"][2]["points"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_payload_drops_non_finite_points() {
        let batch = vec![
            series("latency_p50", MetricKind::Gauge, &[(60, f64::NAN), (75, 1.0)]),
            series("latency_p99", MetricKind::Gauge, &[(60, f64::NAN), (75, f64::INFINITY)]),
        ];
        let payload = build_payload(&batch);

        assert_eq!(payload.series.len(), 1);
        assert_eq!(payload.series[0].metric, "latency_p50");
        assert_eq!(payload.series[0].points.len(), 1);
        assert_eq!(payload.series[0].points[0].timestamp, 75);
    }

    #[test]
    fn test_series_url() {
        let client = DatadogClient::new(
            Url::parse("https://api.datadoghq.eu/").unwrap(),
            "key".to_string(),
        )
        .unwrap();
        assert_eq!(client.series_url.as_str(), "https://api.datadoghq.eu/api/v2/series");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        // Unroutable address: any request would fail.
        let client =
            DatadogClient::new(Url::parse("http://127.0.0.1:1/").unwrap(), "key".to_string())
                .unwrap();
        tokio_test::assert_ok!(client.submit_metrics(&[]).await);

        let only_nan = vec![series("latency_p50", MetricKind::Gauge, &[(60, f64::NAN)])];
        tokio_test::assert_ok!(client.submit_metrics(&only_nan).await);
    }
}
