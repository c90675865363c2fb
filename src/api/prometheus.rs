use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{MetricsQuerier, REQUEST_TIMEOUT};
use crate::{
    metrics,
    models::{MetricCatalog, Sample, SampleMatrix, SampleStream},
    window::QueryWindow,
    Result, ShipperError,
};

/// Envelope shared by every Prometheus HTTP API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_data(self) -> std::result::Result<T, String> {
        if self.status != "success" {
            return Err(format!(
                "{}: {}",
                self.error_type.unwrap_or_else(|| self.status.clone()),
                self.error.unwrap_or_default()
            ));
        }
        self.data.ok_or_else(|| "response carried no data".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RangeData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<RangeStream>,
}

#[derive(Debug, Deserialize)]
struct RangeStream {
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Client for the Prometheus HTTP query API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    base_url: Url,
}

impl PrometheusClient {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ShipperError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ShipperError::Config(format!("Invalid Prometheus URL: {}", e)))
    }
}

#[async_trait]
impl MetricsQuerier for PrometheusClient {
    async fn list_metrics(&self, prefix: &str) -> Result<MetricCatalog> {
        let url = self.endpoint("api/v1/label/__name__/values")?;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ShipperError::Discovery(format!("Failed to list metrics: {}", e)))?
            .text()
            .await
            .map_err(|e| ShipperError::Discovery(format!("Failed to read metric list: {}", e)))?;

        let names = parse_label_values(&body).map_err(ShipperError::Discovery)?;
        Ok(MetricCatalog::from_names(prefix, names))
    }

    async fn query_range(&self, expr: &str, window: &QueryWindow) -> Result<SampleMatrix> {
        let url = self.endpoint("api/v1/query_range")?;
        debug!("Range query {} [{} .. {}]", expr, window.start, window.end);
        metrics::record_query();

        let body = self
            .client
            .get(url)
            .query(&[
                ("query", expr.to_string()),
                ("start", window.start_secs().to_string()),
                ("end", window.end_secs().to_string()),
                ("step", window.step_secs().to_string()),
            ])
            .send()
            .await
            .map_err(|e| ShipperError::Query(format!("{}: {}", expr, e)))?
            .text()
            .await
            .map_err(|e| ShipperError::Query(format!("{}: {}", expr, e)))?;

        parse_matrix(&body).map_err(|e| ShipperError::Query(format!("{}: {}", expr, e)))
    }
}

fn parse_label_values(body: &str) -> std::result::Result<Vec<String>, String> {
    let response: ApiResponse<Vec<String>> =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {}", e))?;
    response.into_data()
}

fn parse_matrix(body: &str) -> std::result::Result<SampleMatrix, String> {
    let response: ApiResponse<RangeData> =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {}", e))?;
    let data = response.into_data()?;
    if data.result_type != "matrix" {
        return Err(format!("expected a matrix result, got {}", data.result_type));
    }

    data.result
        .into_iter()
        .map(|stream| {
            let samples = stream
                .values
                .into_iter()
                .map(|(timestamp, value)| {
                    value
                        .parse::<f64>()
                        .map(|value| Sample::new(timestamp as i64, value))
                        .map_err(|e| format!("bad sample value {:?}: {}", value, e))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(SampleStream {
                labels: stream.metric,
                samples,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matrix() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {
                        "metric": {"operation": "Poll", "temporal_namespace": "prod"},
                        "values": [[1709294400, "0.25"], [1709294415, "NaN"], [1709294430, "+Inf"]]
                    },
                    {"metric": {}, "values": []}
                ]
            }
        }"#;

        let matrix = parse_matrix(body).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].labels["operation"], "Poll");
        assert_eq!(matrix[0].samples[0], Sample::new(1709294400, 0.25));
        assert!(matrix[0].samples[1].value.is_nan());
        assert_eq!(matrix[0].samples[2].value, f64::INFINITY);
        assert!(matrix[1].samples.is_empty());
    }

    #[test]
    fn test_parse_matrix_rejects_errors() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
        let err = parse_matrix(body).unwrap_err();
        assert!(err.contains("bad_data"));
        assert!(err.contains("parse error"));

        let vector = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        assert!(parse_matrix(vector).unwrap_err().contains("vector"));

        assert!(parse_matrix("<html>").is_err());
    }

    #[test]
    fn test_parse_label_values() {
        let body = r#"{"status":"success","data":["a_bucket","b_total"]}"#;
        assert_eq!(parse_label_values(body).unwrap(), vec!["a_bucket", "b_total"]);
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = PrometheusClient::new(Url::parse("http://prom:9090/").unwrap()).unwrap();
        assert_eq!(
            client.endpoint("api/v1/query_range").unwrap().as_str(),
            "http://prom:9090/api/v1/query_range"
        );
    }
}
