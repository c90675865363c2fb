use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::{Result, ShipperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Startup configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub prometheus_url: Url,
    pub datadog_site: Url,
    pub datadog_api_key: String,
    pub metric_prefix: String,
    pub metric_namespace: String,
    pub quantiles: Vec<f64>,
    pub histogram_group_by: Vec<String>,
    pub query_interval: Duration,
    pub step: Duration,
    pub sleep: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, validating every value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let datadog_api_key = get("DD_API_KEY", "");
        if datadog_api_key.is_empty() {
            return Err(ShipperError::Config("DD_API_KEY must be set".to_string()));
        }

        let log_format = match get("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ShipperError::Config(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            prometheus_url: parse_base_url("PROMETHEUS_URL", &get("PROMETHEUS_URL", "http://localhost:9090"))?,
            datadog_site: parse_base_url("DD_SITE", &get("DD_SITE", "https://api.datadoghq.com"))?,
            datadog_api_key,
            metric_prefix: get("METRIC_PREFIX", "temporal_cloud_v0_"),
            metric_namespace: lookup("DD_METRIC_NAMESPACE").unwrap_or_default().trim().to_string(),
            quantiles: parse_quantiles(&get("QUANTILES", "0.5,0.9,0.95,0.99"))?,
            histogram_group_by: parse_list(&get("HISTOGRAM_GROUP_BY", "temporal_namespace,operation")),
            query_interval: parse_secs("QUERY_INTERVAL_SECS", &get("QUERY_INTERVAL_SECS", "60"))?,
            step: parse_secs("STEP_SECS", &get("STEP_SECS", "15"))?,
            sleep: parse_secs("SLEEP_SECS", &get("SLEEP_SECS", "60"))?,
            log_format,
        })
    }
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url> {
    // A trailing slash keeps any path prefix intact when joining API paths.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ShipperError::Config(format!("{} is not a valid URL ({}): {}", key, raw, e)))
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs = u64::from_str(raw)
        .map_err(|e| ShipperError::Config(format!("{} must be whole seconds, got '{}': {}", key, raw, e)))?;
    if secs == 0 {
        return Err(ShipperError::Config(format!("{} must be at least 1", key)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_quantiles(raw: &str) -> Result<Vec<f64>> {
    let mut seen = HashSet::new();
    let mut quantiles = Vec::new();
    for item in parse_list(raw) {
        // Adding zero folds -0 into 0 so both hit the duplicate check.
        let quantile = f64::from_str(&item)
            .map_err(|e| ShipperError::Config(format!("invalid quantile '{}': {}", item, e)))?
            + 0.0;
        if !(0.0..=1.0).contains(&quantile) {
            return Err(ShipperError::Config(format!(
                "quantile {} is outside [0, 1]",
                quantile
            )));
        }
        if !seen.insert(quantile.to_bits()) {
            return Err(ShipperError::Config(format!("duplicate quantile {}", quantile)));
        }
        quantiles.push(quantile);
    }

    if quantiles.is_empty() {
        return Err(ShipperError::Config("QUANTILES must not be empty".to_string()));
    }
    Ok(quantiles)
}
