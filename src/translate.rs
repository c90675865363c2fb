//! Mapping of range query results onto submission series.
//!
//! Every stream in a matrix becomes exactly one [`TargetSeries`]. Labels turn
//! into tags unchanged and points are copied in backend order.

use crate::models::{MetricKind, SampleMatrix, TargetSeries};

/// Name suffix for a quantile: `0.5 -> "p50"`, `0.99 -> "p99"`,
/// `0.999 -> "p99_9"`, `1.0 -> "p100"`.
///
/// Built from the shortest decimal form of the quantile, so distinct
/// quantiles in `[0, 1]` never share a suffix.
pub fn quantile_suffix(quantile: f64) -> String {
    if quantile >= 1.0 {
        return "p100".to_string();
    }

    let formatted = quantile.to_string();
    let mut digits = formatted
        .strip_prefix("0.")
        .map(str::to_string)
        .unwrap_or_default();
    while digits.len() < 2 {
        digits.push('0');
    }

    if digits.len() > 2 {
        let (percent, fraction) = digits.split_at(2);
        format!("p{}_{}", percent, fraction)
    } else {
        format!("p{}", digits)
    }
}

/// Target name for one quantile of a histogram bucket metric.
pub fn histogram_metric_name(namespace: &str, bucket_name: &str, quantile: f64) -> String {
    let base = bucket_name.strip_suffix("_bucket").unwrap_or(bucket_name);
    format!("{}{}_{}", namespace, base, quantile_suffix(quantile))
}

/// Quantile-over-rate results of one bucket metric become gauges.
pub fn histogram_to_gauge(
    namespace: &str,
    bucket_name: &str,
    quantile: f64,
    matrix: SampleMatrix,
) -> Vec<TargetSeries> {
    let metric_name = histogram_metric_name(namespace, bucket_name, quantile);
    convert(metric_name, MetricKind::Gauge, matrix)
}

/// Per-second rates of a counter become rate series.
pub fn count_to_rate(namespace: &str, counter_name: &str, matrix: SampleMatrix) -> Vec<TargetSeries> {
    convert(format!("{}{}", namespace, counter_name), MetricKind::Rate, matrix)
}

/// Raw counter values become count series.
pub fn count_to_count(namespace: &str, counter_name: &str, matrix: SampleMatrix) -> Vec<TargetSeries> {
    convert(format!("{}{}", namespace, counter_name), MetricKind::Count, matrix)
}

fn convert(metric_name: String, kind: MetricKind, matrix: SampleMatrix) -> Vec<TargetSeries> {
    matrix
        .into_iter()
        .map(|stream| TargetSeries {
            metric_name: metric_name.clone(),
            kind,
            tags: stream.labels,
            points: stream.samples,
        })
        .collect()
}
