//! PromQL expressions issued during a tick.

/// One quantile of one histogram bucket metric, with its expression.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramQuery {
    pub quantile: f64,
    pub bucket_name: String,
    pub expr: String,
}

pub fn histogram_expr(quantile: f64, bucket_name: &str, group_by: &[String]) -> String {
    let mut labels = group_by.to_vec();
    labels.push("le".to_string());
    format!(
        "histogram_quantile({}, sum(rate({}[1m])) by ({}))",
        quantile,
        bucket_name,
        labels.join(",")
    )
}

pub fn rate_expr(counter_name: &str) -> String {
    format!("rate({}[1m])", counter_name)
}

pub fn raw_expr(counter_name: &str) -> String {
    counter_name.to_string()
}

/// Cross product of quantiles and bucket names, quantile-major.
pub fn histogram_queries<'a, I>(
    quantiles: &'a [f64],
    bucket_names: I,
    group_by: &'a [String],
) -> impl Iterator<Item = HistogramQuery> + 'a
where
    I: IntoIterator<Item = &'a String>,
    I::IntoIter: Clone + 'a,
{
    let bucket_names = bucket_names.into_iter();
    quantiles.iter().flat_map(move |&quantile| {
        bucket_names.clone().map(move |bucket_name| HistogramQuery {
            quantile,
            bucket_name: bucket_name.clone(),
            expr: histogram_expr(quantile, bucket_name, group_by),
        })
    })
}
