//! Metric kind inference
//!
//! Remote read requests do not say which OTel table a metric lives in. The
//! kind is guessed from the query shape, the metric name and the labels in
//! play. Branch order matters: the first matching rule wins.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::MetricKind;

/// Functions usually applied to counters
const COUNTER_FUNCTIONS: &[&str] = &[
    "rate",
    "irate",
    "increase",
    "sum_over_time",
    "count_over_time",
];

const COUNTER_SUFFIXES: &[&str] = &["_total", "_count"];

/// Label carrying histogram bucket upper bounds
const BUCKET_BOUNDARY_LABEL: &str = "le";

/// Characters that may appear in a PromQL identifier
const IDENT_CHARS: &str = "A-Za-z0-9_:";

static COUNTER_CALL: LazyLock<Regex> =
    LazyLock::new(|| call_regex(&COUNTER_FUNCTIONS.join("|")));
static HISTOGRAM_QUANTILE_CALL: LazyLock<Regex> =
    LazyLock::new(|| call_regex("histogram_quantile"));
static DERIV_CALL: LazyLock<Regex> = LazyLock::new(|| call_regex("deriv"));

/// Case-insensitive regex matching a call to one of `functions` (alternation),
/// not preceded by another identifier character
fn call_regex(functions: &str) -> Regex {
    Regex::new(&format!(r"(?i)(?:^|[^{IDENT_CHARS}])(?:{functions})\s*\("))
        .expect("Invalid regex")
}

/// Guess the OTel metric kind for `metric_name` as used in `query`
pub fn infer_metric_kind(
    query: &str,
    metric_name: &str,
    labels: &HashMap<String, String>,
) -> MetricKind {
    let name = metric_name.to_lowercase();

    if COUNTER_SUFFIXES.iter().any(|s| name.ends_with(s)) && COUNTER_CALL.is_match(query) {
        return MetricKind::Sum;
    }

    // Counter functions applied straight to a metric without a counter suffix
    // are treated as gauge usage.
    if !name.is_empty() && applies_counter_function(query, metric_name) {
        return MetricKind::Gauge;
    }

    let quantile = HISTOGRAM_QUANTILE_CALL.is_match(query);

    if (name.ends_with("_bucket") || labels.contains_key(BUCKET_BOUNDARY_LABEL)) && quantile {
        return MetricKind::Histogram;
    }

    if name.ends_with("_sum") {
        return if quantile {
            MetricKind::Summary
        } else {
            MetricKind::Sum
        };
    }

    if DERIV_CALL.is_match(query) {
        return MetricKind::Gauge;
    }

    MetricKind::Gauge
}

/// Whether `query` contains `f(metric_name ...)` for any counter function `f`,
/// with `metric_name` as a whole identifier
fn applies_counter_function(query: &str, metric_name: &str) -> bool {
    let pattern = format!(
        r"(?i)(?:^|[^{IDENT_CHARS}])(?:{})\s*\(\s*{}(?:[^{IDENT_CHARS}]|$)",
        COUNTER_FUNCTIONS.join("|"),
        regex::escape(metric_name)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(query),
        Err(e) => {
            tracing::debug!(error = %e, metric_name, "Skipping function match for metric");
            false
        }
    }
}
