//! Row to time series mapping

use std::collections::BTreeMap;

use super::error::ExecutorError;
use super::executor::RowCursor;
use super::prompb::{Label, Sample, TimeSeries};
use super::types::{METRIC_NAME_LABEL, MetricRow, SERVICE_NAME_LABEL};

/// Drain `cursor` into one single-sample series per row, in delivery order.
///
/// A scan error aborts the whole mapping; rows already read are dropped.
pub async fn map_rows(cursor: &mut dyn RowCursor) -> Result<Vec<TimeSeries>, ExecutorError> {
    let mut series = Vec::new();
    while let Some(row) = cursor.next().await? {
        series.push(row_to_series(row));
    }
    Ok(series)
}

/// Convert one row. Point attributes override resource attributes with the
/// same key, and the metric and service name columns override both; labels
/// come out sorted by name.
pub fn row_to_series(row: MetricRow) -> TimeSeries {
    let mut labels: BTreeMap<String, String> = row.resource_attributes.into_iter().collect();
    labels.extend(row.attributes);
    labels.insert(METRIC_NAME_LABEL.to_string(), row.metric_name);
    if !row.service_name.is_empty() {
        labels.insert(SERVICE_NAME_LABEL.to_string(), row.service_name);
    }

    TimeSeries {
        labels: labels
            .into_iter()
            .map(|(name, value)| Label { name, value })
            .collect(),
        samples: vec![Sample {
            value: row.value,
            timestamp: row.timestamp.timestamp_millis(),
        }],
    }
}
