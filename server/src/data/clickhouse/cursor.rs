//! Typed row cursors over the OTel metrics tables
//!
//! Each metric kind selects a different column set, so each gets its own
//! row type. All of them collapse into a [`MetricRow`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::Deserialize;
use time::OffsetDateTime;

use super::ClickhouseError;
use crate::domain::promql::builder::TIMESTAMP_COLUMN;
use crate::domain::promql::{
    ExecutorError, MetricKind, MetricRow, ReadContext, RowCursor, SqlQuery,
};

/// Row of `otel_metrics_gauge` / `otel_metrics_sum`
#[derive(Row, Deserialize)]
struct ChScalarRow {
    #[serde(with = "clickhouse::serde::time::datetime64::nanos")]
    timestamp: OffsetDateTime,
    value: f64,
    metric_name: String,
    service_name: String,
    resource_attributes: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
}

/// Row of `otel_metrics_histogram`
///
/// Bucket columns are scanned only to match the SELECT shape; the sample value
/// is the `Sum` column.
#[derive(Row, Deserialize)]
struct ChHistogramRow {
    #[serde(with = "clickhouse::serde::time::datetime64::nanos")]
    timestamp: OffsetDateTime,
    value: f64,
    #[allow(dead_code)]
    bucket_counts: Vec<u64>,
    #[allow(dead_code)]
    explicit_bounds: Vec<f64>,
    metric_name: String,
    service_name: String,
    resource_attributes: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
}

/// Row of `otel_metrics_summary`
///
/// Count and quantile columns are scanned only to match the SELECT shape; the
/// sample value is the `Sum` column.
#[derive(Row, Deserialize)]
struct ChSummaryRow {
    #[serde(with = "clickhouse::serde::time::datetime64::nanos")]
    timestamp: OffsetDateTime,
    value: f64,
    #[allow(dead_code)]
    count: u64,
    #[allow(dead_code)]
    quantiles: Vec<f64>,
    #[allow(dead_code)]
    quantile_values: Vec<f64>,
    metric_name: String,
    service_name: String,
    resource_attributes: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
}

fn to_utc(ts: OffsetDateTime) -> Result<DateTime<Utc>, ClickhouseError> {
    let nanos = ts.unix_timestamp_nanos();
    i64::try_from(nanos)
        .map(DateTime::from_timestamp_nanos)
        .map_err(|_| ClickhouseError::InvalidTimestamp {
            column: TIMESTAMP_COLUMN,
            nanos,
        })
}

impl TryFrom<ChScalarRow> for MetricRow {
    type Error = ClickhouseError;

    fn try_from(row: ChScalarRow) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: to_utc(row.timestamp)?,
            value: row.value,
            metric_name: row.metric_name,
            service_name: row.service_name,
            resource_attributes: row.resource_attributes,
            attributes: row.attributes,
        })
    }
}

impl TryFrom<ChHistogramRow> for MetricRow {
    type Error = ClickhouseError;

    fn try_from(row: ChHistogramRow) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: to_utc(row.timestamp)?,
            value: row.value,
            metric_name: row.metric_name,
            service_name: row.service_name,
            resource_attributes: row.resource_attributes,
            attributes: row.attributes,
        })
    }
}

impl TryFrom<ChSummaryRow> for MetricRow {
    type Error = ClickhouseError;

    fn try_from(row: ChSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: to_utc(row.timestamp)?,
            value: row.value,
            metric_name: row.metric_name,
            service_name: row.service_name,
            resource_attributes: row.resource_attributes,
            attributes: row.attributes,
        })
    }
}

enum Inner {
    Scalar(clickhouse::query::RowCursor<ChScalarRow>),
    Histogram(clickhouse::query::RowCursor<ChHistogramRow>),
    Summary(clickhouse::query::RowCursor<ChSummaryRow>),
}

impl Inner {
    async fn next(&mut self) -> Result<Option<MetricRow>, ClickhouseError> {
        match self {
            Self::Scalar(c) => c.next().await?.map(MetricRow::try_from).transpose(),
            Self::Histogram(c) => c.next().await?.map(MetricRow::try_from).transpose(),
            Self::Summary(c) => c.next().await?.map(MetricRow::try_from).transpose(),
        }
    }
}

/// Streaming cursor bound to the [`ReadContext`] of the read that opened it.
///
/// Every fetch races the context; a cancelled or expired context stops the
/// stream and drops the HTTP response.
pub struct ClickhouseCursor {
    inner: Option<Inner>,
    ctx: ReadContext,
}

impl ClickhouseCursor {
    /// Start streaming `query`. The request is sent lazily on the first fetch.
    pub(super) fn open(
        client: &Client,
        ctx: &ReadContext,
        query: &SqlQuery,
    ) -> Result<Self, ClickhouseError> {
        let sql = escape_placeholders(query.as_str());
        let q = client.query(&sql);
        let inner = match query.kind() {
            MetricKind::Gauge | MetricKind::Sum => Inner::Scalar(q.fetch()?),
            MetricKind::Histogram => Inner::Histogram(q.fetch()?),
            MetricKind::Summary => Inner::Summary(q.fetch()?),
        };
        Ok(Self {
            inner: Some(inner),
            ctx: ctx.clone(),
        })
    }
}

#[async_trait]
impl RowCursor for ClickhouseCursor {
    async fn next(&mut self) -> Result<Option<MetricRow>, ExecutorError> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };

        let result = tokio::select! {
            reason = self.ctx.done() => Err(reason),
            row = inner.next() => row.map_err(ExecutorError::backend),
        };
        if result.is_err() {
            self.inner = None;
        }
        result
    }

    async fn close(&mut self) -> Result<(), ExecutorError> {
        self.inner = None;
        Ok(())
    }
}

/// The client treats `?` as a bind placeholder; generated SQL binds nothing,
/// so every literal `?` (e.g. in regex values) is doubled.
pub fn escape_placeholders(sql: &str) -> String {
    sql.replace('?', "??")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_row() -> ChScalarRow {
        ChScalarRow {
            timestamp: OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789)
                .unwrap(),
            value: 42.5,
            metric_name: "queue_depth".to_string(),
            service_name: "worker".to_string(),
            resource_attributes: vec![("host".to_string(), "h1".to_string())],
            attributes: vec![("queue".to_string(), "emails".to_string())],
        }
    }

    #[test]
    fn test_scalar_row_conversion() {
        let row = MetricRow::try_from(scalar_row()).unwrap();
        assert_eq!(
            row.timestamp.timestamp_nanos_opt(),
            Some(1_700_000_000_123_456_789)
        );
        assert_eq!(row.timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(row.value, 42.5);
        assert_eq!(row.metric_name, "queue_depth");
        assert_eq!(row.service_name, "worker");
        assert_eq!(
            row.attributes,
            vec![("queue".to_string(), "emails".to_string())]
        );
    }

    #[test]
    fn test_histogram_row_uses_sum_as_value() {
        let row = MetricRow::try_from(ChHistogramRow {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            value: 12.0,
            bucket_counts: vec![1, 2, 3],
            explicit_bounds: vec![0.1, 1.0],
            metric_name: "latency".to_string(),
            service_name: String::new(),
            resource_attributes: vec![],
            attributes: vec![],
        })
        .unwrap();
        assert_eq!(row.value, 12.0);
        assert_eq!(row.timestamp, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_summary_row_uses_sum_as_value() {
        let row = MetricRow::try_from(ChSummaryRow {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            value: 7.5,
            count: 3,
            quantiles: vec![0.5, 0.99],
            quantile_values: vec![1.0],
            metric_name: "rpc_duration".to_string(),
            service_name: "api".to_string(),
            resource_attributes: vec![],
            attributes: vec![],
        })
        .unwrap();
        assert_eq!(row.value, 7.5);
        assert_eq!(row.metric_name, "rpc_duration");
    }

    #[test]
    fn test_timestamp_outside_i64_nanos() {
        let mut row = scalar_row();
        row.timestamp = OffsetDateTime::from_unix_timestamp(10_000_000_000).unwrap();
        let err = MetricRow::try_from(row).unwrap_err();
        assert!(matches!(
            err,
            ClickhouseError::InvalidTimestamp {
                column: "TimeUnix",
                ..
            }
        ));
    }

    #[test]
    fn test_escape_placeholders() {
        assert_eq!(
            escape_placeholders("match(MetricName, 'a.b+(c)?')"),
            "match(MetricName, 'a.b+(c)??')"
        );
        assert_eq!(escape_placeholders("SELECT 1"), "SELECT 1");
    }
}
