//! SQL generation for one remote read sub-query

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::ReadError;
use super::predicate::build_predicate;
use super::types::{LabelMatcher, MetricKind, TableMapping, TimeRange};

/// Timestamp column shared by all OTel metric tables
pub const TIMESTAMP_COLUMN: &str = "TimeUnix";

/// Generated SQL statement, bound to the metric kind whose table it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    sql: String,
    kind: MetricKind,
}

impl SqlQuery {
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Builds SELECT statements against the OTel metrics tables
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    tables: Arc<TableMapping>,
}

impl QueryBuilder {
    pub fn new(tables: Arc<TableMapping>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &TableMapping {
        &self.tables
    }

    /// Build the query for `kind` over `range`, filtered by `matchers`.
    ///
    /// Column order: timestamp, value, kind-specific columns, metric name,
    /// service name, resource attributes, point attributes. Rows are ordered
    /// by timestamp.
    pub fn build_query(
        &self,
        range: &TimeRange,
        matchers: &[LabelMatcher],
        kind: MetricKind,
    ) -> Result<SqlQuery, ReadError> {
        let table = self
            .tables
            .table(kind)
            .ok_or_else(|| ReadError::UnsupportedMetricKind(kind.to_string()))?;

        let mut columns = vec![format!("{} AS timestamp", TIMESTAMP_COLUMN)];
        columns.extend(value_columns(kind).iter().map(|c| c.to_string()));
        columns.extend(
            [
                "MetricName AS metric_name",
                "ServiceName AS service_name",
                "ResourceAttributes AS resource_attributes",
                "Attributes AS attributes",
            ]
            .map(String::from),
        );

        let mut conditions = vec![time_range_predicate(range)];
        conditions.extend(
            matchers
                .iter()
                .map(build_predicate)
                .filter(|p| !p.is_empty())
                .map(|p| format!("({})", p)),
        );

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            columns.join(", "),
            table,
            conditions.join(" AND "),
            TIMESTAMP_COLUMN
        );

        Ok(SqlQuery { sql, kind })
    }
}

/// Value columns differ per table: the four OTel tables are not column-compatible
fn value_columns(kind: MetricKind) -> &'static [&'static str] {
    match kind {
        MetricKind::Gauge | MetricKind::Sum => &["Value AS value"],
        MetricKind::Histogram => &[
            "Sum AS value",
            "BucketCounts AS bucket_counts",
            "ExplicitBounds AS explicit_bounds",
        ],
        MetricKind::Summary => &[
            "Sum AS value",
            "Count AS count",
            "ValueAtQuantiles.Quantile AS quantiles",
            "ValueAtQuantiles.Value AS quantile_values",
        ],
    }
}

fn time_range_predicate(range: &TimeRange) -> String {
    format!(
        "{} BETWEEN {} AND {}",
        TIMESTAMP_COLUMN,
        datetime64_literal(&range.start),
        datetime64_literal(&range.end)
    )
}

/// `toDateTime64('2024-01-02 03:04:05.000000000', 9, 'UTC')`
fn datetime64_literal(ts: &DateTime<Utc>) -> String {
    format!(
        "toDateTime64('{}', 9, 'UTC')",
        ts.format("%Y-%m-%d %H:%M:%S%.9f")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promql::types::MatchOp;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Arc::new(TableMapping::default()))
    }

    fn range() -> TimeRange {
        TimeRange::from_millis(1_700_000_000_000, 1_700_003_600_123).unwrap()
    }

    #[test]
    fn test_all_kinds_without_matchers() {
        let builder = builder();
        let cases = [
            (MetricKind::Gauge, "FROM otel_metrics_gauge"),
            (MetricKind::Sum, "FROM otel_metrics_sum"),
            (MetricKind::Histogram, "FROM otel_metrics_histogram"),
            (MetricKind::Summary, "FROM otel_metrics_summary"),
        ];

        for (kind, from) in cases {
            let query = builder.build_query(&range(), &[], kind).unwrap();
            let sql = query.as_str();
            assert!(sql.contains(from), "{kind}: {sql}");
            assert!(sql.contains("WHERE TimeUnix BETWEEN"), "{kind}: {sql}");
            assert!(sql.ends_with("ORDER BY TimeUnix"), "{kind}: {sql}");
            assert!(!sql.contains(" AND ("), "{kind}: {sql}");
            assert_eq!(query.kind(), kind);
        }
    }

    #[test]
    fn test_time_range_rendered_with_nanoseconds() {
        let query = builder()
            .build_query(&range(), &[], MetricKind::Gauge)
            .unwrap();
        assert!(query.as_str().contains(
            "TimeUnix BETWEEN toDateTime64('2023-11-14 22:13:20.000000000', 9, 'UTC') \
             AND toDateTime64('2023-11-14 23:13:20.123000000', 9, 'UTC')"
        ));
    }

    #[test]
    fn test_gauge_query_text() {
        let query = builder()
            .build_query(
                &range(),
                &[LabelMatcher::new(MatchOp::Equal, "__name__", "up")],
                MetricKind::Gauge,
            )
            .unwrap();
        assert_eq!(
            query.as_str(),
            "SELECT TimeUnix AS timestamp, Value AS value, MetricName AS metric_name, \
             ServiceName AS service_name, ResourceAttributes AS resource_attributes, \
             Attributes AS attributes FROM otel_metrics_gauge \
             WHERE TimeUnix BETWEEN toDateTime64('2023-11-14 22:13:20.000000000', 9, 'UTC') \
             AND toDateTime64('2023-11-14 23:13:20.123000000', 9, 'UTC') \
             AND (MetricName = 'up') ORDER BY TimeUnix"
        );
    }

    #[test]
    fn test_histogram_selects_buckets() {
        let query = builder()
            .build_query(&range(), &[], MetricKind::Histogram)
            .unwrap();
        assert!(query.as_str().starts_with(
            "SELECT TimeUnix AS timestamp, Sum AS value, BucketCounts AS bucket_counts, \
             ExplicitBounds AS explicit_bounds, MetricName AS metric_name"
        ));
    }

    #[test]
    fn test_summary_selects_quantiles() {
        let query = builder()
            .build_query(&range(), &[], MetricKind::Summary)
            .unwrap();
        assert!(query.as_str().starts_with(
            "SELECT TimeUnix AS timestamp, Sum AS value, Count AS count, \
             ValueAtQuantiles.Quantile AS quantiles, ValueAtQuantiles.Value AS quantile_values, \
             MetricName AS metric_name"
        ));
    }

    #[test]
    fn test_sum_with_matchers() {
        let matchers = [
            LabelMatcher::new(MatchOp::Equal, "__name__", "http_requests_total"),
            LabelMatcher::new(MatchOp::Equal, "service_name", "api_service"),
        ];
        let query = builder()
            .build_query(&range(), &matchers, MetricKind::Sum)
            .unwrap();
        let sql = query.as_str();
        assert!(sql.contains("FROM otel_metrics_sum"));
        assert!(sql.contains(" AND (MetricName = 'http_requests_total')"));
        assert!(sql.contains(" AND (ServiceName = 'api_service')"));
    }

    #[test]
    fn test_attribute_matchers_are_parenthesized() {
        let matchers = [
            LabelMatcher::new(MatchOp::RegexMatch, "env", "prod|staging"),
            LabelMatcher::new(MatchOp::NotEqual, "region", "us-west"),
        ];
        let query = builder()
            .build_query(&range(), &matchers, MetricKind::Histogram)
            .unwrap();
        let sql = query.as_str();
        assert!(sql.contains(
            " AND ((mapContains(ResourceAttributes, 'env') \
             AND match(ResourceAttributes['env'], 'prod|staging')) \
             OR (mapContains(Attributes, 'env') AND match(Attributes['env'], 'prod|staging')))"
        ));
        assert!(sql.contains("ResourceAttributes['region'] != 'us-west'"));
    }

    #[test]
    fn test_unmapped_kind_fails() {
        let tables: TableMapping = [(MetricKind::Gauge, "otel_metrics_gauge")]
            .into_iter()
            .collect();
        let builder = QueryBuilder::new(Arc::new(tables));

        let err = builder
            .build_query(&range(), &[], MetricKind::Summary)
            .unwrap_err();
        assert!(matches!(
            err,
            ReadError::UnsupportedMetricKind(ref k) if k == "summary"
        ));
    }

    #[test]
    fn test_custom_table_base() {
        let builder = QueryBuilder::new(Arc::new(TableMapping::from_base("metrics.otel")));
        let query = builder.build_query(&range(), &[], MetricKind::Sum).unwrap();
        assert!(query.as_str().contains("FROM metrics.otel_sum WHERE"));
    }

    #[test]
    fn test_builders_share_mapping() {
        let tables = Arc::new(TableMapping::default());
        let a = QueryBuilder::new(Arc::clone(&tables));
        let b = QueryBuilder::new(Arc::clone(&tables));
        assert_eq!(Arc::strong_count(&tables), 3);
        assert_eq!(a.tables(), b.tables());
    }
}
