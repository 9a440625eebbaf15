//! Core types for translating remote read queries into OTel metric scans

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use super::error::ReadError;

/// Label name Prometheus uses for the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label name mapped onto the dedicated `ServiceName` column
pub const SERVICE_NAME_LABEL: &str = "service_name";

/// Label matcher operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Equal,
    NotEqual,
    RegexMatch,
    RegexNotMatch,
}

impl MatchOp {
    /// Map a remote read wire code (0=EQ, 1=NEQ, 2=RE, 3=NRE)
    pub fn from_wire(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Equal),
            1 => Some(Self::NotEqual),
            2 => Some(Self::RegexMatch),
            3 => Some(Self::RegexNotMatch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNotMatch => "!~",
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `name <op> value` label filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    pub name: String,
    pub value: String,
    pub op: MatchOp,
}

impl LabelMatcher {
    pub fn new(op: MatchOp, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            op,
        }
    }

    /// Parse the textual form `name=value`, `name!=value`, `name=~re` or `name!~re`.
    /// Surrounding double quotes on the value are stripped.
    pub fn parse(s: &str) -> Option<Self> {
        let (idx, op, op_len) = [
            ("!=", MatchOp::NotEqual),
            ("=~", MatchOp::RegexMatch),
            ("!~", MatchOp::RegexNotMatch),
        ]
        .iter()
        .filter_map(|(tok, op)| s.find(tok).map(|i| (i, *op, tok.len())))
        .chain(s.find('=').map(|i| (i, MatchOp::Equal, 1)))
        .min_by_key(|(i, op, _)| (*i, *op == MatchOp::Equal))?;

        let name = s[..idx].trim();
        if name.is_empty() {
            return None;
        }
        let value = s[idx + op_len..].trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(Self::new(op, name, value))
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.op, self.value)
    }
}

/// OpenTelemetry metric kind; each kind lives in its own table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Sum,
    Histogram,
    Summary,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [Self::Gauge, Self::Sum, Self::Histogram, Self::Summary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Sum => "sum",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gauge" => Ok(Self::Gauge),
            "sum" => Ok(Self::Sum),
            "histogram" => Ok(Self::Histogram),
            "summary" => Ok(Self::Summary),
            _ => Err(ReadError::UnsupportedMetricKind(s.to_string())),
        }
    }
}

/// Read-only mapping from metric kind to its backing table.
///
/// Built once at startup and shared between builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    tables: HashMap<MetricKind, String>,
}

impl TableMapping {
    /// Default table base name used by the OpenTelemetry ClickHouse exporter
    pub const DEFAULT_BASE: &'static str = "otel_metrics";

    /// Tables named `<base>_gauge`, `<base>_sum`, `<base>_histogram`, `<base>_summary`
    pub fn from_base(base: &str) -> Self {
        MetricKind::ALL
            .into_iter()
            .map(|kind| (kind, format!("{}_{}", base, kind.as_str())))
            .collect()
    }

    pub fn table(&self, kind: MetricKind) -> Option<&str> {
        self.tables.get(&kind).map(String::as_str)
    }
}

impl Default for TableMapping {
    fn default() -> Self {
        Self::from_base(Self::DEFAULT_BASE)
    }
}

impl<S: Into<String>> FromIterator<(MetricKind, S)> for TableMapping {
    fn from_iter<I: IntoIterator<Item = (MetricKind, S)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().map(|(k, t)| (k, t.into())).collect(),
        }
    }
}

/// Earliest instant a `DateTime64(9)` column holds (1900-01-01 00:00:00 UTC)
pub const DATETIME64_MIN_MS: i64 = -2_208_988_800_000;

/// Latest instant a `DateTime64(9)` column holds (2262-04-11 23:47:16 UTC)
pub const DATETIME64_MAX_MS: i64 = 9_223_372_036_000;

/// Inclusive time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Build from remote read millisecond timestamps.
    ///
    /// Bounds are clamped to the `DateTime64(9)` range, so open-ended
    /// lookups (Prometheus sends its MinTime/MaxTime) cover all stored data.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self, ReadError> {
        if start_ms > end_ms {
            return Err(ReadError::InvalidTimeRange { start_ms, end_ms });
        }
        Ok(Self {
            start: clamped_millis(start_ms),
            end: clamped_millis(end_ms),
        })
    }
}

fn clamped_millis(ms: i64) -> DateTime<Utc> {
    let ms = ms.clamp(DATETIME64_MIN_MS, DATETIME64_MAX_MS);
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// One scanned row from an OTel metrics table.
///
/// Field order follows the SELECT column order of the generated query.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub metric_name: String,
    pub service_name: String,
    pub resource_attributes: Vec<(String, String)>,
    pub attributes: Vec<(String, String)>,
}
