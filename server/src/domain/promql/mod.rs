//! Prometheus remote read over OpenTelemetry metrics tables
//!
//! - `types` - matchers, metric kinds, table mapping, scanned rows
//! - `predicate` - label matcher to SQL fragment
//! - `builder` - per-kind SELECT generation
//! - `infer` - metric kind heuristic
//! - `mapper` - rows to Prometheus time series
//! - `reader` - batch orchestration
//! - `prompb` - remote read protobuf messages

pub mod builder;
pub mod error;
pub mod executor;
pub mod infer;
pub mod mapper;
pub mod predicate;
pub mod prompb;
pub mod reader;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use builder::{QueryBuilder, SqlQuery};
pub use error::{ExecutorError, ReadError};
pub use executor::{ReadContext, RowCursor, SqlExecutor};
pub use infer::infer_metric_kind;
pub use mapper::map_rows;
pub use predicate::build_predicate;
pub use reader::{DEFAULT_MAX_QUERIES, Reader, convert_matchers};
pub use types::{LabelMatcher, MatchOp, MetricKind, MetricRow, TableMapping, TimeRange};
