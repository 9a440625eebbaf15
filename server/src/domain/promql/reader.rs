//! Remote read orchestration
//!
//! Each sub-query runs sequentially: convert matchers, infer the metric kind,
//! build SQL, execute, map rows. The first failure aborts the batch.

use std::collections::HashMap;
use std::sync::Arc;

use super::builder::QueryBuilder;
use super::error::ReadError;
use super::executor::{ReadContext, SqlExecutor};
use super::infer::infer_metric_kind;
use super::mapper::map_rows;
use super::prompb;
use super::types::{LabelMatcher, METRIC_NAME_LABEL, MatchOp, TimeRange};

/// Default upper bound on sub-queries per request
pub const DEFAULT_MAX_QUERIES: usize = 64;

/// Serves remote read requests against an [`SqlExecutor`]
#[derive(Clone)]
pub struct Reader {
    executor: Arc<dyn SqlExecutor>,
    builder: QueryBuilder,
    max_queries: usize,
}

impl Reader {
    pub fn new(executor: Arc<dyn SqlExecutor>, builder: QueryBuilder) -> Self {
        Self {
            executor,
            builder,
            max_queries: DEFAULT_MAX_QUERIES,
        }
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = max_queries;
        self
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Answer every sub-query of `request`, results in request order
    pub async fn read(
        &self,
        ctx: &ReadContext,
        request: &prompb::ReadRequest,
    ) -> Result<prompb::ReadResponse, ReadError> {
        if request.queries.len() > self.max_queries {
            return Err(ReadError::TooManyQueries {
                count: request.queries.len(),
                max: self.max_queries,
            });
        }

        let mut results = Vec::with_capacity(request.queries.len());
        for (index, query) in request.queries.iter().enumerate() {
            let timeseries = self.read_query(ctx, index, query).await?;
            results.push(prompb::QueryResult { timeseries });
        }

        Ok(prompb::ReadResponse { results })
    }

    async fn read_query(
        &self,
        ctx: &ReadContext,
        index: usize,
        query: &prompb::Query,
    ) -> Result<Vec<prompb::TimeSeries>, ReadError> {
        let matchers = convert_matchers(&query.matchers)?;
        let range = TimeRange::from_millis(query.start_timestamp_ms, query.end_timestamp_ms)?;

        let input = InferenceInput::new(&matchers, query.hints.as_ref());
        let kind = infer_metric_kind(&input.query_text, &input.metric_name, &input.labels);
        let sql = self.builder.build_query(&range, &matchers, kind)?;

        tracing::debug!(
            query = index,
            kind = %kind,
            table = self.builder.tables().table(kind).unwrap_or_default(),
            matchers = matchers.len(),
            range = %range,
            "Executing remote read query"
        );
        tracing::trace!(query = index, sql = %sql, "Generated SQL");

        let mut cursor = self.executor.execute(ctx, &sql).await.map_err(|source| {
            ReadError::Execution {
                query: index,
                source,
            }
        })?;

        let mapped = map_rows(cursor.as_mut()).await;
        let closed = cursor.close().await;

        let series = mapped.map_err(|source| {
            if let Err(e) = &closed {
                tracing::warn!(query = index, error = %e, "Failed to close cursor");
            }
            ReadError::Scan {
                query: index,
                source,
            }
        })?;
        closed.map_err(|source| ReadError::Execution {
            query: index,
            source,
        })?;

        tracing::debug!(
            query = index,
            series = series.len(),
            "Remote read query done"
        );
        Ok(series)
    }
}

/// Convert wire matchers, rejecting unknown operator codes
pub fn convert_matchers(matchers: &[prompb::LabelMatcher]) -> Result<Vec<LabelMatcher>, ReadError> {
    matchers
        .iter()
        .map(|m| {
            let op = MatchOp::from_wire(m.r#type).ok_or_else(|| {
                ReadError::InvalidMatcherOperator {
                    name: m.name.clone(),
                    code: m.r#type,
                }
            })?;
            Ok(LabelMatcher::new(op, m.name.as_str(), m.value.as_str()))
        })
        .collect()
}

/// Inputs for kind inference, synthesized from matchers and read hints since
/// remote read carries no query text
#[derive(Debug, Default, PartialEq)]
struct InferenceInput {
    query_text: String,
    metric_name: String,
    labels: HashMap<String, String>,
}

impl InferenceInput {
    fn new(matchers: &[LabelMatcher], hints: Option<&prompb::ReadHints>) -> Self {
        let metric_name = matchers
            .iter()
            .find(|m| m.op == MatchOp::Equal && m.name == METRIC_NAME_LABEL)
            .map(|m| m.value.clone())
            .unwrap_or_default();

        let mut labels: HashMap<String, String> = matchers
            .iter()
            .filter(|m| m.op == MatchOp::Equal && m.name != METRIC_NAME_LABEL)
            .map(|m| (m.name.clone(), m.value.clone()))
            .collect();

        let query_text = match hints {
            Some(hints) => {
                if hints.by {
                    for label in &hints.grouping {
                        labels.entry(label.clone()).or_default();
                    }
                }
                if hints.func.is_empty() {
                    metric_name.clone()
                } else if hints.range_ms > 0 {
                    format!(
                        "{}({}[{}])",
                        hints.func,
                        metric_name,
                        format_duration_ms(hints.range_ms)
                    )
                } else {
                    format!("{}({})", hints.func, metric_name)
                }
            }
            None => metric_name.clone(),
        };

        Self {
            query_text,
            metric_name,
            labels,
        }
    }
}

/// PromQL duration in the largest whole unit: `300000` -> `5m`
fn format_duration_ms(ms: i64) -> String {
    const UNITS: [(i64, &str); 4] = [(3_600_000, "h"), (60_000, "m"), (1_000, "s"), (1, "ms")];
    UNITS
        .iter()
        .find(|(size, _)| ms % size == 0)
        .map(|(size, unit)| format!("{}{}", ms / size, unit))
        .unwrap_or_else(|| format!("{}ms", ms))
}
