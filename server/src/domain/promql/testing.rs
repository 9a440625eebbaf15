//! In-memory executor for read path tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;

use super::builder::SqlQuery;
use super::error::ExecutorError;
use super::executor::{ReadContext, RowCursor, SqlExecutor};
use super::types::MetricRow;

/// Canned outcome for one `execute` call
pub enum FakeResponse {
    Rows(Vec<MetricRow>),
    /// Yields `rows`, then fails the next scan with `message`
    ScanError {
        rows: Vec<MetricRow>,
        message: String,
    },
    ExecuteError(String),
}

/// Records executed SQL and replays canned responses in call order.
/// Calls beyond the queued responses return no rows.
#[derive(Default)]
pub struct FakeExecutor {
    responses: Mutex<VecDeque<FakeResponse>>,
    executed: Mutex<Vec<SqlQuery>>,
    closed: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: FakeResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_rows(self, rows: Vec<MetricRow>) -> Self {
        self.respond(FakeResponse::Rows(rows))
    }

    pub fn executed(&self) -> Vec<SqlQuery> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().iter().map(|q| q.to_string()).collect()
    }

    /// Number of cursors closed so far
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    async fn execute(
        &self,
        ctx: &ReadContext,
        query: &SqlQuery,
    ) -> Result<Box<dyn RowCursor>, ExecutorError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        self.executed.lock().unwrap().push(query.clone());

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FakeResponse::Rows(Vec::new()));

        let rows: VecDeque<_> = match response {
            FakeResponse::Rows(rows) => rows.into_iter().map(Ok).collect(),
            FakeResponse::ScanError { rows, message } => rows
                .into_iter()
                .map(Ok)
                .chain([Err(ExecutorError::backend(message))])
                .collect(),
            FakeResponse::ExecuteError(message) => {
                return Err(ExecutorError::backend(message));
            }
        };

        Ok(Box::new(FakeCursor {
            rows,
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

struct FakeCursor {
    rows: VecDeque<Result<MetricRow, ExecutorError>>,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

#[async_trait]
impl RowCursor for FakeCursor {
    async fn next(&mut self) -> Result<Option<MetricRow>, ExecutorError> {
        self.rows.pop_front().transpose()
    }

    async fn close(&mut self) -> Result<(), ExecutorError> {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Gauge-shaped row with one resource and one point attribute
pub fn sample_row(metric_name: &str, ts_ms: i64, value: f64) -> MetricRow {
    MetricRow {
        timestamp: DateTime::from_timestamp_millis(ts_ms).unwrap(),
        value,
        metric_name: metric_name.to_string(),
        service_name: "api".to_string(),
        resource_attributes: vec![("host".to_string(), "node-1".to_string())],
        attributes: vec![("code".to_string(), "200".to_string())],
    }
}
