//! Storage execution capability
//!
//! The read path only needs "run this SQL, hand me a cursor of rows". The
//! ClickHouse client implements these traits in production and tests use an
//! in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::builder::SqlQuery;
use super::error::ExecutorError;
use super::types::MetricRow;

/// Cancellation and deadline carried into every execution call.
///
/// The read path never enforces timeouts itself; executors are expected to
/// stop work once [`ReadContext::done`] resolves.
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ReadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled together with `parent`
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is finished, if it is
    pub fn err(&self) -> Option<ExecutorError> {
        if self.cancel.is_cancelled() {
            Some(ExecutorError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ExecutorError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> ExecutorError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => ExecutorError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ExecutorError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                ExecutorError::Cancelled
            }
        }
    }
}

/// Sequential, closeable handle over result rows.
///
/// Owned by the single call that opened it.
#[async_trait]
pub trait RowCursor: Send {
    /// Advance and scan the next row; `None` once exhausted
    async fn next(&mut self) -> Result<Option<MetricRow>, ExecutorError>;

    /// Release the underlying resources. Safe to call more than once.
    async fn close(&mut self) -> Result<(), ExecutorError>;
}

/// Executes generated SQL against the metrics store
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &ReadContext,
        query: &SqlQuery,
    ) -> Result<Box<dyn RowCursor>, ExecutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_not_done_initially() {
        let ctx = ReadContext::new();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn test_context_cancel() {
        let ctx = ReadContext::new();
        ctx.cancel();
        assert!(matches!(ctx.err(), Some(ExecutorError::Cancelled)));
        assert!(matches!(ctx.done().await, ExecutorError::Cancelled));
    }

    #[tokio::test]
    async fn test_child_context_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = ReadContext::child_of(&parent);
        assert!(ctx.err().is_none());
        parent.cancel();
        assert!(matches!(ctx.err(), Some(ExecutorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_context_deadline() {
        let ctx = ReadContext::new().with_timeout(Duration::from_millis(20));
        assert!(ctx.err().is_none());

        let reason = ctx.done().await;
        assert!(matches!(reason, ExecutorError::DeadlineExceeded));
        assert!(matches!(ctx.err(), Some(ExecutorError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_context_past_deadline() {
        let ctx = ReadContext::new().with_deadline(Instant::now());
        assert!(matches!(ctx.err(), Some(ExecutorError::DeadlineExceeded)));
    }
}
