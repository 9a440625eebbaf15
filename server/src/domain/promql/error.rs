//! Remote read error types

use thiserror::Error;

/// Error raised by an [`SqlExecutor`](super::SqlExecutor) or its cursor
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("query cancelled")]
    Cancelled,

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExecutorError {
    pub fn backend(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(e.into())
    }
}

/// Failure of a remote read batch. The first failing sub-query aborts the batch.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("unsupported metric kind: {0}")]
    UnsupportedMetricKind(String),

    #[error("invalid matcher operator {code} for label {name:?}")]
    InvalidMatcherOperator { name: String, code: i32 },

    #[error("invalid time range: start {start_ms}ms is after end {end_ms}ms")]
    InvalidTimeRange { start_ms: i64, end_ms: i64 },

    #[error("too many queries in read request: {count} (max {max})")]
    TooManyQueries { count: usize, max: usize },

    #[error("query {query} failed to execute: {source}")]
    Execution {
        query: usize,
        #[source]
        source: ExecutorError,
    },

    #[error("query {query} failed to scan rows: {source}")]
    Scan {
        query: usize,
        #[source]
        source: ExecutorError,
    },
}

impl ReadError {
    /// Whether the error stems from the request itself rather than the backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMetricKind(_)
                | Self::InvalidMatcherOperator { .. }
                | Self::InvalidTimeRange { .. }
                | Self::TooManyQueries { .. }
        )
    }

    /// Whether the read was stopped by cancellation or its deadline
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Execution { source, .. } | Self::Scan { source, .. }
                if matches!(source, ExecutorError::Cancelled | ExecutorError::DeadlineExceeded)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_metric_kind_display() {
        let err = ReadError::UnsupportedMetricKind("exponential_histogram".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported metric kind: exponential_histogram"
        );
    }

    #[test]
    fn test_invalid_operator_display() {
        let err = ReadError::InvalidMatcherOperator {
            name: "job".to_string(),
            code: 7,
        };
        assert_eq!(
            err.to_string(),
            "invalid matcher operator 7 for label \"job\""
        );
    }

    #[test]
    fn test_execution_error_keeps_source() {
        let err = ReadError::Execution {
            query: 2,
            source: ExecutorError::backend("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "query 2 failed to execute: connection refused"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_error_classification() {
        let inverted = ReadError::InvalidTimeRange {
            start_ms: 1,
            end_ms: 0,
        };
        assert!(inverted.is_client_error());
        let too_many = ReadError::TooManyQueries { count: 3, max: 2 };
        assert!(too_many.is_client_error());

        let cancelled = ReadError::Scan {
            query: 0,
            source: ExecutorError::Cancelled,
        };
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_client_error());

        let deadline = ReadError::Execution {
            query: 0,
            source: ExecutorError::DeadlineExceeded,
        };
        assert!(deadline.is_cancelled());

        let backend = ReadError::Execution {
            query: 0,
            source: ExecutorError::backend("boom"),
        };
        assert!(!backend.is_cancelled());
        assert!(!backend.is_client_error());
    }
}
