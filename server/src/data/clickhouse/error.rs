//! ClickHouse error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClickhouseError {
    #[error("Database error: {0}")]
    Database(#[from] clickhouse::error::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid timestamp in column {column}: {nanos}ns")]
    InvalidTimestamp { column: &'static str, nanos: i128 },
}
