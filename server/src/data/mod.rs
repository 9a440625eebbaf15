//! Data storage layer
//!
//! - `clickhouse` - ClickHouse client and the remote read SQL executor

pub mod clickhouse;

pub use clickhouse::ClickhouseService;
