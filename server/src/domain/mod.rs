//! Domain logic
//!
//! - `promql` - Prometheus remote read over OTel metric tables

pub mod promql;

pub use promql::Reader;
