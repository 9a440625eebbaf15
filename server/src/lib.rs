//! Prometheus remote read adapter for OpenTelemetry metrics stored in ClickHouse

pub mod api;
mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
