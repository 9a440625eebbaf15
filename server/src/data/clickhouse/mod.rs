//! ClickHouse metrics store
//!
//! Reads the tables written by the OpenTelemetry Collector ClickHouse
//! exporter. Uses the async HTTP client with LZ4 compression and HTTP
//! keep-alive connection reuse.

pub mod cursor;
pub mod error;

pub use cursor::ClickhouseCursor;
pub use error::ClickhouseError;

use async_trait::async_trait;
use clickhouse::Client;

use crate::core::config::ClickhouseConfig;
use crate::domain::promql::{ExecutorError, ReadContext, RowCursor, SqlExecutor, SqlQuery};

/// ClickHouse service
///
/// Owns the client and serves generated remote read SQL through
/// [`SqlExecutor`]. The client is cheap to clone and pools connections
/// internally.
pub struct ClickhouseService {
    client: Client,
    config: ClickhouseConfig,
}

impl ClickhouseService {
    /// Build the client from config and check that the server answers.
    ///
    /// An unreachable server is logged, not fatal: readiness reports it until
    /// the server comes up.
    pub async fn init(config: &ClickhouseConfig) -> Result<Self, ClickhouseError> {
        if config.url.trim().is_empty() {
            return Err(ClickhouseError::Connection(
                "ClickHouse URL must not be empty".to_string(),
            ));
        }

        let service = Self {
            client: build_client(config),
            config: config.clone(),
        };

        if let Err(e) = service.health_check().await {
            tracing::warn!(url = %config.url, error = %e, "ClickHouse is not reachable yet");
        }

        tracing::debug!(
            url = %config.url,
            database = %config.database,
            compression = %config.compression,
            max_execution_time_secs = config.max_execution_time_secs,
            metrics_table = %config.metrics_table,
            "ClickhouseService initialized"
        );

        Ok(service)
    }

    /// Get the ClickHouse client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &ClickhouseConfig {
        &self.config
    }

    /// Health check - verify connection to ClickHouse
    pub async fn health_check(&self) -> Result<(), ClickhouseError> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(ClickhouseError::from)
    }
}

fn build_client(config: &ClickhouseConfig) -> Client {
    let mut client = Client::default()
        .with_url(&config.url)
        .with_database(&config.database);

    if let Some(ref user) = config.user {
        client = client.with_user(user);
    }
    if let Some(ref password) = config.password {
        client = client.with_password(password);
    }

    if config.compression {
        client = client.with_compression(clickhouse::Compression::Lz4);
    }

    // Server-side limit; the read deadline bounds the client side
    if config.max_execution_time_secs > 0 {
        client = client.with_option(
            "max_execution_time",
            config.max_execution_time_secs.to_string(),
        );
    }

    client
}

#[async_trait]
impl SqlExecutor for ClickhouseService {
    async fn execute(
        &self,
        ctx: &ReadContext,
        query: &SqlQuery,
    ) -> Result<Box<dyn RowCursor>, ExecutorError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let cursor =
            ClickhouseCursor::open(&self.client, ctx, query).map_err(ExecutorError::backend)?;
        Ok(Box::new(cursor))
    }
}
