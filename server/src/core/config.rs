use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CLICKHOUSE_DEFAULT_DATABASE, CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS,
    CLICKHOUSE_DEFAULT_URL, CLICKHOUSE_URL_SCHEMES, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT,
    READ_DEFAULT_TIMEOUT_SECS,
};
use crate::domain::promql::{DEFAULT_MAX_QUERIES, TableMapping};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// ClickHouse configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ClickhouseFileConfig {
    /// HTTP URL (or use PROMHOUSE_CLICKHOUSE_URL env var)
    pub url: Option<String>,
    /// Database name (default: "default")
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Enable LZ4 compression (default: true)
    pub compression: Option<bool>,
    /// Server-side `max_execution_time` in seconds (0 = unlimited)
    pub max_execution_time_secs: Option<u64>,
    /// Base name of the OTel metrics tables (default: "otel_metrics")
    pub metrics_table: Option<String>,
}

/// Remote read configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReadFileConfig {
    pub timeout_secs: Option<u64>,
    pub max_queries: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub clickhouse: Option<ClickhouseFileConfig>,
    pub read: Option<ReadFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(ch) = other.clickhouse {
            let current = self
                .clickhouse
                .get_or_insert_with(ClickhouseFileConfig::default);
            if ch.url.is_some() {
                tracing::trace!(url = ?ch.url, "Merging clickhouse.url");
                current.url = ch.url;
            }
            if ch.database.is_some() {
                current.database = ch.database;
            }
            if ch.user.is_some() {
                current.user = ch.user;
            }
            if ch.password.is_some() {
                current.password = ch.password;
            }
            if ch.compression.is_some() {
                current.compression = ch.compression;
            }
            if ch.max_execution_time_secs.is_some() {
                current.max_execution_time_secs = ch.max_execution_time_secs;
            }
            if ch.metrics_table.is_some() {
                tracing::trace!(
                    metrics_table = ?ch.metrics_table,
                    "Merging clickhouse.metrics_table"
                );
                current.metrics_table = ch.metrics_table;
            }
        }

        if let Some(read) = other.read {
            let current = self.read.get_or_insert_with(ReadFileConfig::default);
            if read.timeout_secs.is_some() {
                current.timeout_secs = read.timeout_secs;
            }
            if read.max_queries.is_some() {
                current.max_queries = read.max_queries;
            }
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// Server configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// ClickHouse configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct ClickhouseConfig {
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Enable LZ4 compression for requests/responses
    pub compression: bool,
    /// Server-side query limit (0 = unlimited)
    pub max_execution_time_secs: u64,
    /// Base name of the OTel metrics tables
    pub metrics_table: String,
}

impl Default for ClickhouseConfig {
    fn default() -> Self {
        Self {
            url: CLICKHOUSE_DEFAULT_URL.to_string(),
            database: CLICKHOUSE_DEFAULT_DATABASE.to_string(),
            user: None,
            password: None,
            compression: true,
            max_execution_time_secs: CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS,
            metrics_table: TableMapping::DEFAULT_BASE.to_string(),
        }
    }
}

impl ClickhouseConfig {
    /// Table mapping for the configured base name
    pub fn table_mapping(&self) -> TableMapping {
        TableMapping::from_base(&self.metrics_table)
    }
}

/// Remote read configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// Deadline for one read request (0 = none)
    pub timeout_secs: u64,
    /// Maximum sub-queries per read request
    pub max_queries: usize,
}

impl ReadConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub clickhouse: ClickhouseConfig,
    pub read: ReadConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.promhouse/promhouse.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.promhouse/promhouse.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::resolve(cli, file_config)
    }

    /// Layer CLI/env overrides on top of merged file config and defaults
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_ch = file_config.clickhouse.unwrap_or_default();
        let file_read = file_config.read.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let defaults = ClickhouseConfig::default();
        let clickhouse = ClickhouseConfig {
            url: cli
                .clickhouse_url
                .clone()
                .or(file_ch.url)
                .unwrap_or(defaults.url),
            database: cli
                .clickhouse_database
                .clone()
                .or(file_ch.database)
                .unwrap_or(defaults.database),
            user: cli.clickhouse_user.clone().or(file_ch.user),
            password: cli.clickhouse_password.clone().or(file_ch.password),
            compression: file_ch.compression.unwrap_or(defaults.compression),
            max_execution_time_secs: file_ch
                .max_execution_time_secs
                .unwrap_or(defaults.max_execution_time_secs),
            metrics_table: cli
                .metrics_table
                .clone()
                .or(file_ch.metrics_table)
                .unwrap_or(defaults.metrics_table),
        };

        let read = ReadConfig {
            timeout_secs: cli
                .read_timeout_secs
                .or(file_read.timeout_secs)
                .unwrap_or(READ_DEFAULT_TIMEOUT_SECS),
            max_queries: file_read.max_queries.unwrap_or(DEFAULT_MAX_QUERIES),
        };

        if !CLICKHOUSE_URL_SCHEMES
            .iter()
            .any(|scheme| clickhouse.url.starts_with(scheme))
        {
            anyhow::bail!(
                "clickhouse.url must start with http:// or https://: {}",
                clickhouse.url
            );
        }
        if clickhouse.metrics_table.trim().is_empty() {
            anyhow::bail!("clickhouse.metrics_table must not be empty");
        }
        if read.max_queries == 0 {
            anyhow::bail!("read.max_queries must be greater than 0");
        }

        let config = Self {
            server,
            clickhouse,
            read,
        };

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            clickhouse_url = %config.clickhouse.url,
            database = %config.clickhouse.database,
            metrics_table = %config.clickhouse.metrics_table,
            read_timeout_secs = config.read.timeout_secs,
            max_queries = config.read.max_queries,
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Get profile config path (~/.promhouse/promhouse.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
