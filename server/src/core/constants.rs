// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths, identifiers and log targets)
pub const APP_NAME: &str = "promhouse";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".promhouse";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "promhouse.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "PROMHOUSE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "PROMHOUSE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "PROMHOUSE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "PROMHOUSE_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port (next to the 9090 Prometheus default, 9201 is the
/// customary remote storage adapter port)
pub const DEFAULT_PORT: u16 = 9201;

/// Default log filter when neither PROMHOUSE_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,promhouse=info";

// =============================================================================
// Environment Variables - ClickHouse
// =============================================================================

/// Environment variable for the ClickHouse HTTP URL
pub const ENV_CLICKHOUSE_URL: &str = "PROMHOUSE_CLICKHOUSE_URL";

/// Environment variable for the ClickHouse database
pub const ENV_CLICKHOUSE_DATABASE: &str = "PROMHOUSE_CLICKHOUSE_DATABASE";

/// Environment variable for the ClickHouse user
pub const ENV_CLICKHOUSE_USER: &str = "PROMHOUSE_CLICKHOUSE_USER";

/// Environment variable for the ClickHouse password
pub const ENV_CLICKHOUSE_PASSWORD: &str = "PROMHOUSE_CLICKHOUSE_PASSWORD";

/// Environment variable for the metrics table base name
pub const ENV_METRICS_TABLE: &str = "PROMHOUSE_METRICS_TABLE";

// =============================================================================
// ClickHouse Defaults
// =============================================================================

pub const CLICKHOUSE_DEFAULT_URL: &str = "http://localhost:8123";

/// The client speaks HTTP only; `https://` needs the `rustls-tls` feature
pub const CLICKHOUSE_URL_SCHEMES: &[&str] = &["http://", "https://"];

pub const CLICKHOUSE_DEFAULT_DATABASE: &str = "default";

/// Server-side `max_execution_time` setting
pub const CLICKHOUSE_DEFAULT_MAX_EXECUTION_TIME_SECS: u64 = 30;

// =============================================================================
// Remote Read
// =============================================================================

/// Environment variable for the per-request read deadline
pub const ENV_READ_TIMEOUT_SECS: &str = "PROMHOUSE_READ_TIMEOUT_SECS";

/// Default deadline for one remote read request
pub const READ_DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum compressed remote read request body (32 MB)
pub const READ_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Maximum decompressed remote read request size (128 MB)
pub const READ_MAX_DECODED_BYTES: usize = 128 * 1024 * 1024;

// =============================================================================
// API
// =============================================================================

/// API path prefix
pub const API_PREFIX: &str = "/api/v1";

/// Content type for protobuf bodies
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Content encoding for snappy block compressed bodies
pub const CONTENT_ENCODING_SNAPPY: &str = "snappy";

/// Remote read protocol version header
pub const REMOTE_READ_VERSION_HEADER: &str = "x-prometheus-remote-read-version";

/// Remote read protocol version header value
pub const REMOTE_READ_VERSION: &str = "0.1.0";

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
