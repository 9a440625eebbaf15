use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CLICKHOUSE_DATABASE, ENV_CLICKHOUSE_PASSWORD, ENV_CLICKHOUSE_URL, ENV_CLICKHOUSE_USER,
    ENV_CONFIG, ENV_HOST, ENV_METRICS_TABLE, ENV_PORT, ENV_READ_TIMEOUT_SECS,
};
use crate::domain::promql::{LabelMatcher, MetricKind};

#[derive(Parser)]
#[command(name = "promhouse")]
#[command(
    version,
    about = "Prometheus remote read adapter for OpenTelemetry metrics in ClickHouse",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// ClickHouse HTTP URL
    #[arg(long, global = true, env = ENV_CLICKHOUSE_URL)]
    pub clickhouse_url: Option<String>,

    /// ClickHouse database
    #[arg(long, global = true, env = ENV_CLICKHOUSE_DATABASE)]
    pub clickhouse_database: Option<String>,

    /// ClickHouse user
    #[arg(long, global = true, env = ENV_CLICKHOUSE_USER)]
    pub clickhouse_user: Option<String>,

    /// ClickHouse password
    #[arg(long, global = true, env = ENV_CLICKHOUSE_PASSWORD, hide_env_values = true)]
    pub clickhouse_password: Option<String>,

    /// Base name of the OTel metrics tables (`<base>_gauge`, `<base>_sum`, ...)
    #[arg(long, global = true, env = ENV_METRICS_TABLE)]
    pub metrics_table: Option<String>,

    /// Deadline for one remote read request, in seconds
    #[arg(long, global = true, env = ENV_READ_TIMEOUT_SECS)]
    pub read_timeout_secs: Option<u64>,
}

/// Parse metric kind from CLI string
fn parse_metric_kind(s: &str) -> Result<MetricKind, String> {
    s.parse::<MetricKind>().map_err(|_| {
        format!(
            "Invalid metric kind '{}'. Valid options: gauge, sum, histogram, summary",
            s
        )
    })
}

/// Parse a `name=value`, `name!=value`, `name=~regex` or `name!~regex` matcher
fn parse_matcher(s: &str) -> Result<LabelMatcher, String> {
    LabelMatcher::parse(s).ok_or_else(|| {
        format!(
            "Invalid matcher '{}'. Expected name=value, name!=value, name=~regex or name!~regex",
            s
        )
    })
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Print the SQL a remote read sub-query would run
    Sql {
        /// Metric kind (gauge, sum, histogram, summary)
        #[arg(long, short = 'k', value_parser = parse_metric_kind)]
        metric_kind: MetricKind,

        /// Range start, Unix milliseconds
        #[arg(long)]
        start: i64,

        /// Range end, Unix milliseconds
        #[arg(long)]
        end: i64,

        /// Label matcher, repeatable
        #[arg(long = "matcher", short = 'm', value_parser = parse_matcher)]
        matchers: Vec<LabelMatcher>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub clickhouse_url: Option<String>,
    pub clickhouse_database: Option<String>,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub metrics_table: Option<String>,
    pub read_timeout_secs: Option<u64>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            clickhouse_url: cli.clickhouse_url,
            clickhouse_database: cli.clickhouse_database,
            clickhouse_user: cli.clickhouse_user,
            clickhouse_password: cli.clickhouse_password,
            metrics_table: cli.metrics_table,
            read_timeout_secs: cli.read_timeout_secs,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}
