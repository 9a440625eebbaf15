//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::clickhouse::ClickhouseService;
use crate::domain::promql::{LabelMatcher, MetricKind, QueryBuilder, Reader, TimeRange};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub clickhouse: Arc<ClickhouseService>,
    pub reader: Arc<Reader>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Sql {
                metric_kind,
                start,
                end,
                matchers,
            }) => {
                return Self::print_sql(&cli_config, metric_kind, start, end, &matchers);
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let clickhouse = Arc::new(
            ClickhouseService::init(&config.clickhouse)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize ClickHouse client: {}", e))?,
        );

        let builder = QueryBuilder::new(Arc::new(config.clickhouse.table_mapping()));
        let reader =
            Reader::new(clickhouse.clone(), builder).with_max_queries(config.read.max_queries);
        let reader = Arc::new(reader);

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            clickhouse,
            reader,
        })
    }

    /// Print the SQL one sub-query would run, without connecting
    fn print_sql(
        cli: &CliConfig,
        kind: MetricKind,
        start: i64,
        end: i64,
        matchers: &[LabelMatcher],
    ) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let builder = QueryBuilder::new(Arc::new(config.clickhouse.table_mapping()));
        let range = TimeRange::from_millis(start, end)?;
        let query = builder.build_query(&range, matchers, kind)?;
        println!("{}", query);
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            &app.config.clickhouse.url,
            app.reader.builder().tables(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
