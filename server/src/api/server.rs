//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::routes::{health, remote_read};
use crate::core::CoreApp;
use crate::core::constants::API_PREFIX;
use crate::data::clickhouse::ClickhouseService;
use crate::domain::promql::Reader;

/// Shared handles the routes are built from
#[derive(Clone)]
pub struct ApiState {
    pub reader: Arc<Reader>,
    pub clickhouse: Arc<ClickhouseService>,
    pub cancel: CancellationToken,
    pub read_timeout: Option<Duration>,
}

impl ApiState {
    pub fn from_app(app: &CoreApp) -> Self {
        Self {
            reader: app.reader.clone(),
            clickhouse: app.clickhouse.clone(),
            cancel: app.shutdown.read_token().clone(),
            read_timeout: app.config.read.timeout(),
        }
    }

    pub fn router(self) -> Router {
        let read_routes = remote_read::routes(remote_read::ReadState {
            reader: self.reader,
            cancel: self.cancel,
            timeout: self.read_timeout,
        });

        let api_routes = Router::new()
            .merge(health::routes(self.clickhouse))
            .merge(read_routes);

        Router::new()
            .nest(API_PREFIX, api_routes)
            .fallback(middleware::handle_404)
            .layer(TraceLayer::new_for_http())
    }
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();
        let router = ApiState::from_app(&app).router();

        let bind_addr = (app.config.server.host.as_str(), app.config.server.port);
        let listener = TcpListener::bind(bind_addr).await?;
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(%addr, "Remote read API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use prost::Message;
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::ClickhouseConfig;
    use crate::domain::promql::prompb::ReadRequest;
    use crate::domain::promql::testing::FakeExecutor;
    use crate::domain::promql::{QueryBuilder, TableMapping};

    async fn state() -> ApiState {
        let clickhouse = ClickhouseService::init(&ClickhouseConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        let reader = Reader::new(
            Arc::new(FakeExecutor::new()),
            QueryBuilder::new(Arc::new(TableMapping::default())),
        );
        ApiState {
            reader: Arc::new(reader),
            clickhouse: Arc::new(clickhouse),
            cancel: CancellationToken::new(),
            read_timeout: None,
        }
    }

    async fn status(router: Router, method: &str, uri: &str, body: Vec<u8>) -> StatusCode {
        router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_routes_are_mounted_under_api_prefix() {
        let router = state().await.router();
        assert_eq!(
            status(router.clone(), "GET", "/api/v1/health", vec![]).await,
            StatusCode::OK
        );
        assert_eq!(
            status(router.clone(), "GET", "/api/v1/ready", vec![]).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        let body = snap::raw::Encoder::new()
            .compress_vec(&ReadRequest::default().encode_to_vec())
            .unwrap();
        assert_eq!(
            status(router, "POST", "/api/v1/read", body).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let router = state().await.router();
        assert_eq!(
            status(router, "GET", "/api/v1/write", vec![]).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_read_requires_post() {
        let router = state().await.router();
        assert_eq!(
            status(router, "GET", "/api/v1/read", vec![]).await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
