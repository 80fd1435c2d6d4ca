use axum::{
    body::Body,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use service_core::auth::{require_scope, Authorizer, Registry, Scope};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, request_span},
};
use service_core::observability::{init_metrics, metrics_handler};
use service_core::shutdown::shutdown_signal;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::FilesConfig;
use crate::{handlers, READ_FILES_SCOPE};

/// Routes of the protected resource. Fails if the registry does not publish
/// the scope `/files` requires.
pub fn build_router(authorizer: Arc<Authorizer>) -> Result<Router, AppError> {
    let read_files: Scope = READ_FILES_SCOPE.parse()?;
    let guard = authorizer.guard(read_files)?;

    let protected = Router::new()
        .route("/files", get(handlers::list_files))
        .route_layer(from_fn_with_state(guard, require_scope));

    Ok(Router::new()
        .merge(protected)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| request_span(req)))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware)))
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: FilesConfig) -> Result<Self, AppError> {
        let registry = Registry::load(&config.registry_path).map_err(|e| {
            tracing::error!(path = %config.registry_path, error = %e, "Failed to load registry");
            e
        })?;
        Self::build_with_registry(config, registry).await
    }

    pub async fn build_with_registry(
        config: FilesConfig,
        registry: Registry,
    ) -> Result<Self, AppError> {
        init_metrics();

        let verifier = config.signing.verifier()?;
        let authorizer = Arc::new(Authorizer::new(verifier, &registry.resource_servers));
        let app = build_router(authorizer)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, issuer = %config.signing.issuer, "Files service listening");

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
