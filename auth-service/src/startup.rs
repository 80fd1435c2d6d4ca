use axum::{
    body::Body,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::auth::Registry;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
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

use crate::config::AuthConfig;
use crate::handlers;
use crate::services::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub token_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the issuer from an already loaded registry.
    pub fn new(config: &AuthConfig, registry: &Registry) -> Result<Self, AppError> {
        let signer = config.signing.signer()?;
        let issuer = TokenIssuer::new(registry, signer, config.token.lifetime()?);

        Ok(Self {
            issuer: Arc::new(issuer),
            token_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.token_attempts,
                config.rate_limit.token_window_seconds,
            ),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let token_route = post(handlers::issue_token).layer(from_fn_with_state(
        state.token_rate_limiter.clone(),
        ip_rate_limit_middleware,
    ));

    Router::new()
        .route("/oauth2/token", token_route)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| request_span(req)))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: AuthConfig) -> Result<Self, AppError> {
        let registry = Registry::load(&config.registry_path).map_err(|e| {
            tracing::error!(path = %config.registry_path, error = %e, "Failed to load registry");
            e
        })?;
        Self::build_with_registry(config, registry).await
    }

    /// Build around a registry constructed by the caller, e.g. a test fixture.
    pub async fn build_with_registry(
        config: AuthConfig,
        registry: Registry,
    ) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState::new(&config, &registry)?;
        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            issuer = %state.issuer.issuer(),
            lifetime_seconds = state.issuer.lifetime().num_seconds(),
            "Token issuer listening"
        );

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.state.issuer
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
