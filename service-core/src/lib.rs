//! service-core: shared infrastructure for the token issuer, the resource
//! servers and their callers.
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod shutdown;

pub use async_trait;
pub use axum;
pub use secrecy;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
