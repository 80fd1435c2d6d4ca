pub mod config;
pub mod error;
pub mod services;

pub use error::CallerError;
pub use service_core::models::{FileEntry, FileListing};
pub use services::{CachedToken, Caller, Operation, TokenCache, TokenClient, TokenSource};

use std::sync::Arc;

use crate::config::CallerConfig;

/// Wire a [`Caller`] with an HTTP token client and its cache.
pub fn build_caller(config: &CallerConfig) -> Result<Caller, CallerError> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| CallerError::TransportFailure(format!("http client: {}", e)))?;

    let mut source = TokenClient::new(
        http.clone(),
        &config.issuer_url,
        &config.client_id,
        config.client_secret.clone(),
        config.mint_timeout,
    );
    if let Some(scope) = &config.scope {
        source = source.with_scope(scope);
    }

    let cache = Arc::new(TokenCache::new(Arc::new(source), config.safety_margin));
    Ok(Caller::new(
        http,
        &config.files_service_url,
        cache,
        config.request_timeout,
    ))
}
