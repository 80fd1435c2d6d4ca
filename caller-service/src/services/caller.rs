//! Token-bearing invocations of the protected resource.

use reqwest::{Method, StatusCode};
use service_core::models::FileListing;
use service_core::observability::TracedClientExt;
use std::sync::Arc;

use super::{CachedToken, TokenCache};
use crate::CallerError;

/// Authorization rejections tolerated before giving up. The first one is
/// assumed to be a stale cached token.
const MAX_AUTH_ATTEMPTS: usize = 2;

/// One call against the resource server.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    pub path: String,
}

impl Operation {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
        }
    }
}

enum Reply {
    Rejected(StatusCode),
    Body(serde_json::Value),
}

pub struct Caller {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<TokenCache>,
    request_timeout: std::time::Duration,
}

impl Caller {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        cache: Arc<TokenCache>,
        request_timeout: std::time::Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            request_timeout,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Attach a (possibly cached) bearer token and run `operation`.
    ///
    /// A 401 or 403 from the resource invalidates the token and the whole
    /// mint-and-call sequence is tried once more; a second rejection is an
    /// [`CallerError::AuthFailure`]. Transport failures are returned as-is.
    /// `request_timeout` bounds each exchange from send to the last body byte.
    pub async fn invoke(&self, operation: &Operation) -> Result<serde_json::Value, CallerError> {
        let url = format!("{}{}", self.base_url, operation.path);

        for attempt in 1..=MAX_AUTH_ATTEMPTS {
            let token = self.cache.get().await?;

            let reply = tokio::time::timeout(
                self.request_timeout,
                self.exchange(operation, &url, &token),
            )
            .await
            .map_err(|_| {
                CallerError::Timeout(format!(
                    "{} {} exceeded {:?}",
                    operation.method, url, self.request_timeout
                ))
            })??;

            match reply {
                Reply::Body(body) => {
                    tracing::info!(url = %url, attempt, "Successfully received data");
                    return Ok(body);
                }
                Reply::Rejected(status) => {
                    self.cache.invalidate(&token).await;
                    if attempt < MAX_AUTH_ATTEMPTS {
                        tracing::warn!(
                            client_id = %self.cache.client_id(),
                            %status,
                            url = %url,
                            "Resource rejected token, retrying with a fresh one"
                        );
                        continue;
                    }
                    return Err(CallerError::AuthFailure(format!(
                        "{} {} rejected after {} attempts with {}",
                        operation.method, url, attempt, status
                    )));
                }
            }
        }

        Err(CallerError::AuthFailure(format!(
            "{} {} not attempted",
            operation.method, url
        )))
    }

    pub async fn list_files(&self) -> Result<FileListing, CallerError> {
        let value = self.invoke(&Operation::get("/files")).await?;
        serde_json::from_value(value)
            .map_err(|e| CallerError::TransportFailure(format!("unexpected file listing: {}", e)))
    }

    async fn exchange(
        &self,
        operation: &Operation,
        url: &str,
        token: &CachedToken,
    ) -> Result<Reply, CallerError> {
        let response = self
            .http
            .traced_request(operation.method.clone(), url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| CallerError::from_reqwest("resource request", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(Reply::Rejected(status));
        }
        if !status.is_success() {
            return Err(CallerError::TransportFailure(format!(
                "{} {} returned {}",
                operation.method, url, status
            )));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CallerError::from_reqwest("resource response", e))?;
        Ok(Reply::Body(body))
    }
}
