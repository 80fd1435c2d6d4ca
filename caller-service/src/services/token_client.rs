//! Credential exchange against the issuer's token endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::fmt;

use crate::CallerError;

/// A bearer token and the window in which it is valid.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Usable at `now` if it has more than `safety_margin` left to live.
    ///
    /// The margin never exceeds half the token's lifetime, so tokens shorter
    /// than the margin are still reused for a while after minting.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        let margin = safety_margin.min((self.expires_at - self.issued_at) / 2);
        now < self.expires_at - margin
    }
}

/// Expiry instant for a token issued at `issued_at` with the issuer's
/// `expires_in`. Zero, negative and out-of-range lifetimes are refused.
fn expiry_from(issued_at: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, CallerError> {
    if expires_in <= 0 {
        return Err(CallerError::TransportFailure(format!(
            "issuer returned non-positive expires_in {}",
            expires_in
        )));
    }
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            CallerError::TransportFailure(format!(
                "issuer returned out-of-range expires_in {}",
                expires_in
            ))
        })
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Anything that can mint a token for one client identity.
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn client_id(&self) -> &str;

    async fn fetch_token(&self) -> Result<CachedToken, CallerError>;
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

/// [`TokenSource`] that POSTs `grant_type=client_credentials` with HTTP Basic
/// client authentication.
pub struct TokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    scope: Option<String>,
    timeout: std::time::Duration,
}

impl TokenClient {
    pub fn new(
        http: reqwest::Client,
        issuer_url: &str,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth2/token", issuer_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret,
            scope: None,
            timeout,
        }
    }

    /// Ask for a subset of the entitlement instead of all of it.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    async fn request_token(&self) -> Result<CachedToken, CallerError> {
        let mut form = vec![("grant_type", "client_credentials")];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .traced_post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| CallerError::from_reqwest("token request", e))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            return Err(CallerError::AuthFailure(format!(
                "issuer rejected client {} with {} {}",
                self.client_id,
                status,
                body.get("error").and_then(|e| e.as_str()).unwrap_or("unknown")
            )));
        }
        if !status.is_success() {
            return Err(CallerError::TransportFailure(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let issued_at = Utc::now();
        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| CallerError::from_reqwest("token response", e))?;

        if !body.token_type.eq_ignore_ascii_case("bearer") {
            return Err(CallerError::TransportFailure(format!(
                "unexpected token_type {:?}",
                body.token_type
            )));
        }

        let expires_at = expiry_from(issued_at, body.expires_in)?;

        tracing::info!(
            client_id = %self.client_id,
            expires_in = body.expires_in,
            "Successfully received access token"
        );

        Ok(CachedToken {
            access_token: body.access_token,
            issued_at,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSource for TokenClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn fetch_token(&self) -> Result<CachedToken, CallerError> {
        tokio::time::timeout(self.timeout, self.request_token())
            .await
            .map_err(|_| {
                CallerError::Timeout(format!("token request exceeded {:?}", self.timeout))
            })?
    }
}
