use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why a token request was refused.
///
/// The four credential variants collapse into one `invalid_grant` response so
/// that callers cannot tell an unknown client from a wrong secret.
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("unknown client")]
    InvalidClient,

    #[error("client secret mismatch")]
    InvalidSecret,

    #[error("client is disabled")]
    ClientDisabled,

    #[error("no client credentials presented")]
    MissingCredentials,

    #[error("unsupported grant type {0:?}")]
    UnsupportedGrantType(String),

    #[error("malformed scope parameter: {0}")]
    InvalidScope(String),

    #[error("malformed token request: {0}")]
    InvalidRequest(String),

    #[error("failed to sign token: {0}")]
    Signing(#[source] anyhow::Error),
}

impl GrantError {
    /// Label for logs and the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            GrantError::InvalidClient => "invalid_client",
            GrantError::InvalidSecret => "invalid_secret",
            GrantError::ClientDisabled => "client_disabled",
            GrantError::MissingCredentials => "missing_credentials",
            GrantError::UnsupportedGrantType(_) => "unsupported_grant_type",
            GrantError::InvalidScope(_) => "invalid_scope",
            GrantError::InvalidRequest(_) => "invalid_request",
            GrantError::Signing(_) => "signing_failed",
        }
    }

    /// Status and RFC 6749 error code sent to the client.
    pub fn oauth_error(&self) -> (StatusCode, &'static str) {
        match self {
            GrantError::InvalidClient
            | GrantError::InvalidSecret
            | GrantError::ClientDisabled
            | GrantError::MissingCredentials => (StatusCode::UNAUTHORIZED, "invalid_grant"),
            GrantError::UnsupportedGrantType(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_grant_type")
            }
            GrantError::InvalidScope(_) => (StatusCode::BAD_REQUEST, "invalid_scope"),
            GrantError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GrantError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
        }
    }
}

impl IntoResponse for GrantError {
    fn into_response(self) -> Response {
        let reason = self.reason();
        match &self {
            GrantError::Signing(err) => {
                tracing::error!(error = ?err, "Token signing failed");
            }
            other => {
                tracing::warn!(reason, detail = %other, "Token request rejected");
            }
        }
        metrics::counter!("oauth_token_requests_rejected_total", "reason" => reason).increment(1);

        let (status, code) = self.oauth_error();
        let mut res = (status, Json(json!({ "error": code }))).into_response();
        res.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"oauth2\""),
            );
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credential_failures_are_indistinguishable() {
        let mut bodies = Vec::new();
        for err in [
            GrantError::InvalidClient,
            GrantError::InvalidSecret,
            GrantError::ClientDisabled,
            GrantError::MissingCredentials,
        ] {
            let res = err.into_response();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            bodies.push(axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap());
        }
        assert!(bodies.iter().all(|b| b == &bodies[0]));
        assert_eq!(&bodies[0][..], br#"{"error":"invalid_grant"}"#);
    }

    #[test]
    fn test_request_errors_are_bad_request() {
        assert_eq!(
            GrantError::UnsupportedGrantType("password".into()).oauth_error(),
            (StatusCode::BAD_REQUEST, "unsupported_grant_type")
        );
        assert_eq!(
            GrantError::InvalidScope("x".into()).oauth_error().1,
            "invalid_scope"
        );
    }
}
