use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use super::{AuthorizationStage, Scope};

/// Static configuration problems, detected at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid scope: {0:?}")]
    InvalidScope(String),

    #[error("duplicate resource server: {0}")]
    DuplicateResourceServer(String),

    #[error("duplicate scope: {0}")]
    DuplicateScope(String),

    #[error("duplicate client: {0}")]
    DuplicateClient(String),

    #[error("client_id must not be empty")]
    EmptyClientId,

    #[error("client {0} has an empty secret")]
    EmptySecret(String),

    #[error("client {client_id} is entitled to unpublished scope {scope}")]
    UnknownEntitlement { client_id: String, scope: String },

    #[error("scope {0} is not published by any resource server")]
    UnpublishedScope(String),

    #[error("failed to load registry: {0}")]
    Load(String),
}

/// Why the Authorizer turned a request away.
///
/// The variants carry detail for logs only; the HTTP response is identical for
/// all of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("missing bearer token")]
    MissingToken,

    #[error("token signature rejected: {0}")]
    InvalidSignature(String),

    #[error("token expired at {expired_at}")]
    TokenExpired { expired_at: i64 },

    #[error("scope {required} not granted")]
    InsufficientScope { required: Scope },
}

impl AuthRejection {
    /// The stage the request failed to reach.
    pub fn failed_stage(&self) -> AuthorizationStage {
        match self {
            AuthRejection::MissingToken => AuthorizationStage::TokenExtracted,
            AuthRejection::InvalidSignature(_) => AuthorizationStage::SignatureVerified,
            AuthRejection::TokenExpired { .. } => AuthorizationStage::NotExpired,
            AuthRejection::InsufficientScope { .. } => AuthorizationStage::ScopeMatched,
        }
    }

    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "missing_token",
            AuthRejection::InvalidSignature(_) => "invalid_signature",
            AuthRejection::TokenExpired { .. } => "token_expired",
            AuthRejection::InsufficientScope { .. } => "insufficient_scope",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut res = (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
        res.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        res
    }
}
