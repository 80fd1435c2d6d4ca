//! Resource-server side enforcement of scoped access tokens.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{AuthRejection, RegistryError, ResourceServerRegistry, Scope, ScopeSet, TokenVerifier};

/// Checkpoints a request passes through, in order. A rejected request stops at
/// the first stage it fails to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthorizationStage {
    Received,
    TokenExtracted,
    SignatureVerified,
    NotExpired,
    ScopeMatched,
    Allowed,
}

/// Identity attached to a request that passed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedClient {
    pub client_id: String,
    pub scopes: ScopeSet,
    pub token_id: String,
}

pub struct Authorizer {
    verifier: TokenVerifier,
    published: ScopeSet,
}

impl Authorizer {
    pub fn new(verifier: TokenVerifier, resource_servers: &ResourceServerRegistry) -> Self {
        Self {
            verifier,
            published: resource_servers.published_scopes().clone(),
        }
    }

    /// Bind a required scope to a route. Unpublished scopes are a wiring
    /// mistake and fail at startup rather than on first request.
    pub fn guard(self: &Arc<Self>, required: Scope) -> Result<ScopeGuard, RegistryError> {
        if !self.published.contains(&required) {
            return Err(RegistryError::UnpublishedScope(required.to_string()));
        }
        Ok(ScopeGuard {
            authorizer: Arc::clone(self),
            required,
        })
    }

    pub fn authorize(
        &self,
        headers: &HeaderMap,
        required: &Scope,
    ) -> Result<AuthorizedClient, AuthRejection> {
        self.authorize_at(headers, required, Utc::now())
    }

    pub fn authorize_at(
        &self,
        headers: &HeaderMap,
        required: &Scope,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedClient, AuthRejection> {
        let token = extract_bearer(headers).ok_or(AuthRejection::MissingToken)?;

        let claims = self.verifier.verify(token)?;

        if claims.is_expired_at(now) {
            return Err(AuthRejection::TokenExpired {
                expired_at: claims.exp,
            });
        }

        if !claims.scope.contains(required) {
            return Err(AuthRejection::InsufficientScope {
                required: required.clone(),
            });
        }

        Ok(AuthorizedClient {
            client_id: claims.client_id,
            scopes: claims.scope,
            token_id: claims.jti,
        })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// matched case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// An [`Authorizer`] bound to the scope one route requires.
#[derive(Clone)]
pub struct ScopeGuard {
    authorizer: Arc<Authorizer>,
    required: Scope,
}

impl ScopeGuard {
    pub fn required(&self) -> &Scope {
        &self.required
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<AuthorizedClient, AuthRejection> {
        self.authorizer.authorize(headers, &self.required)
    }
}

/// Middleware for `axum::middleware::from_fn_with_state(guard, require_scope)`.
///
/// On success the [`AuthorizedClient`] is placed in request extensions for
/// handlers to pick up through [`Authorized`].
pub async fn require_scope(
    State(guard): State<ScopeGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    match guard.check(req.headers()) {
        Ok(client) => {
            tracing::debug!(
                client_id = %client.client_id,
                required_scope = %guard.required,
                "Request authorized"
            );
            req.extensions_mut().insert(client);
            Ok(next.run(req).await)
        }
        Err(rejection) => {
            tracing::warn!(
                reason = rejection.reason(),
                stage = ?rejection.failed_stage(),
                required_scope = %guard.required,
                path = %req.uri().path(),
                detail = %rejection,
                "Request rejected"
            );
            metrics::counter!(
                "authorization_rejections_total",
                "reason" => rejection.reason()
            )
            .increment(1);
            Err(rejection)
        }
    }
}

/// Extractor for handlers behind [`require_scope`].
#[derive(Debug, Clone)]
pub struct Authorized(pub AuthorizedClient);

#[async_trait]
impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizedClient>()
            .cloned()
            .map(Authorized)
            .ok_or(AuthRejection::MissingToken)
    }
}
