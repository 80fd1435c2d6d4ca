#![allow(dead_code)]

use chrono::{Duration, Utc};
use files_service::build_router;
use service_core::auth::{
    AccessTokenClaims, Authorizer, Registry, RegistryConfig, ResourceServerConfig,
    ScopeDefinition, ScopeSet, TokenSigner, TokenVerifier, TOKEN_USE_ACCESS,
};
use std::sync::Arc;

pub const SIGNING_KEY: &[u8] = b"files-service-test-key";
pub const ISSUER: &str = "http://auth.test";

pub fn registry() -> Registry {
    Registry::from_config(RegistryConfig {
        resource_servers: vec![ResourceServerConfig {
            identifier: "demo".to_string(),
            name: "Files API".to_string(),
            scopes: ["read.file", "write.file"]
                .into_iter()
                .map(|name| ScopeDefinition {
                    name: name.to_string(),
                    description: String::new(),
                })
                .collect(),
        }],
        clients: vec![],
    })
    .expect("fixture registry is valid")
}

pub fn router() -> axum::Router {
    let authorizer = Authorizer::new(
        TokenVerifier::hs256(SIGNING_KEY, ISSUER),
        &registry().resource_servers,
    );
    build_router(Arc::new(authorizer)).expect("router builds")
}

pub fn token_signed_with(key: &[u8], scope: &str, lifetime: Duration) -> String {
    let now = Utc::now();
    TokenSigner::hs256(key, ISSUER)
        .sign(&AccessTokenClaims {
            sub: "svc-a".to_string(),
            client_id: "svc-a".to_string(),
            scope: ScopeSet::parse_delimited(scope).unwrap(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
        })
        .unwrap()
}

pub fn token(scope: &str) -> String {
    token_signed_with(SIGNING_KEY, scope, Duration::hours(1))
}
