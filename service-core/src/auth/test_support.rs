//! Fixtures shared by the unit tests in this module.

use chrono::{Duration, Utc};
use secrecy::Secret;

use super::{
    AccessTokenClaims, ClientConfig, ResourceServerConfig, ResourceServerRegistry,
    ScopeDefinition, ScopeSet, TokenSigner, TOKEN_USE_ACCESS,
};

pub const TEST_KEY: &[u8] = b"unit-test-signing-key";
pub const TEST_ISSUER: &str = "http://issuer.test";

pub fn demo_resource_servers() -> ResourceServerRegistry {
    ResourceServerRegistry::new(vec![ResourceServerConfig {
        identifier: "demo".to_string(),
        name: "Files API".to_string(),
        scopes: ["read.file", "write.file"]
            .into_iter()
            .map(|name| ScopeDefinition {
                name: name.to_string(),
                description: String::new(),
            })
            .collect(),
    }])
    .unwrap()
}

pub fn client_config(client_id: &str, secret: &str, scopes: &[&str]) -> ClientConfig {
    ClientConfig {
        client_id: client_id.to_string(),
        name: String::new(),
        client_secret: Secret::new(secret.to_string()),
        previous_secret: None,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        enabled: true,
    }
}

pub fn mint_test_token(client_id: &str, scope: &str, lifetime: Duration) -> String {
    let now = Utc::now();
    TokenSigner::hs256(TEST_KEY, TEST_ISSUER)
        .sign(&AccessTokenClaims {
            sub: client_id.to_string(),
            client_id: client_id.to_string(),
            scope: ScopeSet::parse_delimited(scope).unwrap(),
            iss: TEST_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
        })
        .unwrap()
}
