//! Test helpers for auth-service integration tests.

#![allow(dead_code)]

use auth_service::{
    config::{AuthConfig, RateLimitConfig, TokenConfig},
    AppState, Application,
};
use secrecy::Secret;
use service_core::auth::{
    ClientConfig, Registry, RegistryConfig, ResourceServerConfig, ScopeDefinition, SigningConfig,
    TokenVerifier,
};
use service_core::config::{Config, Environment};

pub const SIGNING_KEY: &str = "auth-service-test-signing-key";
pub const ISSUER: &str = "http://auth.test";

pub fn client(client_id: &str, secret: &str, scopes: &[&str]) -> ClientConfig {
    ClientConfig {
        client_id: client_id.to_string(),
        name: client_id.to_string(),
        client_secret: Secret::new(secret.to_string()),
        previous_secret: None,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        enabled: true,
    }
}

pub fn registry() -> Registry {
    let mut disabled = client("svc-off", "off", &["demo/read.file"]);
    disabled.enabled = false;

    Registry::from_config(RegistryConfig {
        resource_servers: vec![ResourceServerConfig {
            identifier: "demo".to_string(),
            name: "Files API".to_string(),
            scopes: vec![
                ScopeDefinition {
                    name: "read.file".to_string(),
                    description: "read files".to_string(),
                },
                ScopeDefinition {
                    name: "write.file".to_string(),
                    description: "write files".to_string(),
                },
            ],
        }],
        clients: vec![
            client("svc-a", "s3cr3t", &["demo/read.file"]),
            client("svc-full", "full-secret", &["demo/read.file", "demo/write.file"]),
            disabled,
        ],
    })
    .expect("fixture registry is valid")
}

pub fn config() -> AuthConfig {
    AuthConfig {
        common: Config { port: 0 },
        environment: Environment::Dev,
        service_name: "auth-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        registry_path: "unused".to_string(),
        signing: SigningConfig::hs256(SIGNING_KEY, ISSUER),
        token: TokenConfig {
            lifetime_seconds: 3600,
        },
        rate_limit: RateLimitConfig {
            token_attempts: 1000,
            token_window_seconds: 60,
        },
    }
}

pub fn verifier() -> TokenVerifier {
    TokenVerifier::hs256(SIGNING_KEY.as_bytes(), ISSUER)
}

pub fn state() -> AppState {
    AppState::new(&config(), &registry()).expect("Failed to build state")
}

/// Running issuer bound to an ephemeral loopback port.
pub struct TestApp {
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn token_url(&self) -> String {
        format!("http://127.0.0.1:{}/oauth2/token", self.port)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(config()).await
}

pub async fn spawn_app_with(config: AuthConfig) -> TestApp {
    let app = Application::build_with_registry(config, registry())
        .await
        .expect("Failed to build application");
    let port = app.port();
    tokio::spawn(app.run_until_stopped());

    TestApp {
        port,
        client: reqwest::Client::new(),
    }
}
