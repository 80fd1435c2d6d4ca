//! End-to-end harness: a token issuer, the files service and a caller, all
//! in-process on loopback ports.

use anyhow::{Context, Result};
use auth_service::config::{AuthConfig, RateLimitConfig, TokenConfig};
use caller_service::{Caller, TokenCache, TokenClient};
use files_service::config::FilesConfig;
use secrecy::Secret;
use service_core::auth::{
    ClientConfig, Registry, RegistryConfig, ResourceServerConfig, ScopeDefinition, SigningConfig,
};
use service_core::config::{Config, Environment};
use std::sync::{Arc, Once};
use std::time::Duration;

pub const ISSUER: &str = "http://auth.workflow.test";
pub const SIGNING_KEY: &str = "workflow-shared-signing-key";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn client(client_id: &str, secret: &str, scopes: &[&str]) -> ClientConfig {
    ClientConfig {
        client_id: client_id.to_string(),
        name: client_id.to_string(),
        client_secret: Secret::new(secret.to_string()),
        previous_secret: None,
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        enabled: true,
    }
}

/// `demo` resource server plus `svc-a` (read), `svc-w` (write only) and
/// `svc-full` (both).
pub fn registry() -> Result<Registry> {
    Ok(Registry::from_config(RegistryConfig {
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
            client("svc-w", "w-secret", &["demo/write.file"]),
            client(
                "svc-full",
                "full-secret",
                &["demo/read.file", "demo/write.file"],
            ),
        ],
    })?)
}

#[derive(Debug, Clone)]
pub struct StackOptions {
    pub token_lifetime_seconds: i64,
    /// Key the files service verifies with; a different value than the
    /// issuer's simulates an untrusted signer.
    pub files_verification_key: String,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            token_lifetime_seconds: 3600,
            files_verification_key: SIGNING_KEY.to_string(),
        }
    }
}

/// Base URLs of the running services.
#[derive(Debug, Clone)]
pub struct Stack {
    pub issuer_url: String,
    pub files_url: String,
}

impl Stack {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(StackOptions::default()).await
    }

    pub async fn spawn_with(options: StackOptions) -> Result<Self> {
        init_tracing();

        let auth_config = AuthConfig {
            common: Config { port: 0 },
            environment: Environment::Dev,
            service_name: "auth-service".to_string(),
            service_version: "workflow".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            registry_path: "unused".to_string(),
            signing: SigningConfig::hs256(SIGNING_KEY, ISSUER),
            token: TokenConfig {
                lifetime_seconds: options.token_lifetime_seconds,
            },
            rate_limit: RateLimitConfig {
                token_attempts: 10_000,
                token_window_seconds: 60,
            },
        };
        let auth = auth_service::Application::build_with_registry(auth_config, registry()?)
            .await
            .context("Failed to build auth-service")?;
        let issuer_url = format!("http://127.0.0.1:{}", auth.port());
        tokio::spawn(auth.run_until_stopped());

        let files_config = FilesConfig {
            common: Config { port: 0 },
            environment: Environment::Dev,
            service_name: "files-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            registry_path: "unused".to_string(),
            signing: SigningConfig::hs256(options.files_verification_key, ISSUER),
        };
        let files = files_service::Application::build_with_registry(files_config, registry()?)
            .await
            .context("Failed to build files-service")?;
        let files_url = format!("http://127.0.0.1:{}", files.port());
        tokio::spawn(files.run_until_stopped());

        Ok(Self {
            issuer_url,
            files_url,
        })
    }

    /// Caller for `client_id` pointed at `files_url`, which may be the real
    /// service or a proxy in front of it.
    pub fn caller(&self, client_id: &str, secret: &str, files_url: &str) -> Caller {
        let http = reqwest::Client::new();
        let cache = Arc::new(TokenCache::new(
            Arc::new(self.token_client(client_id, secret)),
            chrono::Duration::seconds(30),
        ));
        Caller::new(http, files_url, cache, Duration::from_secs(5))
    }

    pub fn token_client(&self, client_id: &str, secret: &str) -> TokenClient {
        TokenClient::new(
            reqwest::Client::new(),
            &self.issuer_url,
            client_id,
            Secret::new(secret.to_string()),
            Duration::from_secs(5),
        )
    }
}
