//! Client Registry: machine identities allowed to use the client-credentials grant.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use subtle::ConstantTimeEq;

use super::{RegistryError, ResourceServerRegistry, Scope, ScopeSet};

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    pub client_secret: Secret<String>,
    /// Secret replaced by the last rotation, honoured until `expires_at`.
    #[serde(default)]
    pub previous_secret: Option<PreviousSecretConfig>,
    /// Entitled scopes in `<resource>/<action>` form.
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviousSecretConfig {
    pub secret: Secret<String>,
    pub expires_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

/// SHA-256 of a client secret. Fixed length, so comparisons leak nothing
/// about the secret's length either.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest([u8; 32]);

impl SecretDigest {
    pub fn of(secret: &str) -> Self {
        SecretDigest(Sha256::digest(secret.as_bytes()).into())
    }

    /// Constant-time comparison.
    pub fn matches(&self, other: &SecretDigest) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    pub name: String,
    secret: SecretDigest,
    previous_secret: Option<(SecretDigest, DateTime<Utc>)>,
    pub entitled_scopes: ScopeSet,
    pub enabled: bool,
}

impl RegisteredClient {
    /// Check a presented secret against the current secret and, while its
    /// grace window is open, the previous one. Both comparisons always run.
    pub fn verify_secret_at(&self, presented: &SecretDigest, now: DateTime<Utc>) -> bool {
        let current = self.secret.matches(presented);
        let previous = match &self.previous_secret {
            Some((digest, expires_at)) => digest.matches(presented) & (now < *expires_at),
            None => false,
        };
        current | previous
    }
}

/// Immutable view of every registered client, keyed by `client_id`.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl ClientRegistry {
    /// Build the registry, rejecting entitlements to scopes that no resource
    /// server publishes.
    pub fn new(
        configs: Vec<ClientConfig>,
        resource_servers: &ResourceServerRegistry,
    ) -> Result<Self, RegistryError> {
        let mut clients = HashMap::with_capacity(configs.len());

        for config in configs {
            if config.client_id.trim().is_empty() {
                return Err(RegistryError::EmptyClientId);
            }
            if clients.contains_key(&config.client_id) {
                return Err(RegistryError::DuplicateClient(config.client_id));
            }
            if config.client_secret.expose_secret().is_empty() {
                return Err(RegistryError::EmptySecret(config.client_id));
            }

            let mut entitled_scopes = ScopeSet::new();
            for raw in &config.scopes {
                let scope: Scope = raw.parse()?;
                if !resource_servers.is_published(&scope) {
                    return Err(RegistryError::UnknownEntitlement {
                        client_id: config.client_id.clone(),
                        scope: raw.clone(),
                    });
                }
                entitled_scopes.insert(scope);
            }

            let previous_secret = config
                .previous_secret
                .as_ref()
                .map(|prev| (SecretDigest::of(prev.secret.expose_secret()), prev.expires_at));

            clients.insert(
                config.client_id.clone(),
                RegisteredClient {
                    secret: SecretDigest::of(config.client_secret.expose_secret()),
                    previous_secret,
                    client_id: config.client_id,
                    name: config.name,
                    entitled_scopes,
                    enabled: config.enabled,
                },
            );
        }

        Ok(Self { clients })
    }

    pub fn get(&self, client_id: &str) -> Option<&RegisteredClient> {
        self.clients.get(client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
