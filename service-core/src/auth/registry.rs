//! Loading both registries from one static configuration document.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use super::{ClientConfig, ClientRegistry, RegistryError, ResourceServerConfig, ResourceServerRegistry};

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub resource_servers: Vec<ResourceServerConfig>,
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

/// Resource servers and clients, validated against each other. Read-only
/// after construction and cheap to clone.
#[derive(Debug, Clone)]
pub struct Registry {
    pub resource_servers: Arc<ResourceServerRegistry>,
    pub clients: Arc<ClientRegistry>,
}

impl Registry {
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let resource_servers = ResourceServerRegistry::new(config.resource_servers)?;
        let clients = ClientRegistry::new(config.clients, &resource_servers)?;

        tracing::info!(
            resource_servers = resource_servers.len(),
            clients = clients.len(),
            "Registry loaded"
        );

        Ok(Self {
            resource_servers: Arc::new(resource_servers),
            clients: Arc::new(clients),
        })
    }

    /// Load from a YAML, TOML or JSON file; the format follows the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let config: RegistryConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RegistryError::Load(format!("{}: {}", path.display(), e)))?;

        Self::from_config(config)
    }
}
