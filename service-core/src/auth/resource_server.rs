//! Resource Server Registry: the protected APIs and the scopes they publish.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{RegistryError, Scope, ScopeSet};

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceServerConfig {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    pub scopes: Vec<ScopeDefinition>,
}

#[derive(Debug, Clone)]
pub struct ResourceServer {
    pub identifier: String,
    pub name: String,
    /// Published scope -> human readable description.
    pub scopes: BTreeMap<Scope, String>,
}

/// Immutable view of every resource server known at startup.
#[derive(Debug, Clone, Default)]
pub struct ResourceServerRegistry {
    servers: BTreeMap<String, ResourceServer>,
    published: ScopeSet,
}

impl ResourceServerRegistry {
    pub fn new(configs: Vec<ResourceServerConfig>) -> Result<Self, RegistryError> {
        let mut servers = BTreeMap::new();
        let mut published = ScopeSet::new();

        for config in configs {
            if servers.contains_key(&config.identifier) {
                return Err(RegistryError::DuplicateResourceServer(config.identifier));
            }

            let mut scopes = BTreeMap::new();
            for definition in config.scopes {
                let scope = Scope::new(config.identifier.clone(), definition.name)?;
                if scopes.contains_key(&scope) {
                    return Err(RegistryError::DuplicateScope(scope.to_string()));
                }
                published.insert(scope.clone());
                scopes.insert(scope, definition.description);
            }

            tracing::debug!(
                resource_server = %config.identifier,
                scopes = scopes.len(),
                "Registered resource server"
            );

            servers.insert(
                config.identifier.clone(),
                ResourceServer {
                    identifier: config.identifier,
                    name: config.name,
                    scopes,
                },
            );
        }

        Ok(Self { servers, published })
    }

    pub fn get(&self, identifier: &str) -> Option<&ResourceServer> {
        self.servers.get(identifier)
    }

    pub fn is_published(&self, scope: &Scope) -> bool {
        self.published.contains(scope)
    }

    pub fn published_scopes(&self) -> &ScopeSet {
        &self.published
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config() -> ResourceServerConfig {
        ResourceServerConfig {
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
        }
    }

    #[test]
    fn test_registry_publishes_scopes() {
        let registry = ResourceServerRegistry::new(vec![demo_config()]).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_published(&"demo/read.file".parse().unwrap()));
        assert!(registry.is_published(&"demo/write.file".parse().unwrap()));
        assert!(!registry.is_published(&"demo/delete.file".parse().unwrap()));

        let server = registry.get("demo").unwrap();
        assert_eq!(
            server.scopes.get(&"demo/read.file".parse::<Scope>().unwrap()).unwrap(),
            "read files"
        );
    }

    #[test]
    fn test_duplicate_resource_server_rejected() {
        let result = ResourceServerRegistry::new(vec![demo_config(), demo_config()]);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateResourceServer(id)) if id == "demo"
        ));
    }

    #[test]
    fn test_duplicate_scope_rejected() {
        let mut config = demo_config();
        config.scopes.push(ScopeDefinition {
            name: "read.file".to_string(),
            description: String::new(),
        });
        assert!(matches!(
            ResourceServerRegistry::new(vec![config]),
            Err(RegistryError::DuplicateScope(_))
        ));
    }

    #[test]
    fn test_malformed_scope_name_rejected() {
        let mut config = demo_config();
        config.scopes[0].name = "read file".to_string();
        assert!(matches!(
            ResourceServerRegistry::new(vec![config]),
            Err(RegistryError::InvalidScope(_))
        ));
    }
}
