//! OAuth2 client-credentials building blocks shared by the issuer and the
//! resource servers.

pub mod authorizer;
pub mod client_registry;
pub mod error;
pub mod registry;
pub mod resource_server;
pub mod scope;
pub mod token;

#[cfg(test)]
mod test_support;

pub use authorizer::{
    extract_bearer, require_scope, AuthorizationStage, Authorized, AuthorizedClient, Authorizer,
    ScopeGuard,
};
pub use client_registry::{
    ClientConfig, ClientRegistry, PreviousSecretConfig, RegisteredClient, SecretDigest,
};
pub use error::{AuthRejection, RegistryError};
pub use registry::{Registry, RegistryConfig};
pub use resource_server::{
    ResourceServer, ResourceServerConfig, ResourceServerRegistry, ScopeDefinition,
};
pub use scope::{Scope, ScopeSet};
pub use token::{
    AccessTokenClaims, SigningAlgorithm, SigningConfig, TokenSigner, TokenVerifier,
    TOKEN_USE_ACCESS,
};
