//! Token Issuer: exchanges client credentials for signed, scoped access tokens.

use chrono::{DateTime, Duration, Utc};
use service_core::auth::{
    AccessTokenClaims, ClientRegistry, Registry, ScopeSet, SecretDigest, TokenSigner,
    TOKEN_USE_ACCESS,
};
use std::hint::black_box;
use std::sync::Arc;
use uuid::Uuid;

use super::GrantError;

/// A freshly minted token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub claims: AccessTokenClaims,
    pub expires_in: i64,
}

impl IssuedToken {
    pub fn granted_scopes(&self) -> &ScopeSet {
        &self.claims.scope
    }
}

pub struct TokenIssuer {
    clients: Arc<ClientRegistry>,
    signer: TokenSigner,
    lifetime: Duration,
    /// Compared against when the client is unknown so both failure paths do
    /// the same work.
    dummy_digest: SecretDigest,
}

impl TokenIssuer {
    pub fn new(registry: &Registry, signer: TokenSigner, lifetime: Duration) -> Self {
        Self {
            clients: Arc::clone(&registry.clients),
            signer,
            lifetime,
            dummy_digest: SecretDigest::of(&Uuid::new_v4().to_string()),
        }
    }

    pub fn issuer(&self) -> &str {
        self.signer.issuer()
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn mint(
        &self,
        client_id: &str,
        client_secret: &str,
        requested_scopes: Option<&ScopeSet>,
    ) -> Result<IssuedToken, GrantError> {
        self.mint_at(client_id, client_secret, requested_scopes, Utc::now())
    }

    /// Mint with an explicit clock.
    ///
    /// Without `requested_scopes` the full entitlement is granted. Otherwise the
    /// grant is the intersection with the entitlement; scopes outside it are
    /// dropped, never reported as an error.
    pub fn mint_at(
        &self,
        client_id: &str,
        client_secret: &str,
        requested_scopes: Option<&ScopeSet>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, GrantError> {
        let presented = SecretDigest::of(client_secret);

        let client = match self.clients.get(client_id) {
            Some(client) => client,
            None => {
                black_box(self.dummy_digest.matches(&presented));
                return Err(GrantError::InvalidClient);
            }
        };

        if !client.verify_secret_at(&presented, now) {
            return Err(GrantError::InvalidSecret);
        }

        if !client.enabled {
            return Err(GrantError::ClientDisabled);
        }

        let granted = match requested_scopes {
            None => client.entitled_scopes.clone(),
            Some(requested) => {
                let dropped = requested.difference(&client.entitled_scopes);
                if !dropped.is_empty() {
                    tracing::debug!(
                        client_id = %client.client_id,
                        dropped = %dropped,
                        "Dropping requested scopes outside entitlement"
                    );
                }
                requested.intersection(&client.entitled_scopes)
            }
        };

        let expires_at = now + self.lifetime;
        let claims = AccessTokenClaims {
            sub: client.client_id.clone(),
            client_id: client.client_id.clone(),
            scope: granted,
            iss: self.signer.issuer().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
        };

        let access_token = self.signer.sign(&claims).map_err(GrantError::Signing)?;

        tracing::info!(
            client_id = %claims.client_id,
            scope = %claims.scope,
            jti = %claims.jti,
            expires_at = claims.exp,
            "Access token issued"
        );

        Ok(IssuedToken {
            access_token,
            expires_in: self.lifetime.num_seconds(),
            claims,
        })
    }
}
