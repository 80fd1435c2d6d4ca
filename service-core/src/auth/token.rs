//! Signed access tokens: claims, signing and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;

use super::{AuthRejection, ScopeSet};
use crate::config::get_env;
use crate::error::AppError;

pub const TOKEN_USE_ACCESS: &str = "access";

/// Claims carried by every access token the issuer mints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject, always the client_id for client-credentials tokens.
    pub sub: String,
    pub client_id: String,
    /// Granted scopes, space delimited on the wire.
    #[serde(default)]
    pub scope: ScopeSet,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_use: String,
}

impl AccessTokenClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    Hs256,
    Rs256,
}

impl SigningAlgorithm {
    fn as_jwt(self) -> Algorithm {
        match self {
            SigningAlgorithm::Hs256 => Algorithm::HS256,
            SigningAlgorithm::Rs256 => Algorithm::RS256,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(SigningAlgorithm::Hs256),
            "RS256" => Ok(SigningAlgorithm::Rs256),
            other => Err(format!("Unsupported signing algorithm: {}", other)),
        }
    }
}

/// Signs access tokens. Only the issuer holds one of these.
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    issuer: String,
}

impl TokenSigner {
    pub fn hs256(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            algorithm: SigningAlgorithm::Hs256,
            encoding_key: EncodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    pub fn rs256_pem(private_key_pem: &[u8], issuer: impl Into<String>) -> anyhow::Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;
        Ok(Self {
            algorithm: SigningAlgorithm::Rs256,
            encoding_key,
            issuer: issuer.into(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn sign(&self, claims: &AccessTokenClaims) -> anyhow::Result<String> {
        let header = Header::new(self.algorithm.as_jwt());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }
}

/// Verifies access tokens against the issuer's key and identifier.
#[derive(Clone)]
pub struct TokenVerifier {
    algorithm: SigningAlgorithm,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenVerifier {
    pub fn hs256(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            algorithm: SigningAlgorithm::Hs256,
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    pub fn rs256_pem(public_key_pem: &[u8], issuer: impl Into<String>) -> anyhow::Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;
        Ok(Self {
            algorithm: SigningAlgorithm::Rs256,
            decoding_key,
            issuer: issuer.into(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Check signature, algorithm, issuer and claim shape.
    ///
    /// Expiry is deliberately left to the caller so that it can be evaluated
    /// against an injected clock with zero leeway.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AuthRejection> {
        let mut validation = Validation::new(self.algorithm.as_jwt());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AuthRejection::InvalidSignature(e.to_string()))?;

        if data.claims.token_use != TOKEN_USE_ACCESS {
            return Err(AuthRejection::InvalidSignature(format!(
                "unexpected token_use {:?}",
                data.claims.token_use
            )));
        }

        Ok(data.claims)
    }
}

/// Key material and issuer identity shared by the issuer and resource servers.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub algorithm: SigningAlgorithm,
    pub shared_secret: Option<Secret<String>>,
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
    pub issuer: String,
}

impl SigningConfig {
    pub fn hs256(shared_secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            algorithm: SigningAlgorithm::Hs256,
            shared_secret: Some(Secret::new(shared_secret.into())),
            private_key_path: None,
            public_key_path: None,
            issuer: issuer.into(),
        }
    }

    /// Read `JWT_ALGORITHM`, `JWT_SHARED_SECRET`, `JWT_PRIVATE_KEY_PATH`,
    /// `JWT_PUBLIC_KEY_PATH` and `TOKEN_ISSUER`.
    pub fn from_env(is_prod: bool) -> Result<Self, AppError> {
        let algorithm = get_env("JWT_ALGORITHM", Some("HS256"), false)?
            .parse::<SigningAlgorithm>()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let (shared_secret, private_key_path, public_key_path) = match algorithm {
            SigningAlgorithm::Hs256 => (
                Some(Secret::new(get_env(
                    "JWT_SHARED_SECRET",
                    Some("dev-only-shared-secret-change-me"),
                    is_prod,
                )?)),
                None,
                None,
            ),
            SigningAlgorithm::Rs256 => (
                None,
                std::env::var("JWT_PRIVATE_KEY_PATH").ok(),
                std::env::var("JWT_PUBLIC_KEY_PATH").ok(),
            ),
        };

        Ok(Self {
            algorithm,
            shared_secret,
            private_key_path,
            public_key_path,
            issuer: get_env("TOKEN_ISSUER", Some("http://localhost:3000"), is_prod)?,
        })
    }

    pub fn signer(&self) -> Result<TokenSigner, AppError> {
        match self.algorithm {
            SigningAlgorithm::Hs256 => Ok(TokenSigner::hs256(
                self.shared_secret()?.as_bytes(),
                &self.issuer,
            )),
            SigningAlgorithm::Rs256 => {
                let pem = read_key("JWT_PRIVATE_KEY_PATH", self.private_key_path.as_deref())?;
                TokenSigner::rs256_pem(pem.as_bytes(), &self.issuer).map_err(AppError::ConfigError)
            }
        }
    }

    pub fn verifier(&self) -> Result<TokenVerifier, AppError> {
        match self.algorithm {
            SigningAlgorithm::Hs256 => Ok(TokenVerifier::hs256(
                self.shared_secret()?.as_bytes(),
                &self.issuer,
            )),
            SigningAlgorithm::Rs256 => {
                let pem = read_key("JWT_PUBLIC_KEY_PATH", self.public_key_path.as_deref())?;
                TokenVerifier::rs256_pem(pem.as_bytes(), &self.issuer)
                    .map_err(AppError::ConfigError)
            }
        }
    }

    fn shared_secret(&self) -> Result<&str, AppError> {
        self.shared_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("JWT_SHARED_SECRET is not set")))
    }
}

fn read_key(name: &str, path: Option<&str>) -> Result<String, AppError> {
    let path =
        path.ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("{} is not set", name)))?;
    fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Failed to read key from {}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ISSUER: &str = "http://issuer.test";

    fn claims(exp_in: Duration) -> AccessTokenClaims {
        let now = Utc::now();
        AccessTokenClaims {
            sub: "svc-a".to_string(),
            client_id: "svc-a".to_string(),
            scope: ScopeSet::parse_delimited("demo/read.file").unwrap(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + exp_in).timestamp(),
            jti: "jti-1".to_string(),
            token_use: TOKEN_USE_ACCESS.to_string(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = TokenSigner::hs256(b"secret", ISSUER);
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);

        let token = signer.sign(&claims(Duration::hours(1))).unwrap();
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.client_id, "svc-a");
        assert_eq!(verified.scope.to_string(), "demo/read.file");
    }

    #[test]
    fn test_expiry_is_not_checked_by_verify() {
        let signer = TokenSigner::hs256(b"secret", ISSUER);
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);

        let expired = claims(-Duration::hours(1));
        let token = signer.sign(&expired).unwrap();
        let verified = verifier.verify(&token).unwrap();
        assert!(verified.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer = TokenSigner::hs256(b"attacker", ISSUER);
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);

        let token = signer.sign(&claims(Duration::hours(1))).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthRejection::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let signer = TokenSigner::hs256(b"secret", "http://elsewhere");
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);

        let mut foreign = claims(Duration::hours(1));
        foreign.iss = "http://elsewhere".to_string();
        let token = signer.sign(&foreign).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = TokenSigner::hs256(b"secret", ISSUER);
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);
        let token = signer.sign(&claims(Duration::hours(1))).unwrap();

        let other = signer
            .sign(&AccessTokenClaims {
                scope: ScopeSet::parse_delimited("demo/read.file demo/write.file").unwrap(),
                ..claims(Duration::hours(1))
            })
            .unwrap();

        // Header and signature from one token, payload from another
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(verifier.verify(&spliced).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_non_access_token_rejected() {
        let signer = TokenSigner::hs256(b"secret", ISSUER);
        let verifier = TokenVerifier::hs256(b"secret", ISSUER);
        let mut refresh = claims(Duration::hours(1));
        refresh.token_use = "refresh".to_string();
        let token = signer.sign(&refresh).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("hs256".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::Hs256));
        assert_eq!("RS256".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::Rs256));
        assert!("none".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn test_rs256_requires_key_path() {
        let config = SigningConfig {
            algorithm: SigningAlgorithm::Rs256,
            shared_secret: None,
            private_key_path: None,
            public_key_path: None,
            issuer: ISSUER.to_string(),
        };
        assert!(matches!(config.signer(), Err(AppError::ConfigError(_))));
        assert!(TokenSigner::rs256_pem(b"garbage", ISSUER).is_err());
    }
}
