use serde::Deserialize;
use service_core::auth::SigningConfig;
use service_core::config::{self as core_config, get_env, get_env_parsed, Environment};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Path of the static registry document (resource servers and clients).
    pub registry_path: String,
    pub signing: SigningConfig,
    pub token: TokenConfig,
    pub rate_limit: RateLimitConfig,
}

/// Longest access token the issuer will mint (one day).
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 86_400;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub lifetime_seconds: i64,
}

impl TokenConfig {
    /// `lifetime_seconds` as a duration, within `1..=MAX_TOKEN_LIFETIME_SECONDS`.
    pub fn lifetime(&self) -> Result<chrono::Duration, AppError> {
        if !(1..=MAX_TOKEN_LIFETIME_SECONDS).contains(&self.lifetime_seconds) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_LIFETIME_SECONDS must be between 1 and {}",
                MAX_TOKEN_LIFETIME_SECONDS
            )));
        }
        chrono::Duration::try_seconds(self.lifetime_seconds).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("TOKEN_LIFETIME_SECONDS out of range"))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub token_attempts: u32,
    pub token_window_seconds: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("auth-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            registry_path: get_env("REGISTRY_PATH", Some("configuration/registry.yaml"), is_prod)?,
            signing: SigningConfig::from_env(is_prod)?,
            token: TokenConfig {
                lifetime_seconds: get_env_parsed("TOKEN_LIFETIME_SECONDS", Some("3600"), false)?,
            },
            rate_limit: RateLimitConfig {
                token_attempts: get_env_parsed("RATE_LIMIT_TOKEN_ATTEMPTS", Some("60"), false)?,
                token_window_seconds: get_env_parsed(
                    "RATE_LIMIT_TOKEN_WINDOW_SECONDS",
                    Some("60"),
                    false,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        self.token.lifetime()?;

        if self.rate_limit.token_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RATE_LIMIT_TOKEN_ATTEMPTS must be positive"
            )));
        }

        if self.environment.is_prod() && self.signing.issuer.starts_with("http://") {
            tracing::warn!(issuer = %self.signing.issuer, "Token issuer is not served over https");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            common: core_config::Config { port: 3000 },
            environment: Environment::Dev,
            service_name: "auth-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            registry_path: "configuration/registry.yaml".to_string(),
            signing: SigningConfig::hs256("secret", "http://localhost:3000"),
            token: TokenConfig {
                lifetime_seconds: 3600,
            },
            rate_limit: RateLimitConfig {
                token_attempts: 60,
                token_window_seconds: 60,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_non_positive_lifetime_rejected() {
        let mut config = config();
        config.token.lifetime_seconds = 0;
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_excessive_lifetime_rejected() {
        let mut config = config();
        config.token.lifetime_seconds = MAX_TOKEN_LIFETIME_SECONDS;
        assert!(config.validate().is_ok());

        for lifetime_seconds in [MAX_TOKEN_LIFETIME_SECONDS + 1, i64::MAX] {
            config.token.lifetime_seconds = lifetime_seconds;
            assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
        }
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = config();
        config.common.port = 0;
        assert!(config.validate().is_err());
    }
}
