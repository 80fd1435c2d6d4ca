use secrecy::Secret;
use service_core::config::{get_env, get_env_parsed, Environment};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CallerConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Base URL of the token issuer; `/oauth2/token` is appended.
    pub issuer_url: String,
    pub files_service_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub scope: Option<String>,
    pub safety_margin: chrono::Duration,
    pub mint_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on time spent retrying transport failures.
    pub max_retry_elapsed: Duration,
}

impl CallerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let config = CallerConfig {
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("caller-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            issuer_url: get_env("ISSUER_URL", Some("http://localhost:3000"), is_prod)?,
            files_service_url: get_env("FILES_SERVICE_URL", Some("http://localhost:3001"), is_prod)?,
            client_id: get_env("APP_CLIENT_ID", None, is_prod)?,
            client_secret: Secret::new(get_env("APP_CLIENT_SECRET", None, is_prod)?),
            scope: std::env::var("APP_SCOPE").ok().filter(|s| !s.trim().is_empty()),
            safety_margin: chrono::Duration::seconds(get_env_parsed(
                "TOKEN_SAFETY_MARGIN_SECONDS",
                Some("30"),
                false,
            )?),
            mint_timeout: Duration::from_millis(get_env_parsed(
                "TOKEN_MINT_TIMEOUT_MS",
                Some("5000"),
                false,
            )?),
            request_timeout: Duration::from_millis(get_env_parsed(
                "REQUEST_TIMEOUT_MS",
                Some("5000"),
                false,
            )?),
            max_retry_elapsed: Duration::from_secs(get_env_parsed(
                "MAX_RETRY_ELAPSED_SECONDS",
                Some("60"),
                false,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.client_id.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "APP_CLIENT_ID must not be empty"
            )));
        }
        if self.safety_margin < chrono::Duration::zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_SAFETY_MARGIN_SECONDS must not be negative"
            )));
        }
        if self.mint_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "timeouts must be positive"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CallerConfig {
        CallerConfig {
            environment: Environment::Dev,
            service_name: "caller-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            issuer_url: "http://localhost:3000".to_string(),
            files_service_url: "http://localhost:3001".to_string(),
            client_id: "svc-a".to_string(),
            client_secret: Secret::new("s3cr3t".to_string()),
            scope: None,
            safety_margin: chrono::Duration::seconds(30),
            mint_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            max_retry_elapsed: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut blank_id = config();
        blank_id.client_id = "  ".to_string();
        assert!(blank_id.validate().is_err());

        let mut negative_margin = config();
        negative_margin.safety_margin = chrono::Duration::seconds(-1);
        assert!(negative_margin.validate().is_err());

        let mut zero_timeout = config();
        zero_timeout.request_timeout = Duration::ZERO;
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        assert!(!format!("{:?}", config()).contains("s3cr3t"));
    }
}
