use service_core::auth::SigningConfig;
use service_core::config::{self as core_config, get_env, Environment};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct FilesConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub registry_path: String,
    /// Only the verifying half is used here.
    pub signing: SigningConfig,
}

impl FilesConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let config = FilesConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("files-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            registry_path: get_env("REGISTRY_PATH", Some("configuration/registry.yaml"), is_prod)?,
            signing: SigningConfig::from_env(is_prod)?,
        };

        if config.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        Ok(config)
    }
}
