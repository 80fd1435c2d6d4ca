use backoff::ExponentialBackoff;
use caller_service::{build_caller, config::CallerConfig, CallerError};
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = CallerConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    let caller = build_caller(&config).map_err(|e| AppError::InternalError(e.into()))?;

    tracing::info!(
        client_id = %config.client_id,
        issuer = %config.issuer_url,
        files_service = %config.files_service_url,
        "Calling files service"
    );

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(config.max_retry_elapsed),
        ..ExponentialBackoff::default()
    };

    // Only transport problems are retried; auth failures are final.
    let result = backoff::future::retry_notify(
        policy,
        || async {
            caller.list_files().await.map_err(|e| {
                if e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        },
        |err: CallerError, wait| {
            tracing::warn!(error = %err, retry_in = ?wait, "Transient failure calling files service");
        },
    )
    .await;

    match result {
        Ok(files) => {
            tracing::info!(files = ?files, count = files.len(), "Successfully received data");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "An error occurred");
            Err(AppError::InternalError(e.into()))
        }
    }
}
