use thiserror::Error;

/// Failure kinds surfaced by [`Caller::invoke`](crate::Caller::invoke).
///
/// Authorization problems and transport problems are kept apart: only the
/// latter are worth retrying with backoff.
#[derive(Debug, Clone, Error)]
pub enum CallerError {
    #[error("authorization failed: {0}")]
    AuthFailure(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl CallerError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CallerError::TransportFailure(_) | CallerError::Timeout(_)
        )
    }

    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallerError::Timeout(format!("{}: {}", context, err))
        } else {
            CallerError::TransportFailure(format!("{}: {}", context, err))
        }
    }
}
