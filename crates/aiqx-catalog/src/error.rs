//! Catalog fetch error types.

use thiserror::Error;

/// Errors that can occur when talking to a remote pack catalog.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The host refused the request because of its rate limit.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The repository, branch or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The host returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body was not the JSON document expected.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl FetchError {
    /// Whether retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            FetchError::NotFound(_) | FetchError::InvalidDocument(_) => true,
            FetchError::ApiError { status, .. } => (400..500).contains(status),
            FetchError::RateLimited { .. }
            | FetchError::Timeout(_)
            | FetchError::NetworkError(_) => false,
        }
    }

    /// Whether `err` wraps a permanent fetch error. Errors of any other type
    /// are treated as permanent.
    pub fn is_permanent_error(err: &anyhow::Error) -> bool {
        err.downcast_ref::<FetchError>()
            .map_or(true, FetchError::is_permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanence() {
        assert!(FetchError::NotFound("x".into()).is_permanent());
        assert!(FetchError::InvalidDocument("x".into()).is_permanent());
        assert!(FetchError::ApiError { status: 401, message: String::new() }.is_permanent());
        assert!(!FetchError::ApiError { status: 502, message: String::new() }.is_permanent());
        assert!(!FetchError::RateLimited { retry_after_ms: 10 }.is_permanent());
        assert!(!FetchError::Timeout(30).is_permanent());
        assert!(!FetchError::NetworkError("reset".into()).is_permanent());
    }

    #[test]
    fn permanence_through_anyhow() {
        let transient: anyhow::Error = FetchError::Timeout(1).into();
        assert!(!FetchError::is_permanent_error(&transient));
        let other = anyhow::anyhow!("bad pack");
        assert!(FetchError::is_permanent_error(&other));
    }
}
