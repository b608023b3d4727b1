use thiserror::Error;

/// Cause kinds surfaced by a failed resolution.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("resource not found")]
    NotFound,
    #[error("extractor unavailable")]
    Unavailable,
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("resolution timed out")]
    Timeout,
    #[error("failed to parse extractor output: {0}")]
    ParseFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResolverError {
    /// Whether the processor should retry this failure class.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ResolverError::Timeout | ResolverError::RateLimited | ResolverError::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
