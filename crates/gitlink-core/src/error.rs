use gitlink_api::{BackendError, GitHubError};
use gitlink_cache::CacheError;
use thiserror::Error;

/// All the ways things can go wrong in GitLink
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Cache operation failed: {0}")]
    CacheError(#[from] CacheError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Not allowed: {0}")]
    PermissionDenied(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Only this class of failure is shown to the user as a banner
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::GitHub(e) if e.is_rate_limited())
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, Error::Backend(BackendError::NotConfigured))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::Backend(BackendError::ConstraintViolation(_)))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::GitHub(e) if e.is_transient())
    }
}
