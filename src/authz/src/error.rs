//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// A denied request is not an error: [`crate::Enforcer::enforce`] returns
/// `false` for it.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Policy store call failed (connection, transaction, serialization)
    #[error("Policy store unavailable: {0}")]
    StoreUnavailable(String),

    /// Role, user or permission not present in the policy store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (configuration value, malformed record)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AuthzError {
    /// True when the error came from the backing store rather than the caller
    pub fn is_store_error(&self) -> bool {
        matches!(self, AuthzError::StoreUnavailable(_))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
