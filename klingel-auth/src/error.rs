//! Error types for credential handling.

use std::path::PathBuf;

/// Errors that can occur while loading, refreshing or using OAuth credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token file could not be read
    #[error("Failed to read token file {path}: {source}")]
    TokenFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token file could not be written
    #[error("Failed to write token file {path}: {source}")]
    TokenFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token file is not valid JSON
    #[error("Token file {path} is not valid: {source}")]
    TokenFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint rejected the refresh request
    #[error("Token refresh rejected: {0}")]
    Refresh(String),

    /// An API answered with 401 Unauthorized
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connection or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// The response did not have the expected shape or status
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Errors that can tell whether they stem from an expired or revoked token.
///
/// Used by [`CredentialGuard::authorized`](crate::CredentialGuard::authorized)
/// to decide whether a call is worth one refresh-and-retry.
pub trait Unauthorized {
    fn is_unauthorized(&self) -> bool;
}

impl Unauthorized for AuthError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Unauthorized(_))
    }
}

/// Result type for credential operations
pub type Result<T> = std::result::Result<T, AuthError>;
