//! Facade error types

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to the orchestration layer
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Certificate issuance failed
    #[error(transparent)]
    X509(#[from] casa_x509::X509Error),

    /// Token derivation or signing failed
    #[error(transparent)]
    Token(#[from] casa_token::TokenError),

    /// The secret store has no such secret or field
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    /// The secret store did not answer in time
    #[error("Secret fetch timed out after {0:?}")]
    SecretFetchTimeout(Duration),

    /// The secret field is not valid base64
    #[error("Secret field is not valid base64: {0}")]
    InvalidSecretEncoding(String),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CredentialError {
    /// Whether a retry (re-fetching the secret) could succeed
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::SecretUnavailable(_) | Self::SecretFetchTimeout(_)
        )
    }
}

/// Result type for facade operations
pub type Result<T> = std::result::Result<T, CredentialError>;
