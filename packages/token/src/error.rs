//! Token error types

use thiserror::Error;

/// Token derivation and signing errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// A purpose string that names no known key derivation context
    #[error("Unknown token purpose: {0}")]
    UnknownPurpose(String),

    /// A signing key identifier that is empty, contains whitespace or is a
    /// case variant of `POOL`
    #[error("Invalid signing key id: {0:?}")]
    InvalidKeyId(String),

    /// HKDF refused the requested output
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Header, claims or macaroon could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The token is not a three-part compact JWS or uses another algorithm
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    /// The token signature does not match
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The macaroon could not be decoded or verified
    #[error("Invalid macaroon: {0}")]
    InvalidMacaroon(String),

    /// The random source failed
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

impl TokenError {
    pub(crate) fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub(crate) fn macaroon(msg: impl Into<String>) -> Self {
        Self::InvalidMacaroon(msg.into())
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for token operations
pub type Result<T> = std::result::Result<T, TokenError>;
