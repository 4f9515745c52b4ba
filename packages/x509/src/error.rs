//! Error types for certificate issuance

use thiserror::Error;

/// Certificate issuance errors
///
/// CSR validation failures are separate variants so callers can tell a forged
/// request apart from a broken one without string matching.
#[derive(Debug, Error)]
pub enum X509Error {
    /// The random source failed while generating key material or serials
    #[error("Entropy source failure: {0}")]
    EntropyFailure(String),

    /// The CSR self-signature does not verify under its own public key
    #[error("Untrusted request: CSR has an invalid signature, not signing")]
    InvalidSignature,

    /// The CSR requests extensions, which are never honoured
    #[error("Untrusted request: CSR carries {count} extension(s), which are forbidden")]
    DisallowedExtensions {
        /// Number of requested extensions found in the CSR
        count: usize,
    },

    /// The CSR could not be decoded at all
    #[error("Malformed certificate signing request: {0}")]
    MalformedRequest(String),

    /// Certificate construction or signing failed
    #[error("Certificate construction failed: {0}")]
    Certificate(#[from] rcgen::Error),

    /// Key or extension encoding failed
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Encrypted private key could not be recovered
    #[error("Private key decryption failed: {0}")]
    Decryption(String),

    /// Certificate bytes could not be parsed
    #[error("Certificate parsing failed: {0}")]
    Parse(String),

    /// Leaf does not chain to the given authority
    #[error("Certificate chain invalid: {0}")]
    ChainValidation(String),
}

impl X509Error {
    /// True for the CSR validation failures (bad signature, extensions present)
    #[must_use]
    pub fn is_untrusted_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::DisallowedExtensions { .. }
        )
    }

    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn chain(msg: impl Into<String>) -> Self {
        Self::ChainValidation(msg.into())
    }
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, X509Error>;
