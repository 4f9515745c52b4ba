//! Signing key derivation
//!
//! Keys are HKDF-SHA256 outputs over the descrambled pool secret. Salt and
//! info are fixed by the consuming services and must not change.

use std::fmt;
use std::str::FromStr;

use hkdf::Hkdf;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, TokenError};

/// Derived key length in bytes
pub const DERIVED_KEY_LEN: usize = 32;

/// HKDF info shared by every purpose
pub const MASTER_JWT_INFO: &[u8] = b"master jwt";

/// HKDF salt for HTCondor pool tokens
pub const HTCONDOR_SALT: &[u8] = b"htcondor";

/// HKDF salt for ServiceX tokens
pub const SERVICEX_SALT: &[u8] = b"servicex";

/// Key identifier of HTCondor's pool-wide signing key
pub const POOL_KEY_ID: &str = "POOL";

/// Downstream consumer a key is derived for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    /// HTCondor IDTOKEN (`salt = "htcondor"`)
    HtcondorPool,
    /// ServiceX bearer token (`salt = "servicex"`)
    ServiceX,
}

impl TokenPurpose {
    /// HKDF salt
    #[must_use]
    pub fn salt(self) -> &'static [u8] {
        match self {
            Self::HtcondorPool => HTCONDOR_SALT,
            Self::ServiceX => SERVICEX_SALT,
        }
    }

    /// HKDF info
    #[must_use]
    pub fn info(self) -> &'static [u8] {
        MASTER_JWT_INFO
    }

    /// Stable name, accepted back by [`FromStr`]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HtcondorPool => "htcondor",
            Self::ServiceX => "servicex",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenPurpose {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "htcondor" => Ok(Self::HtcondorPool),
            "servicex" => Ok(Self::ServiceX),
            other => Err(TokenError::UnknownPurpose(other.to_string())),
        }
    }
}

/// HTCondor signing key identifier (`kid`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SigningKeyId {
    /// The pool-wide key; its secret is doubled before derivation
    Pool,
    /// A per-daemon key, used as is
    Daemon(String),
}

impl SigningKeyId {
    /// Parse a caller-supplied `kid`
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKeyId`] for empty values, values with
    /// whitespace or control characters, and case variants of `POOL`.
    pub fn parse(kid: &str) -> Result<Self> {
        if kid == POOL_KEY_ID {
            return Ok(Self::Pool);
        }
        let malformed = kid.is_empty()
            || kid.chars().any(|c| c.is_whitespace() || c.is_control())
            || kid.eq_ignore_ascii_case(POOL_KEY_ID);
        if malformed {
            return Err(TokenError::InvalidKeyId(kid.to_string()));
        }
        Ok(Self::Daemon(kid.to_string()))
    }

    /// The identifier as it goes into the token header
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pool => POOL_KEY_ID,
            Self::Daemon(kid) => kid,
        }
    }

    /// Whether the secret is self-concatenated before derivation
    #[must_use]
    pub fn doubles_secret(&self) -> bool {
        matches!(self, Self::Pool)
    }
}

impl FromStr for SigningKeyId {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SigningKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 32-byte HMAC key, wiped on drop
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedSigningKey(Zeroizing<[u8; DERIVED_KEY_LEN]>);

impl DerivedSigningKey {
    /// Wrap existing key bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Raw key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedSigningKey(<redacted>)")
    }
}

/// Derive the key for `purpose` from a descrambled secret
///
/// # Errors
///
/// Returns [`TokenError::KeyDerivation`] if HKDF rejects the output length.
pub fn derive_key(secret: &[u8], purpose: TokenPurpose) -> Result<DerivedSigningKey> {
    let hkdf = Hkdf::<Sha256>::new(Some(purpose.salt()), secret);
    let mut okm = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    hkdf.expand(purpose.info(), &mut okm[..])
        .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;
    debug!(%purpose, "Derived signing key");
    Ok(DerivedSigningKey(okm))
}

/// Derive the HTCondor key for `kid`, doubling the secret for `POOL`
///
/// # Errors
///
/// Returns [`TokenError::KeyDerivation`] if HKDF rejects the output length.
pub fn derive_signing_key(
    secret: &[u8],
    purpose: TokenPurpose,
    kid: &SigningKeyId,
) -> Result<DerivedSigningKey> {
    if kid.doubles_secret() {
        let mut doubled = Zeroizing::new(Vec::with_capacity(secret.len() * 2));
        doubled.extend_from_slice(secret);
        doubled.extend_from_slice(secret);
        derive_key(&doubled, purpose)
    } else {
        derive_key(secret, purpose)
    }
}
