//! Compact HS256 tokens
//!
//! `base64url(header) . base64url(claims) . base64url(HMAC-SHA256)`, without
//! padding.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{Result, TokenError};
use crate::kdf::DerivedSigningKey;

type HmacSha256 = Hmac<Sha256>;

/// The only algorithm issued or accepted
pub const HS256: &str = "HS256";

/// Token header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Always `HS256`
    pub alg: String,
    /// Always `JWT`
    pub typ: String,
    /// Signing key identifier; HTCondor tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl TokenHeader {
    /// HS256 header with an optional key id
    #[must_use]
    pub fn hs256(kid: Option<&str>) -> Self {
        Self {
            alg: HS256.to_string(),
            typ: "JWT".to_string(),
            kid: kid.map(str::to_string),
        }
    }
}

/// Token claims, serialised in this field order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user identity)
    pub sub: String,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Unique token id (UUID v4, simple hex form)
    pub jti: String,
    /// Issuer (pool or ServiceX host)
    pub iss: String,
}

impl TokenClaims {
    /// Claims with a fresh `jti`
    #[must_use]
    pub fn new(subject: &str, issuer: &str, issued_at: i64) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at,
            jti: Uuid::new_v4().simple().to_string(),
            iss: issuer.to_string(),
        }
    }
}

/// Header and claims of a token whose signature has been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Decoded header
    pub header: TokenHeader,
    /// Decoded claims
    pub claims: TokenClaims,
}

/// Encode and sign a compact token
///
/// # Errors
///
/// Returns [`TokenError::Serialization`] if header or claims fail to encode.
pub fn sign_compact(
    header: &TokenHeader,
    claims: &TokenClaims,
    key: &DerivedSigningKey,
) -> Result<String> {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = mac(key, signing_input.as_bytes())?.finalize().into_bytes();
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Decode `token` and check its HS256 signature under `key`
///
/// # Errors
///
/// - [`TokenError::InvalidFormat`] for anything but a three-part HS256 token
/// - [`TokenError::InvalidSignature`] if the signature does not match
pub fn verify_compact_token(token: &str, key: &DerivedSigningKey) -> Result<VerifiedToken> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::format("Expected three dot-separated parts"));
    };

    let header: TokenHeader = serde_json::from_slice(&decode_part(header_b64, "header")?)
        .map_err(|e| TokenError::format(format!("Invalid header: {e}")))?;
    if header.alg != HS256 {
        return Err(TokenError::format(format!("Unsupported algorithm {}", header.alg)));
    }

    let signature = decode_part(signature_b64, "signature")?;
    let expected = mac(key, format!("{header_b64}.{claims_b64}").as_bytes())?
        .finalize()
        .into_bytes();
    if !bool::from(expected.as_slice().ct_eq(&signature)) {
        return Err(TokenError::InvalidSignature);
    }

    let claims: TokenClaims = serde_json::from_slice(&decode_part(claims_b64, "claims")?)
        .map_err(|e| TokenError::format(format!("Invalid claims: {e}")))?;
    Ok(VerifiedToken { header, claims })
}

fn mac(key: &DerivedSigningKey, data: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;
    mac.update(data);
    Ok(mac)
}

fn decode_part(part: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| TokenError::format(format!("Invalid {what} encoding: {e}")))
}
