//! Macaroons in the libmacaroons V1 format
//!
//! Only first-party caveats are supported. The root key is strengthened with
//! `HMAC("macaroons-key-generator", key)` before use, matching libmacaroons
//! and pymacaroons, so the output verifies with the XRootD/XCache plugin.
//!
//! Wire format: a sequence of packets, each `LLLL` (four lowercase hex
//! digits, the packet length including themselves) followed by
//! `key value\n`, in the order `location`, `identifier`, one `cid` per caveat
//! and `signature` (32 raw bytes). The whole is base64url without padding.

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Result, TokenError};

type HmacSha256 = Hmac<Sha256>;

const KEY_GENERATOR: &[u8] = b"macaroons-key-generator";
const SIGNATURE_LEN: usize = 32;
const PACKET_PREFIX_LEN: usize = 4;
const MAX_PACKET_LEN: usize = 0xffff;

const LOCATION: &str = "location";
const IDENTIFIER: &str = "identifier";
const CAVEAT_ID: &str = "cid";
const SIGNATURE: &str = "signature";

/// A bearer credential with an ordered chain of first-party caveats
#[derive(Clone, PartialEq, Eq)]
pub struct Macaroon {
    location: String,
    identifier: String,
    caveats: Vec<String>,
    signature: [u8; SIGNATURE_LEN],
}

impl Macaroon {
    /// Mint a caveat-free macaroon
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC cannot be keyed.
    pub fn new(root_key: &[u8], location: &str, identifier: &str) -> Result<Self> {
        let derived = hmac(KEY_GENERATOR, root_key)?;
        let signature = hmac(&derived, identifier.as_bytes())?;
        Ok(Self {
            location: location.to_string(),
            identifier: identifier.to_string(),
            caveats: Vec::new(),
            signature,
        })
    }

    /// Append a first-party caveat, chaining the signature through it
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC cannot be keyed.
    pub fn add_first_party_caveat(&mut self, predicate: &str) -> Result<()> {
        self.signature = hmac(&self.signature, predicate.as_bytes())?;
        self.caveats.push(predicate.to_string());
        Ok(())
    }

    /// Target location (the cache site)
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Unique identifier
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Caveats in the order they were added
    #[must_use]
    pub fn caveats(&self) -> &[String] {
        &self.caveats
    }

    /// Current chained signature
    #[must_use]
    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    /// Recompute the signature chain from `root_key` and compare
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidSignature`] if the chain does not match.
    pub fn verify_signature(&self, root_key: &[u8]) -> Result<()> {
        let mut expected = Self::new(root_key, &self.location, &self.identifier)?;
        for caveat in &self.caveats {
            expected.add_first_party_caveat(caveat)?;
        }
        if bool::from(expected.signature[..].ct_eq(&self.signature[..])) {
            Ok(())
        } else {
            Err(TokenError::InvalidSignature)
        }
    }

    /// Encode as V1 packets, base64url without padding
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`] if a field is too long for a
    /// packet.
    pub fn serialize(&self) -> Result<String> {
        let mut raw = Vec::new();
        write_packet(&mut raw, LOCATION, self.location.as_bytes())?;
        write_packet(&mut raw, IDENTIFIER, self.identifier.as_bytes())?;
        for caveat in &self.caveats {
            write_packet(&mut raw, CAVEAT_ID, caveat.as_bytes())?;
        }
        write_packet(&mut raw, SIGNATURE, &self.signature)?;
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decode a V1 macaroon, padded or not
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidMacaroon`] if the text is not a
    /// well-formed first-party V1 macaroon.
    pub fn deserialize(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim();
        let raw = URL_SAFE_NO_PAD
            .decode(trimmed.trim_end_matches('='))
            .or_else(|_| URL_SAFE.decode(trimmed))
            .map_err(|e| TokenError::macaroon(format!("Invalid base64: {e}")))?;

        let mut location = None;
        let mut identifier = None;
        let mut caveats = Vec::new();
        let mut signature = None;

        let mut rest = raw.as_slice();
        while !rest.is_empty() {
            if signature.is_some() {
                return Err(TokenError::macaroon("Data after signature"));
            }
            let (key, value, tail) = read_packet(rest)?;
            rest = tail;
            match key {
                LOCATION if location.is_none() => location = Some(utf8(value)?),
                IDENTIFIER if identifier.is_none() && location.is_some() => {
                    identifier = Some(utf8(value)?);
                }
                CAVEAT_ID if identifier.is_some() => caveats.push(utf8(value)?),
                SIGNATURE if identifier.is_some() => {
                    let bytes: [u8; SIGNATURE_LEN] = value
                        .try_into()
                        .map_err(|_| TokenError::macaroon("Signature must be 32 bytes"))?;
                    signature = Some(bytes);
                }
                "vid" | "cl" => {
                    return Err(TokenError::macaroon("Third-party caveats are not supported"));
                }
                other => {
                    return Err(TokenError::macaroon(format!("Unexpected packet {other:?}")));
                }
            }
        }

        match (location, identifier, signature) {
            (Some(location), Some(identifier), Some(signature)) => Ok(Self {
                location,
                identifier,
                caveats,
                signature,
            }),
            _ => Err(TokenError::macaroon("Missing location, identifier or signature")),
        }
    }
}

impl std::fmt::Debug for Macaroon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Macaroon")
            .field("location", &self.location)
            .field("identifier", &self.identifier)
            .field("caveats", &self.caveats)
            .finish_non_exhaustive()
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;
    mac.update(data);
    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn write_packet(out: &mut Vec<u8>, key: &str, value: &[u8]) -> Result<()> {
    let len = PACKET_PREFIX_LEN + key.len() + 1 + value.len() + 1;
    if len > MAX_PACKET_LEN {
        return Err(TokenError::serialization(format!(
            "Macaroon {key} packet is {len} bytes, limit is {MAX_PACKET_LEN}"
        )));
    }
    out.extend_from_slice(format!("{len:04x}").as_bytes());
    out.extend_from_slice(key.as_bytes());
    out.push(b' ');
    out.extend_from_slice(value);
    out.push(b'\n');
    Ok(())
}

fn read_packet(data: &[u8]) -> Result<(&str, &[u8], &[u8])> {
    let prefix = data
        .get(..PACKET_PREFIX_LEN)
        .ok_or_else(|| TokenError::macaroon("Truncated packet header"))?;
    let prefix = std::str::from_utf8(prefix)
        .map_err(|_| TokenError::macaroon("Packet header is not hex"))?;
    let len = usize::from_str_radix(prefix, 16)
        .map_err(|_| TokenError::macaroon("Packet header is not hex"))?;
    if len <= PACKET_PREFIX_LEN + 1 || len > data.len() {
        return Err(TokenError::macaroon(format!("Bad packet length {len}")));
    }

    let body = &data[PACKET_PREFIX_LEN..len];
    let body = body
        .strip_suffix(b"\n")
        .ok_or_else(|| TokenError::macaroon("Packet missing trailing newline"))?;
    let space = body
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| TokenError::macaroon("Packet missing key separator"))?;
    let key = std::str::from_utf8(&body[..space])
        .map_err(|_| TokenError::macaroon("Packet key is not UTF-8"))?;
    Ok((key, &body[space + 1..], &data[len..]))
}

fn utf8(value: &[u8]) -> Result<String> {
    String::from_utf8(value.to_vec()).map_err(|_| TokenError::macaroon("Field is not UTF-8"))
}
