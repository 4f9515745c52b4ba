//! RSA key pair generation and serialization
//!
//! Keys are generated with the `rsa` crate and handed to `rcgen` as PKCS#8 so
//! certificate signing works with the ring backend, which cannot generate RSA
//! keys itself.

use rcgen::{KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, X509Error};

/// Modulus size for every key in a bundle
pub const RSA_KEY_BITS: usize = 2048;

/// Public exponent (F4)
pub const RSA_PUBLIC_EXPONENT: u64 = 65537;

/// Generates key pairs for the CA, server and user roles
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairFactory;

impl KeyPairFactory {
    /// Generate a fresh 2048-bit RSA key pair with exponent 65537
    ///
    /// # Errors
    ///
    /// Returns [`X509Error::EntropyFailure`] if the operating system random
    /// source fails. This is fatal for the calling bundle build.
    pub fn generate() -> Result<RsaKeyPair> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private_key = RsaPrivateKey::new_with_exp(&mut OsRng, RSA_KEY_BITS, &exponent)
            .map_err(|e| X509Error::EntropyFailure(format!("RSA key generation failed: {e}")))?;
        debug!(bits = RSA_KEY_BITS, "Generated RSA key pair");
        Ok(RsaKeyPair { private_key })
    }
}

/// An RSA key pair owned by exactly one certificate
///
/// The private half is wiped on drop by `rsa` itself.
#[derive(Clone)]
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
}

impl RsaKeyPair {
    /// Load a key pair from unencrypted PKCS#1 DER
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not an RSA private key.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| X509Error::Decryption(format!("Invalid PKCS#1 private key: {e}")))?;
        Ok(Self { private_key })
    }

    /// Load a key pair from an unencrypted `RSA PRIVATE KEY` PEM block
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not an RSA private key.
    pub fn from_pkcs1_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| X509Error::Decryption(format!("Invalid PKCS#1 private key: {e}")))?;
        Ok(Self { private_key })
    }

    /// Modulus size in bits
    #[must_use]
    pub fn modulus_bits(&self) -> usize {
        self.private_key.size() * 8
    }

    /// Modulus as big-endian bytes without leading zeros
    #[must_use]
    pub fn modulus_bytes(&self) -> Vec<u8> {
        self.private_key.n().to_bytes_be()
    }

    /// Public exponent as big-endian bytes
    #[must_use]
    pub fn public_exponent_bytes(&self) -> Vec<u8> {
        self.private_key.e().to_bytes_be()
    }

    /// DER-encoded SubjectPublicKeyInfo
    ///
    /// # Errors
    ///
    /// Returns an error if the public key cannot be encoded.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let public_key = RsaPublicKey::from(&self.private_key);
        let document = public_key
            .to_public_key_der()
            .map_err(|e| X509Error::encoding(format!("Public key encoding failed: {e}")))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Unencrypted PKCS#1 DER (`RSAPrivateKey`)
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded.
    pub fn to_pkcs1_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .private_key
            .to_pkcs1_der()
            .map_err(|e| X509Error::encoding(format!("Private key encoding failed: {e}")))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Unencrypted PKCS#1 PEM (`BEGIN RSA PRIVATE KEY`)
    ///
    /// Used for the server and user keys, which travel over a secured channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded.
    pub fn to_pkcs1_pem(&self) -> Result<Zeroizing<String>> {
        self.private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| X509Error::encoding(format!("Private key encoding failed: {e}")))
    }

    /// PKCS#1 PEM encrypted with AES-256-CBC under `password`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or no IV can be drawn.
    pub fn to_encrypted_pkcs1_pem(&self, password: &[u8]) -> Result<String> {
        let der = self.to_pkcs1_der()?;
        crate::pem::encrypt_private_key_pem(&der, password)
    }

    /// Signing handle for `rcgen`
    ///
    /// # Errors
    ///
    /// Returns an error if `rcgen` rejects the key.
    pub fn signing_key(&self) -> Result<KeyPair> {
        let pkcs8 = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| X509Error::encoding(format!("PKCS#8 encoding failed: {e}")))?;
        Ok(KeyPair::from_pem_and_sign_algo(&pkcs8, &PKCS_RSA_SHA256)?)
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.modulus_bits())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
