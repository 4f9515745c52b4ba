//! Self-signed certificate authority

use rcgen::{Issuer, KeyPair};
use tracing::debug;
use x509_parser::public_key::PublicKey;

use crate::certificate::Certificate;
use crate::error::{Result, X509Error};
use crate::keypair::{KeyPairFactory, RsaKeyPair};
use crate::pem::{decrypt_private_key_pem, is_encrypted_pem};
use crate::subject::SubjectTemplate;
use crate::template::CertificateTemplate;

/// A CA certificate together with the key that signs for it
pub struct CertificateAuthority {
    certificate: Certificate,
    key_pair: RsaKeyPair,
    issuer: Issuer<'static, KeyPair>,
}

/// Mint a fresh self-signed CA named `common_name`
///
/// Subject and issuer are identical, validity is `[now - 1d, now + 365d]` and
/// the certificate carries critical basic constraints with `CA: true` and no
/// path length limit.
///
/// # Errors
///
/// Returns [`X509Error::EntropyFailure`] if key or serial generation fails.
pub fn generate_ca(common_name: &str, subject: &SubjectTemplate) -> Result<CertificateAuthority> {
    let key_pair = KeyPairFactory::generate()?;
    let signing_key = key_pair.signing_key()?;

    let params = CertificateTemplate::new(subject.distinguished_name(common_name))?
        .certificate_authority()
        .into_params();
    let certificate = Certificate::from_rcgen(&params.clone().self_signed(&signing_key)?);
    debug!(common_name, "Generated self-signed CA certificate");

    Ok(CertificateAuthority {
        certificate,
        key_pair,
        issuer: Issuer::new(params, signing_key),
    })
}

impl CertificateAuthority {
    /// Rebuild a CA from an exported certificate and private key
    ///
    /// `key_pem` may be an encrypted PEM (then `password` is required) or an
    /// unencrypted PKCS#1 PEM.
    ///
    /// # Errors
    ///
    /// Fails if either input cannot be parsed, the password is missing or
    /// wrong, the certificate is not a CA, or the key does not belong to it.
    pub fn from_pem(cert_pem: &str, key_pem: &str, password: Option<&[u8]>) -> Result<Self> {
        let certificate = Certificate::from_pem(cert_pem)?;

        let key_pair = if is_encrypted_pem(key_pem) {
            let password = password.ok_or_else(|| {
                X509Error::Decryption("Key is encrypted but no password was given".to_string())
            })?;
            let der = decrypt_private_key_pem(key_pem, password)?;
            RsaKeyPair::from_pkcs1_der(&der)?
        } else {
            RsaKeyPair::from_pkcs1_pem(key_pem)?
        };

        let is_ca = certificate
            .summary()?
            .basic_constraints
            .is_some_and(|bc| bc.ca);
        if !is_ca {
            return Err(X509Error::chain("Certificate is not a CA certificate"));
        }
        if !key_matches(&certificate, &key_pair)? {
            return Err(X509Error::chain("Private key does not match CA certificate"));
        }

        let issuer = Issuer::from_ca_cert_pem(certificate.pem(), key_pair.signing_key()?)?;
        debug!("Loaded CA from PEM");
        Ok(Self {
            certificate,
            key_pair,
            issuer,
        })
    }

    /// The self-signed CA certificate
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The CA key pair
    #[must_use]
    pub fn key_pair(&self) -> &RsaKeyPair {
        &self.key_pair
    }

    pub(crate) fn issuer(&self) -> &Issuer<'static, KeyPair> {
        &self.issuer
    }

    /// Split into certificate and key pair, dropping the signing state
    #[must_use]
    pub fn into_parts(self) -> (Certificate, RsaKeyPair) {
        (self.certificate, self.key_pair)
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("certificate", &self.certificate)
            .field("key_pair", &self.key_pair)
            .finish_non_exhaustive()
    }
}

fn key_matches(certificate: &Certificate, key_pair: &RsaKeyPair) -> Result<bool> {
    let parsed = certificate.parsed()?;
    let public_key = parsed
        .public_key()
        .parsed()
        .map_err(|e| X509Error::parse(format!("Invalid CA public key: {e}")))?;
    match public_key {
        PublicKey::RSA(rsa) => {
            let modulus = strip_leading_zeros(rsa.modulus);
            Ok(modulus == key_pair.modulus_bytes().as_slice())
        }
        _ => Ok(false),
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
