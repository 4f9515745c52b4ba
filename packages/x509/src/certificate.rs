//! Certificate and signing request values
//!
//! Both types keep the DER bytes and the PEM text of what was signed and are
//! immutable afterwards. Inspection goes through `x509-parser`.

use ::pem::Pem;
use time::OffsetDateTime;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{Result, X509Error};
use crate::pem::encode_lf;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const REQUEST_LABEL: &str = "CERTIFICATE REQUEST";

/// An issued X.509 certificate
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    pem: String,
}

impl Certificate {
    pub(crate) fn from_rcgen(certificate: &rcgen::Certificate) -> Self {
        Self {
            der: certificate.der().to_vec(),
            pem: certificate.pem(),
        }
    }

    /// Parse the first `CERTIFICATE` block of a PEM text
    ///
    /// Other blocks, such as the private key leading a combined
    /// `hostcert.pem`, are skipped. Only the certificate is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the text holds no parseable certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let block = ::pem::parse_many(pem)
            .map_err(|e| X509Error::parse(format!("Invalid PEM: {e}")))?
            .into_iter()
            .find(|block| block.tag() == CERTIFICATE_LABEL)
            .ok_or_else(|| X509Error::parse("No CERTIFICATE block found"))?;
        X509Certificate::from_der(block.contents())
            .map_err(|e| X509Error::parse(format!("Invalid certificate: {e}")))?;
        Ok(Self {
            pem: encode_lf(&block),
            der: block.into_contents(),
        })
    }

    /// DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding (`BEGIN CERTIFICATE`)
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub(crate) fn parsed(&self) -> Result<X509Certificate<'_>> {
        let (_, certificate) = X509Certificate::from_der(&self.der)
            .map_err(|e| X509Error::parse(format!("Invalid certificate: {e}")))?;
        Ok(certificate)
    }

    /// Decode the fields callers usually care about
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate or one of its extensions is malformed.
    pub fn summary(&self) -> Result<CertificateSummary> {
        let cert = self.parsed()?;

        let basic_constraints = cert
            .basic_constraints()
            .map_err(|e| X509Error::parse(format!("Invalid basic constraints: {e}")))?
            .map(|ext| BasicConstraintsSummary {
                critical: ext.critical,
                ca: ext.value.ca,
                path_len_constraint: ext.value.path_len_constraint,
            });

        let key_usage = cert
            .key_usage()
            .map_err(|e| X509Error::parse(format!("Invalid key usage: {e}")))?
            .map(|ext| KeyUsageSummary {
                critical: ext.critical,
                digital_signature: ext.value.digital_signature(),
                key_encipherment: ext.value.key_encipherment(),
                key_cert_sign: ext.value.key_cert_sign(),
            });

        let extended_key_usage = cert
            .extended_key_usage()
            .map_err(|e| X509Error::parse(format!("Invalid extended key usage: {e}")))?
            .map(|ext| ExtendedKeyUsageSummary {
                critical: ext.critical,
                client_auth: ext.value.client_auth,
                server_auth: ext.value.server_auth,
            });

        Ok(CertificateSummary {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            subject_common_name: first_common_name(cert.subject()),
            issuer_common_name: first_common_name(cert.issuer()),
            serial: cert.raw_serial().to_vec(),
            not_before: cert.validity().not_before.to_datetime(),
            not_after: cert.validity().not_after.to_datetime(),
            public_key_der: cert.public_key().raw.to_vec(),
            basic_constraints,
            key_usage,
            extended_key_usage,
        })
    }

    /// Check that this certificate chains to `authority`
    ///
    /// The issuer name must equal the authority's subject, the authority must
    /// carry `CA: true`, the signature must verify under the authority's key
    /// and both certificates must be inside their validity windows.
    ///
    /// # Errors
    ///
    /// Returns [`X509Error::ChainValidation`] naming the first failed check.
    pub fn verify_issued_by(&self, authority: &Certificate) -> Result<()> {
        self.verify_issued_by_at(authority, OffsetDateTime::now_utc())
    }

    /// [`Certificate::verify_issued_by`] evaluated at a fixed instant
    ///
    /// # Errors
    ///
    /// Returns [`X509Error::ChainValidation`] naming the first failed check.
    pub fn verify_issued_by_at(&self, authority: &Certificate, at: OffsetDateTime) -> Result<()> {
        let leaf = self.parsed()?;
        let ca = authority.parsed()?;

        if leaf.issuer().as_raw() != ca.subject().as_raw() {
            return Err(X509Error::chain(format!(
                "Issuer '{}' does not match authority subject '{}'",
                leaf.issuer(),
                ca.subject()
            )));
        }

        let is_ca = ca
            .basic_constraints()
            .map_err(|e| X509Error::chain(format!("Authority basic constraints unreadable: {e}")))?
            .is_some_and(|ext| ext.value.ca);
        if !is_ca {
            return Err(X509Error::chain("Authority is not a CA certificate"));
        }

        leaf.verify_signature(Some(ca.public_key()))
            .map_err(|e| X509Error::chain(format!("Signature does not verify: {e}")))?;

        let timestamp = at.unix_timestamp();
        for (what, cert) in [("Certificate", &leaf), ("Authority", &ca)] {
            let validity = cert.validity();
            if timestamp < validity.not_before.timestamp() || timestamp > validity.not_after.timestamp() {
                return Err(X509Error::chain(format!("{what} is outside its validity window")));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

fn first_common_name(name: &x509_parser::x509::X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}

/// Decoded view of a [`Certificate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Subject in RFC 4514 form
    pub subject: String,
    /// Issuer in RFC 4514 form
    pub issuer: String,
    /// Subject common name
    pub subject_common_name: Option<String>,
    /// Issuer common name
    pub issuer_common_name: Option<String>,
    /// Raw serial number bytes
    pub serial: Vec<u8>,
    /// Start of validity
    pub not_before: OffsetDateTime,
    /// End of validity
    pub not_after: OffsetDateTime,
    /// DER SubjectPublicKeyInfo
    pub public_key_der: Vec<u8>,
    /// Basic constraints, if present
    pub basic_constraints: Option<BasicConstraintsSummary>,
    /// Key usage, if present
    pub key_usage: Option<KeyUsageSummary>,
    /// Extended key usage, if present
    pub extended_key_usage: Option<ExtendedKeyUsageSummary>,
}

/// Basic constraints extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraintsSummary {
    /// Extension marked critical
    pub critical: bool,
    /// `cA` flag
    pub ca: bool,
    /// Path length, `None` when unconstrained
    pub path_len_constraint: Option<u32>,
}

/// Key usage extension (the bits this crate sets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsageSummary {
    /// Extension marked critical
    pub critical: bool,
    /// digitalSignature
    pub digital_signature: bool,
    /// keyEncipherment
    pub key_encipherment: bool,
    /// keyCertSign
    pub key_cert_sign: bool,
}

/// Extended key usage extension (TLS purposes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedKeyUsageSummary {
    /// Extension marked critical
    pub critical: bool,
    /// id-kp-clientAuth
    pub client_auth: bool,
    /// id-kp-serverAuth
    pub server_auth: bool,
}

/// A PKCS#10 certificate signing request
///
/// Nothing about a request is trusted until [`crate::leaf::sign_csr`] has
/// validated it.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningRequest {
    der: Vec<u8>,
    pem: String,
}

impl SigningRequest {
    pub(crate) fn from_rcgen(request: &rcgen::CertificateSigningRequest) -> Result<Self> {
        Ok(Self {
            der: request.der().to_vec(),
            pem: request.pem()?,
        })
    }

    /// Wrap DER bytes received from an untrusted party
    ///
    /// The bytes are not checked here; validation happens at signing time.
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        let pem = encode_lf(&Pem::new(REQUEST_LABEL, der.clone()));
        Self { der, pem }
    }

    /// Parse a PEM-armoured request
    ///
    /// # Errors
    ///
    /// Returns [`X509Error::MalformedRequest`] if no request block is found.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let block = ::pem::parse(pem)
            .map_err(|e| X509Error::MalformedRequest(format!("Invalid PEM: {e}")))?;
        if block.tag() != REQUEST_LABEL {
            return Err(X509Error::MalformedRequest(format!(
                "Expected {REQUEST_LABEL} block, found {}",
                block.tag()
            )));
        }
        Ok(Self::from_der(block.into_contents()))
    }

    /// DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding (`BEGIN CERTIFICATE REQUEST`)
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub(crate) fn parsed(&self) -> Result<X509CertificationRequest<'_>> {
        let (_, request) = X509CertificationRequest::from_der(&self.der)
            .map_err(|e| X509Error::MalformedRequest(e.to_string()))?;
        Ok(request)
    }
}

impl std::fmt::Debug for SigningRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningRequest")
            .field("der_len", &self.der.len())
            .finish()
    }
}
