//! Leaf certificate issuance
//!
//! Server certificates are signed directly. User certificates go through a
//! CSR that is validated before the CA vouches for it: the self-signature
//! must verify and the request must not ask for any extension. Everything
//! the certificate ends up carrying is decided here, never by the requester.

use rcgen::{CertificateParams, CertificateSigningRequestParams};
use tracing::{debug, warn};

use crate::authority::CertificateAuthority;
use crate::certificate::{Certificate, SigningRequest};
use crate::error::{Result, X509Error};
use crate::keypair::{KeyPairFactory, RsaKeyPair};
use crate::subject::SubjectTemplate;
use crate::template::{CertificateTemplate, LeafUsage};

/// Issue a TLS client+server certificate under `ca`
///
/// # Errors
///
/// Returns an error if key generation or signing fails.
pub fn issue_server_certificate(
    ca: &CertificateAuthority,
    common_name: &str,
    subject: &SubjectTemplate,
) -> Result<(Certificate, RsaKeyPair)> {
    let key_pair = KeyPairFactory::generate()?;
    let certificate = CertificateTemplate::new(subject.distinguished_name(common_name))?
        .leaf(LeafUsage::ClientAndServer)?
        .sign(&key_pair.signing_key()?, ca.issuer())?;
    debug!(common_name, "Issued server certificate");
    Ok((Certificate::from_rcgen(&certificate), key_pair))
}

/// Create a self-signed request carrying only a subject and a public key
///
/// # Errors
///
/// Returns an error if key generation or request signing fails.
pub fn build_csr(
    common_name: &str,
    subject: &SubjectTemplate,
) -> Result<(SigningRequest, RsaKeyPair)> {
    let key_pair = KeyPairFactory::generate()?;

    let mut params = CertificateParams::default();
    params.distinguished_name = subject.distinguished_name(common_name);
    let request = params.serialize_request(&key_pair.signing_key()?)?;

    debug!(common_name, "Built certificate signing request");
    Ok((SigningRequest::from_rcgen(&request)?, key_pair))
}

/// Validate `csr` and issue a TLS client certificate for it under `ca`
///
/// # Errors
///
/// - [`X509Error::MalformedRequest`] if the request cannot be decoded
/// - [`X509Error::InvalidSignature`] if its self-signature does not verify
/// - [`X509Error::DisallowedExtensions`] if it requests any extension
pub fn sign_csr(ca: &CertificateAuthority, csr: &SigningRequest) -> Result<Certificate> {
    let request = csr.parsed()?;

    if let Err(e) = request.verify_signature() {
        warn!(error = %e, "Rejected CSR with invalid signature");
        return Err(X509Error::InvalidSignature);
    }

    let count = request
        .requested_extensions()
        .map_or(0, |extensions| extensions.count());
    if count > 0 {
        warn!(count, "Rejected CSR requesting extensions");
        return Err(X509Error::DisallowedExtensions { count });
    }

    let mut request_params = CertificateSigningRequestParams::from_der(&csr.der().to_vec().into())
        .map_err(|e| X509Error::MalformedRequest(e.to_string()))?;
    let subject = request_params.params.distinguished_name.clone();
    request_params.params = CertificateTemplate::new(subject)?
        .leaf(LeafUsage::ClientOnly)?
        .into_params();

    let certificate = request_params.signed_by(ca.issuer())?;
    debug!("Signed client certificate from CSR");
    Ok(Certificate::from_rcgen(&certificate))
}

/// Issue a TLS client certificate through the CSR path
///
/// # Errors
///
/// Returns an error if any step of [`build_csr`] or [`sign_csr`] fails.
pub fn issue_user_certificate(
    ca: &CertificateAuthority,
    common_name: &str,
    subject: &SubjectTemplate,
) -> Result<(Certificate, RsaKeyPair)> {
    let (csr, key_pair) = build_csr(common_name, subject)?;
    let certificate = sign_csr(ca, &csr)?;
    Ok((certificate, key_pair))
}
