//! Certificate templates
//!
//! A [`CertificateTemplate`] accumulates subject, validity, serial and
//! extensions by value and is consumed by a single signing step, so no
//! partially built certificate is ever observable.

use const_oid::db::rfc5280::{ID_KP_CLIENT_AUTH, ID_KP_SERVER_AUTH};
use der::Encode;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, IsCa, Issuer,
    KeyPair, KeyUsagePurpose, SerialNumber,
};
use time::{Duration, OffsetDateTime};
use x509_cert::ext::pkix::ExtendedKeyUsage;

use crate::error::{Result, X509Error};

/// Days a certificate stays valid after issuance
pub const VALIDITY_DAYS: i64 = 365;

/// Days `notBefore` is moved into the past to absorb clock skew
pub const BACKDATE_DAYS: i64 = 1;

/// Serial length in bytes; the top bit is cleared, leaving 159 random bits
pub const SERIAL_LEN: usize = 20;

const OID_EXT_KEY_USAGE: &[u64] = &[2, 5, 29, 37];

/// `[issued - 1 day, issued + 365 days]`, truncated to whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// Start of validity
    pub not_before: OffsetDateTime,
    /// End of validity
    pub not_after: OffsetDateTime,
}

impl ValidityWindow {
    /// Window for a certificate issued now
    #[must_use]
    pub fn starting_now() -> Self {
        Self::issued_at(OffsetDateTime::now_utc())
    }

    /// Window for a certificate issued at `issued`
    #[must_use]
    pub fn issued_at(issued: OffsetDateTime) -> Self {
        let issued = issued.replace_nanosecond(0).unwrap_or(issued);
        Self {
            not_before: issued - Duration::days(BACKDATE_DAYS),
            not_after: issued + Duration::days(VALIDITY_DAYS),
        }
    }

    /// Whether `at` falls inside the window
    #[must_use]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Extended key usage granted to a leaf certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafUsage {
    /// TLS client and server authentication (server certificates)
    ClientAndServer,
    /// TLS client authentication only (user certificates)
    ClientOnly,
}

impl LeafUsage {
    fn extension(self) -> Result<CustomExtension> {
        let purposes = match self {
            Self::ClientAndServer => vec![ID_KP_CLIENT_AUTH, ID_KP_SERVER_AUTH],
            Self::ClientOnly => vec![ID_KP_CLIENT_AUTH],
        };
        let content = ExtendedKeyUsage(purposes)
            .to_der()
            .map_err(|e| X509Error::encoding(format!("Extended key usage encoding failed: {e}")))?;

        // rcgen marks its own extended key usage non-critical
        let mut extension = CustomExtension::from_oid_content(OID_EXT_KEY_USAGE, content);
        extension.set_criticality(true);
        Ok(extension)
    }
}

/// Random positive serial drawn from the operating system
///
/// # Errors
///
/// Returns [`X509Error::EntropyFailure`] if the random source fails.
pub fn random_serial() -> Result<SerialNumber> {
    let mut bytes = [0u8; SERIAL_LEN];
    getrandom::fill(&mut bytes)
        .map_err(|e| X509Error::EntropyFailure(format!("Serial generation failed: {e}")))?;
    bytes[0] &= 0x7f;
    Ok(SerialNumber::from_slice(&bytes))
}

/// Immutable certificate description, consumed by signing
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    params: CertificateParams,
}

impl CertificateTemplate {
    /// Template for `subject` with a fresh serial and a validity window starting now
    ///
    /// # Errors
    ///
    /// Returns an error if no serial can be drawn.
    pub fn new(subject: DistinguishedName) -> Result<Self> {
        let mut params = CertificateParams::default();
        params.distinguished_name = subject;
        params.serial_number = Some(random_serial()?);
        let window = ValidityWindow::starting_now();
        params.not_before = window.not_before;
        params.not_after = window.not_after;
        Ok(Self { params })
    }

    /// Replace the validity window
    #[must_use]
    pub fn validity(mut self, window: ValidityWindow) -> Self {
        self.params.not_before = window.not_before;
        self.params.not_after = window.not_after;
        self
    }

    /// Critical basic constraints `{CA: true, pathlen: unconstrained}`
    #[must_use]
    pub fn certificate_authority(mut self) -> Self {
        self.params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        self
    }

    /// Critical key usage `{digitalSignature, keyEncipherment}` and critical
    /// extended key usage for `usage`
    ///
    /// # Errors
    ///
    /// Returns an error if the extended key usage cannot be encoded.
    pub fn leaf(mut self, usage: LeafUsage) -> Result<Self> {
        self.params.is_ca = IsCa::NoCa;
        self.params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        self.params.extended_key_usages.clear();
        self.params.custom_extensions.push(usage.extension()?);
        Ok(self)
    }

    /// Subject distinguished name
    #[must_use]
    pub fn subject(&self) -> &DistinguishedName {
        &self.params.distinguished_name
    }

    /// Sign with the subject's own key (subject == issuer)
    ///
    /// # Errors
    ///
    /// Returns an error if `rcgen` fails to sign.
    pub fn self_sign(self, key: &KeyPair) -> Result<rcgen::Certificate> {
        Ok(self.params.self_signed(key)?)
    }

    /// Sign `subject_key` under `issuer`
    ///
    /// # Errors
    ///
    /// Returns an error if `rcgen` fails to sign.
    pub fn sign(
        self,
        subject_key: &KeyPair,
        issuer: &Issuer<'_, KeyPair>,
    ) -> Result<rcgen::Certificate> {
        Ok(self.params.signed_by(subject_key, issuer)?)
    }

    pub(crate) fn into_params(self) -> CertificateParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spans_366_days() {
        let issued = OffsetDateTime::now_utc();
        let window = ValidityWindow::issued_at(issued);
        assert_eq!(window.not_after - window.not_before, Duration::days(366));
        assert!(window.contains(issued));
        assert_eq!(window.not_before.nanosecond(), 0);
    }

    #[test]
    fn serials_are_positive_and_distinct() {
        let a = random_serial().expect("serial");
        let b = random_serial().expect("serial");
        assert_ne!(a, b);
        let bytes = a.to_bytes();
        assert_eq!(bytes.len(), SERIAL_LEN);
        assert!(bytes[0] < 0x80);
    }

    #[test]
    fn client_only_usage_encodes_single_purpose() {
        let ext = LeafUsage::ClientOnly.extension().expect("extension");
        assert!(ext.criticality());
        // SEQUENCE { OID 1.3.6.1.5.5.7.3.2 }
        assert_eq!(
            ext.content(),
            &[0x30, 0x0a, 0x06, 0x08, 0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x02]
        );
    }
}
