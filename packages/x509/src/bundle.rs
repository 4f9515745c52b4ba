//! Credential bundle construction
//!
//! One bundle holds a throwaway CA plus a server and a user certificate
//! issued under it. Nothing is cached between builds.

use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::authority::generate_ca;
use crate::certificate::Certificate;
use crate::error::Result;
use crate::keypair::RsaKeyPair;
use crate::leaf::{build_csr, issue_server_certificate, sign_csr};
use crate::subject::SubjectTemplate;

/// Common name of the bundle CA
pub const CA_COMMON_NAME: &str = "Coffea farm development CA";

/// Common name of the Dask scheduler and worker certificate
pub const SERVER_COMMON_NAME: &str = "Coffea dask cluster";

/// Common name of the user (client) certificate
pub const USER_COMMON_NAME: &str = "Coffea user";

/// Password the exported CA key is encrypted with
///
/// This is a fixed value every consumer of `ca.key` knows, so the encryption
/// gives no confidentiality.
pub const LEGACY_CA_KEY_PASSWORD: &[u8] = b"password";

/// File name of the encrypted CA key
pub const CA_KEY_FILE: &str = "ca.key";
/// File name of the CA certificate
pub const CA_CERT_FILE: &str = "ca.crt";
/// File name of the combined server key and certificate
pub const SERVER_PEM_FILE: &str = "hostcert.pem";
/// File name of the combined user key and certificate
pub const USER_PEM_FILE: &str = "usercert.pem";

/// Names and password used for one bundle
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleProfile {
    /// Shared subject suffix
    pub subject: SubjectTemplate,
    /// CA common name
    pub ca_common_name: String,
    /// Server common name
    pub server_common_name: String,
    /// User common name
    pub user_common_name: String,
    /// Password for the exported CA key
    pub ca_key_password: String,
}

impl Default for BundleProfile {
    fn default() -> Self {
        Self {
            subject: SubjectTemplate::default(),
            ca_common_name: CA_COMMON_NAME.to_string(),
            server_common_name: SERVER_COMMON_NAME.to_string(),
            user_common_name: USER_COMMON_NAME.to_string(),
            ca_key_password: String::from_utf8_lossy(LEGACY_CA_KEY_PASSWORD).into_owned(),
        }
    }
}

impl BundleProfile {
    /// Profile with the image subject suffix
    #[must_use]
    pub fn image_profile() -> Self {
        Self {
            subject: SubjectTemplate::image_profile(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for BundleProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleProfile")
            .field("subject", &self.subject)
            .field("ca_common_name", &self.ca_common_name)
            .field("server_common_name", &self.server_common_name)
            .field("user_common_name", &self.user_common_name)
            .field("ca_key_password", &"<redacted>")
            .finish()
    }
}

/// PEM blobs handed to the spawner
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    ca_key_pem: String,
    ca_cert_pem: String,
    server_pem: String,
    user_pem: String,
}

impl CredentialBundle {
    /// Encrypted CA private key (`Proc-Type: 4,ENCRYPTED`)
    #[must_use]
    pub fn ca_key_pem(&self) -> &str {
        &self.ca_key_pem
    }

    /// CA certificate
    #[must_use]
    pub fn ca_cert_pem(&self) -> &str {
        &self.ca_cert_pem
    }

    /// Server private key followed by the server certificate
    #[must_use]
    pub fn server_pem(&self) -> &str {
        &self.server_pem
    }

    /// User private key followed by the user certificate
    #[must_use]
    pub fn user_pem(&self) -> &str {
        &self.user_pem
    }

    /// `(file name, contents)` pairs in mount order
    #[must_use]
    pub fn files(&self) -> [(&'static str, &str); 4] {
        [
            (CA_KEY_FILE, self.ca_key_pem.as_str()),
            (CA_CERT_FILE, self.ca_cert_pem.as_str()),
            (SERVER_PEM_FILE, self.server_pem.as_str()),
            (USER_PEM_FILE, self.user_pem.as_str()),
        ]
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle").finish_non_exhaustive()
    }
}

/// Build a bundle with the default hub profile
///
/// # Errors
///
/// Any failing step aborts the whole build; no partial bundle is returned.
pub fn build_bundle() -> Result<CredentialBundle> {
    build_bundle_with(&BundleProfile::default())
}

/// Build a bundle with the given names and password
///
/// # Errors
///
/// Any failing step aborts the whole build; no partial bundle is returned.
pub fn build_bundle_with(profile: &BundleProfile) -> Result<CredentialBundle> {
    let ca = generate_ca(&profile.ca_common_name, &profile.subject)?;
    let (server_cert, server_key) =
        issue_server_certificate(&ca, &profile.server_common_name, &profile.subject)?;
    let (user_csr, user_key) = build_csr(&profile.user_common_name, &profile.subject)?;
    let user_cert = sign_csr(&ca, &user_csr)?;

    let (ca_cert, ca_key) = ca.into_parts();
    let bundle = CredentialBundle {
        ca_key_pem: ca_key.to_encrypted_pkcs1_pem(profile.ca_key_password.as_bytes())?,
        ca_cert_pem: ca_cert.pem().to_string(),
        server_pem: key_then_cert(&server_key, &server_cert)?,
        user_pem: key_then_cert(&user_key, &user_cert)?,
    };
    info!(
        ca = %profile.ca_common_name,
        server = %profile.server_common_name,
        user = %profile.user_common_name,
        "Built credential bundle"
    );
    Ok(bundle)
}

fn key_then_cert(key: &RsaKeyPair, cert: &Certificate) -> Result<String> {
    let key_pem = key.to_pkcs1_pem()?;
    let mut out = String::with_capacity(key_pem.len() + cert.pem().len());
    out.push_str(&key_pem);
    out.push_str(cert.pem());
    Ok(out)
}
