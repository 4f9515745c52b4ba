//! # Casa X.509
//!
//! Throwaway certificate authority and leaf certificates for Dask TLS.
//!
//! ## Features
//!
//! - **CA**: self-signed RSA-2048 CA with unconstrained basic constraints
//! - **Server certificates**: TLS client and server authentication
//! - **User certificates**: CSR enrollment with signature and extension checks
//! - **Bundles**: the four PEM blobs the spawner mounts into the cluster
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use casa_x509::{build_bundle, Certificate};
//!
//! # fn main() -> casa_x509::Result<()> {
//! let bundle = build_bundle()?;
//! let ca = Certificate::from_pem(bundle.ca_cert_pem())?;
//! for (file, contents) in bundle.files() {
//!     println!("{file}: {} bytes", contents.len());
//! }
//! # let _ = ca;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod authority;
pub mod bundle;
pub mod certificate;
pub mod error;
pub mod keypair;
pub mod leaf;
pub mod pem;
pub mod subject;
pub mod template;

pub use authority::{CertificateAuthority, generate_ca};
pub use bundle::{BundleProfile, CredentialBundle, build_bundle, build_bundle_with};
pub use certificate::{Certificate, CertificateSummary, SigningRequest};
pub use error::{Result, X509Error};
pub use keypair::{KeyPairFactory, RsaKeyPair};
pub use leaf::{build_csr, issue_server_certificate, issue_user_certificate, sign_csr};
pub use crate::pem::decrypt_private_key_pem;
pub use subject::SubjectTemplate;
pub use template::{CertificateTemplate, LeafUsage, ValidityWindow};
