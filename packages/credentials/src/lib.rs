//! # Casa Credentials
//!
//! Issues the credentials a coffea-casa user session needs: a fresh TLS
//! bundle for the Dask cluster and bearer tokens derived from the HTCondor
//! pool secret.
//!
//! ## Features
//!
//! - **TLS bundles**: CA, server and user certificates built off the async
//!   runtime
//! - **Tokens**: HTCondor IDTOKENs, ServiceX tokens and XCache macaroons
//! - **Secret sources**: pluggable async secret store with a bounded read
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use casa_credentials::{CredentialIssuer, SecretRef, StaticSecretSource};
//!
//! # async fn run() -> casa_credentials::Result<()> {
//! let secret = SecretRef::new("jhub", "condor-pool-secret");
//! let source = StaticSecretSource::new().with_field(secret.clone(), "token", b"\x00\x01\x02\x03");
//! let issuer = CredentialIssuer::new(Arc::new(source));
//!
//! let idtoken = issuer
//!     .condor_token(&secret, "cmsaf.example.org", "alice@example.org", "POOL")
//!     .await?;
//! let bundle = issuer.tls_bundle().await?;
//! # let _ = (idtoken, bundle);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod issuer;
pub mod source;

pub use config::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_SECRET_FIELD, DEFAULT_XCACHE_LOCATION, IssuerConfig,
};
pub use error::{CredentialError, Result};
pub use issuer::CredentialIssuer;
pub use source::{SecretData, SecretRef, SecretSource, StaticSecretSource};

pub use casa_token::{MacaroonRootKey, TokenSigner};
pub use casa_x509::{BundleProfile, CredentialBundle};
