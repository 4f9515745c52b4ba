//! Issuance entry points used by the spawner
//!
//! Each token call reads the secret once, with a timeout, and hands the
//! decoded bytes to the pure signing core. Bundle builds run on the blocking
//! pool because RSA key generation takes a while.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use casa_token::TokenSigner;
use casa_x509::{CredentialBundle, build_bundle_with};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::IssuerConfig;
use crate::error::{CredentialError, Result};
use crate::source::{SecretRef, SecretSource};

/// Issues TLS bundles and bearer tokens
pub struct CredentialIssuer<S> {
    source: Arc<S>,
    signer: TokenSigner,
    config: IssuerConfig,
}

impl<S: SecretSource> CredentialIssuer<S> {
    /// Issuer over `source` with default configuration
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, IssuerConfig::default())
    }

    /// Issuer over `source` with `config`
    #[must_use]
    pub fn with_config(source: Arc<S>, config: IssuerConfig) -> Self {
        let signer = TokenSigner::new().with_macaroon_root_key(config.macaroon_root_key);
        Self {
            source,
            signer,
            config,
        }
    }

    /// Replace the token signer, e.g. to disable or swap macaroon support
    #[must_use]
    pub fn with_signer(mut self, signer: TokenSigner) -> Self {
        self.signer = signer.with_macaroon_root_key(self.config.macaroon_root_key);
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// HTCondor IDTOKEN signed with the key named `kid`
    ///
    /// # Errors
    ///
    /// Fails if the secret cannot be fetched or decoded, or `kid` is malformed.
    pub async fn condor_token(
        &self,
        secret: &SecretRef,
        issuer: &str,
        subject: &str,
        kid: &str,
    ) -> Result<String> {
        let stored = self.fetch_secret(secret).await?;
        Ok(self.signer.htcondor_token(&stored, issuer, subject, kid)?)
    }

    /// ServiceX token
    ///
    /// # Errors
    ///
    /// Fails if the secret cannot be fetched or decoded.
    pub async fn servicex_token(
        &self,
        secret: &SecretRef,
        issuer: &str,
        subject: &str,
    ) -> Result<String> {
        let stored = self.fetch_secret(secret).await?;
        Ok(self.signer.servicex_token(&stored, issuer, subject)?)
    }

    /// XCache macaroon for `user` at `location`
    ///
    /// Empty when macaroon support is unavailable.
    ///
    /// # Errors
    ///
    /// Fails if the secret cannot be fetched or decoded.
    pub async fn xcache_token(
        &self,
        secret: &SecretRef,
        location: &str,
        user: &str,
    ) -> Result<String> {
        let stored = self.fetch_secret(secret).await?;
        Ok(self.signer.xcache_token(&stored, location, user)?)
    }

    /// XCache macaroon for `user` at the configured location
    ///
    /// # Errors
    ///
    /// Fails if the secret cannot be fetched or decoded.
    pub async fn xcache_token_for(&self, secret: &SecretRef, user: &str) -> Result<String> {
        self.xcache_token(secret, &self.config.xcache_location, user)
            .await
    }

    /// Fresh TLS bundle for one cluster
    ///
    /// # Errors
    ///
    /// Fails if any issuance step fails or the blocking task is lost.
    pub async fn tls_bundle(&self) -> Result<CredentialBundle> {
        let profile = self.config.bundle.clone();
        let bundle = tokio::task::spawn_blocking(move || build_bundle_with(&profile))
            .await
            .map_err(|e| CredentialError::TaskFailed(e.to_string()))??;
        info!("TLS bundle ready");
        Ok(bundle)
    }

    async fn fetch_secret(&self, secret: &SecretRef) -> Result<Zeroizing<Vec<u8>>> {
        let timeout = self.config.fetch_timeout;
        let data = tokio::time::timeout(timeout, self.source.read_secret(secret))
            .await
            .map_err(|_| CredentialError::SecretFetchTimeout(timeout))??;

        let encoded = data.get(&self.config.secret_field).ok_or_else(|| {
            CredentialError::SecretUnavailable(format!(
                "Secret {secret} has no field {:?}",
                self.config.secret_field
            ))
        })?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::InvalidSecretEncoding(e.to_string()))?;
        debug!(%secret, "Fetched pool secret");
        Ok(Zeroizing::new(decoded))
    }
}

impl<S> std::fmt::Debug for CredentialIssuer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("signer", &self.signer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
