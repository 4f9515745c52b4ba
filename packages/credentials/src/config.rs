//! Issuer configuration

use std::time::Duration;

use casa_token::MacaroonRootKey;
use casa_x509::BundleProfile;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};

/// Default field holding the base64 pool secret
pub const DEFAULT_SECRET_FIELD: &str = "token";

/// Default XCache site
pub const DEFAULT_XCACHE_LOCATION: &str = "T2_US_Nebraska";

/// Default bound on a secret-store read
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`crate::CredentialIssuer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Names and password for TLS bundles
    pub bundle: BundleProfile,
    /// Secret field holding the base64 pool secret
    pub secret_field: String,
    /// Upper bound on one secret-store read, in seconds
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,
    /// Site identifier used when no location is given
    pub xcache_location: String,
    /// Which bytes key XCache macaroons
    pub macaroon_root_key: MacaroonRootKey,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            bundle: BundleProfile::default(),
            secret_field: DEFAULT_SECRET_FIELD.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            xcache_location: DEFAULT_XCACHE_LOCATION.to_string(),
            macaroon_root_key: MacaroonRootKey::default(),
        }
    }
}

impl IssuerConfig {
    /// Load overrides from JSON; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] for malformed JSON or values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CredentialError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.secret_field.is_empty() {
            return Err(CredentialError::Config("secret_field must not be empty".to_string()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(CredentialError::Config("fetch_timeout must be positive".to_string()));
        }
        if self.xcache_location.is_empty() {
            return Err(CredentialError::Config("xcache_location must not be empty".to_string()));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
