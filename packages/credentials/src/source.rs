//! Secret store contract
//!
//! The pool secret lives in an external store (a Kubernetes secret in
//! production). Implementations return the secret's data map with values
//! base64-encoded, the way the Kubernetes API hands them out.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{CredentialError, Result};

/// Field name to base64 value
pub type SecretData = HashMap<String, String>;

/// Location of a secret in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    /// Namespace the secret lives in
    pub namespace: String,
    /// Secret name
    pub name: String,
}

impl SecretRef {
    /// Reference `name` in `namespace`
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reads secrets from an external store
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the data map of `secret`
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::SecretUnavailable`] if the secret cannot be
    /// read.
    async fn read_secret(&self, secret: &SecretRef) -> Result<SecretData>;
}

/// In-memory secret store
#[derive(Default, Clone)]
pub struct StaticSecretSource {
    secrets: HashMap<SecretRef, SecretData>,
}

impl StaticSecretSource {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `raw` under `field` of `secret`, base64-encoding it
    #[must_use]
    pub fn with_field(mut self, secret: SecretRef, field: &str, raw: &[u8]) -> Self {
        self.secrets
            .entry(secret)
            .or_default()
            .insert(field.to_string(), STANDARD.encode(raw));
        self
    }

    /// Store an already encoded data map
    #[must_use]
    pub fn with_data(mut self, secret: SecretRef, data: SecretData) -> Self {
        self.secrets.insert(secret, data);
        self
    }
}

impl fmt::Debug for StaticSecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecretSource")
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn read_secret(&self, secret: &SecretRef) -> Result<SecretData> {
        self.secrets
            .get(secret)
            .cloned()
            .ok_or_else(|| CredentialError::SecretUnavailable(format!("No secret {secret}")))
    }
}
