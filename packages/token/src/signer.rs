//! Token issuance from the stored pool secret
//!
//! Every entry point takes the secret exactly as it sits in the secret store
//! (HTCondor-scrambled) and runs descramble, derive and sign in one call.
//! Nothing is cached between calls.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compact::{TokenClaims, TokenHeader, sign_compact};
use crate::error::Result;
use crate::kdf::{SigningKeyId, TokenPurpose, derive_key, derive_signing_key};
use crate::scramble::descramble;

/// XCache user caveat prefix
pub const CAVEAT_NAME_PREFIX: &str = "name:";
/// XCache activity caveat
pub const CAVEAT_ACTIVITY: &str = "activity:DOWNLOAD";
/// XCache path caveat
pub const CAVEAT_PATH: &str = "path:/store";
/// XCache expiry caveat prefix
pub const CAVEAT_BEFORE_PREFIX: &str = "before:";
/// Lifetime of an XCache macaroon
pub const MACAROON_LIFETIME_WEEKS: i64 = 52;

const BEFORE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Which bytes key an XCache macaroon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacaroonRootKey {
    /// The descrambled pool secret
    #[default]
    Descrambled,
    /// The secret as stored, before descrambling
    Stored,
}

/// Something that can mint a serialized macaroon
///
/// The signer holds one of these only when the capability is available;
/// without it XCache tokens come back empty.
pub trait MacaroonMinter: Send + Sync {
    /// Mint a macaroon with `caveats` in order and return its serialization
    ///
    /// # Errors
    ///
    /// Returns an error if the macaroon cannot be built or encoded.
    fn mint(
        &self,
        root_key: &[u8],
        location: &str,
        identifier: &str,
        caveats: &[String],
    ) -> Result<String>;
}

/// Built-in V1 minter
#[cfg(feature = "macaroon")]
#[derive(Debug, Clone, Copy, Default)]
pub struct V1MacaroonMinter;

#[cfg(feature = "macaroon")]
impl MacaroonMinter for V1MacaroonMinter {
    fn mint(
        &self,
        root_key: &[u8],
        location: &str,
        identifier: &str,
        caveats: &[String],
    ) -> Result<String> {
        let mut macaroon = crate::macaroon::Macaroon::new(root_key, location, identifier)?;
        for caveat in caveats {
            macaroon.add_first_party_caveat(caveat)?;
        }
        macaroon.serialize()
    }
}

/// Caveats for an XCache token, in the order the verifier expects
#[must_use]
pub fn xcache_caveats(user: &str, issued: DateTime<Utc>) -> Vec<String> {
    let before = issued + Duration::weeks(MACAROON_LIFETIME_WEEKS);
    vec![
        format!("{CAVEAT_NAME_PREFIX}{user}"),
        CAVEAT_ACTIVITY.to_string(),
        CAVEAT_PATH.to_string(),
        format!("{CAVEAT_BEFORE_PREFIX}{}", before.format(BEFORE_FORMAT)),
    ]
}

/// Issues HTCondor, ServiceX and XCache tokens
#[derive(Clone)]
pub struct TokenSigner {
    macaroons: Option<Arc<dyn MacaroonMinter>>,
    macaroon_root_key: MacaroonRootKey,
}

impl Default for TokenSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSigner {
    /// Signer with the built-in macaroon minter when the `macaroon` feature
    /// is enabled
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "macaroon")]
        let macaroons: Option<Arc<dyn MacaroonMinter>> = Some(Arc::new(V1MacaroonMinter));
        #[cfg(not(feature = "macaroon"))]
        let macaroons: Option<Arc<dyn MacaroonMinter>> = None;

        Self {
            macaroons,
            macaroon_root_key: MacaroonRootKey::default(),
        }
    }

    /// Signer that never mints macaroons
    #[must_use]
    pub fn without_macaroons() -> Self {
        Self {
            macaroons: None,
            ..Self::new()
        }
    }

    /// Replace the macaroon minter
    #[must_use]
    pub fn with_macaroon_minter(mut self, minter: Arc<dyn MacaroonMinter>) -> Self {
        self.macaroons = Some(minter);
        self
    }

    /// Choose which bytes key XCache macaroons
    #[must_use]
    pub fn with_macaroon_root_key(mut self, root_key: MacaroonRootKey) -> Self {
        self.macaroon_root_key = root_key;
        self
    }

    /// Whether XCache tokens will be minted
    #[must_use]
    pub fn supports_macaroons(&self) -> bool {
        self.macaroons.is_some()
    }

    /// HTCondor IDTOKEN for `subject`, signed with the key named `kid`
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::InvalidKeyId`] for a malformed `kid`.
    pub fn htcondor_token(
        &self,
        stored_secret: &[u8],
        issuer: &str,
        subject: &str,
        kid: &str,
    ) -> Result<String> {
        self.htcondor_token_at(stored_secret, issuer, subject, kid, Utc::now())
    }

    /// [`TokenSigner::htcondor_token`] issued at `now`
    ///
    /// # Errors
    ///
    /// Returns [`crate::TokenError::InvalidKeyId`] for a malformed `kid`.
    pub fn htcondor_token_at(
        &self,
        stored_secret: &[u8],
        issuer: &str,
        subject: &str,
        kid: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let kid = SigningKeyId::parse(kid)?;
        let password = descramble(stored_secret);
        let key = derive_signing_key(&password, TokenPurpose::HtcondorPool, &kid)?;

        let header = TokenHeader::hs256(Some(kid.as_str()));
        let claims = TokenClaims::new(subject, issuer, now.timestamp());
        let token = sign_compact(&header, &claims, &key)?;
        info!(%kid, issuer, subject, jti = %claims.jti, "Issued HTCondor token");
        Ok(token)
    }

    /// ServiceX token for `subject`; the header carries no `kid`
    ///
    /// # Errors
    ///
    /// Returns an error if derivation or encoding fails.
    pub fn servicex_token(&self, stored_secret: &[u8], issuer: &str, subject: &str) -> Result<String> {
        self.servicex_token_at(stored_secret, issuer, subject, Utc::now())
    }

    /// [`TokenSigner::servicex_token`] issued at `now`
    ///
    /// # Errors
    ///
    /// Returns an error if derivation or encoding fails.
    pub fn servicex_token_at(
        &self,
        stored_secret: &[u8],
        issuer: &str,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let password = descramble(stored_secret);
        let key = derive_key(&password, TokenPurpose::ServiceX)?;

        let header = TokenHeader::hs256(None);
        let claims = TokenClaims::new(subject, issuer, now.timestamp());
        let token = sign_compact(&header, &claims, &key)?;
        info!(issuer, subject, jti = %claims.jti, "Issued ServiceX token");
        Ok(token)
    }

    /// XCache macaroon for `user` at `location`
    ///
    /// Returns an empty string when no minter is available; callers treat
    /// that as "XCache tokens unavailable".
    ///
    /// # Errors
    ///
    /// Returns an error if the minter fails.
    pub fn xcache_token(&self, stored_secret: &[u8], location: &str, user: &str) -> Result<String> {
        self.xcache_token_at(stored_secret, location, user, Utc::now())
    }

    /// [`TokenSigner::xcache_token`] issued at `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the minter fails.
    pub fn xcache_token_at(
        &self,
        stored_secret: &[u8],
        location: &str,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let Some(minter) = &self.macaroons else {
            warn!(location, "Macaroon support unavailable, returning empty XCache token");
            return Ok(String::new());
        };

        let identifier = Uuid::new_v4().to_string();
        let caveats = xcache_caveats(user, now);
        let token = match self.macaroon_root_key {
            MacaroonRootKey::Descrambled => {
                let root_key = descramble(stored_secret);
                minter.mint(&root_key, location, &identifier, &caveats)?
            }
            MacaroonRootKey::Stored => minter.mint(stored_secret, location, &identifier, &caveats)?,
        };
        debug!(root_key = ?self.macaroon_root_key, "Minted macaroon");
        info!(location, user, %identifier, "Issued XCache token");
        Ok(token)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("macaroons", &self.supports_macaroons())
            .field("macaroon_root_key", &self.macaroon_root_key)
            .finish()
    }
}
