//! # Casa Token
//!
//! Bearer tokens derived from the HTCondor pool secret.
//!
//! ## Features
//!
//! - **HTCondor IDTOKENs**: HS256 with a `kid` header, `POOL` secrets doubled
//! - **ServiceX tokens**: HS256 under a separately salted key, no `kid`
//! - **XCache macaroons**: V1 macaroons with name, activity, path and expiry
//!   caveats (cargo feature `macaroon`, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use casa_token::{TokenSigner, scramble};
//!
//! # fn main() -> casa_token::Result<()> {
//! let stored = scramble(b"pool password");
//! let signer = TokenSigner::new();
//! let token = signer.htcondor_token(&stored, "cmsaf.example.org", "alice@example.org", "POOL")?;
//! assert_eq!(token.split('.').count(), 3);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod compact;
pub mod error;
pub mod kdf;
#[cfg(feature = "macaroon")]
pub mod macaroon;
pub mod scramble;
pub mod signer;

pub use compact::{TokenClaims, TokenHeader, VerifiedToken, sign_compact, verify_compact_token};
pub use error::{Result, TokenError};
pub use kdf::{
    DerivedSigningKey, SigningKeyId, TokenPurpose, derive_key, derive_signing_key,
};
#[cfg(feature = "macaroon")]
pub use macaroon::Macaroon;
pub use scramble::{descramble, scramble};
pub use signer::{MacaroonMinter, MacaroonRootKey, TokenSigner, xcache_caveats};
#[cfg(feature = "macaroon")]
pub use signer::V1MacaroonMinter;
