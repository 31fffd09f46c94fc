//! OAuth credential handling for klingel
//!
//! The cloud side of klingel (Pub/Sub pulls and the SDM device listing) is
//! authenticated with a user OAuth token. This crate keeps that token valid:
//!
//! - [`TokenFile`] reads and atomically rewrites the JSON token file
//! - [`CredentialGuard`] refreshes the access token when it is (about to be)
//!   expired and retries an unauthorized call exactly once after a refresh
//! - [`SdmClient`] lists the doorbells visible to the project as an access check
//!
//! ```no_run
//! use klingel_auth::{CredentialGuard, OAuthClient, SdmClient, TokenFile};
//!
//! let guard = CredentialGuard::load(
//!     OAuthClient::google("client-id", "client-secret"),
//!     TokenFile::new("tokens.json"),
//! )?;
//! let sdm = SdmClient::new("device-access-project")?;
//! let devices = sdm.check_access(&guard)?;
//! # Ok::<(), klingel_auth::AuthError>(())
//! ```

mod error;
mod guard;
mod sdm;
mod token;

pub use error::{AuthError, Result, Unauthorized};
pub use guard::{CredentialGuard, OAuthClient, GOOGLE_TOKEN_URL};
pub use sdm::{SdmClient, SdmDevice, SDM_API_URL};
pub use token::{TokenFile, TokenSet, DEFAULT_EXPIRES_IN};
