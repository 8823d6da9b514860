//! Token endpoint response types.
//!
//! Both grant types (`authorization_code` and `refresh_token`) answer with
//! the same document:
//!
//! ```json
//! {
//!     "access_token": "BQD...",
//!     "token_type": "Bearer",
//!     "expires_in": 3600,
//!     "refresh_token": "AQC...",
//!     "scope": "user-read-playback-state"
//! }
//! ```
//!
//! `refresh_token` is only present when the provider rotates it.

use std::time::Duration;

use serde::Deserialize;
use serde_with::{formats::Flexible, serde_as, DurationSeconds};
use veil::Redact;

#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Redact)]
pub struct AccessToken {
    #[redact]
    pub access_token: String,

    pub token_type: Option<String>,

    /// How long the token remains valid
    #[serde_as(as = "DurationSeconds<u64, Flexible>")]
    pub expires_in: Duration,

    #[redact]
    pub refresh_token: Option<String>,

    pub scope: Option<String>,
}
