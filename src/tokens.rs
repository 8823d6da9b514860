//! Bearer tokens with expiry tracking.
//!
//! A [`BearerToken`] holds the complete `Authorization` header value, with
//! the `Bearer ` prefix baked in, together with the monotonic time it was
//! obtained and how long it may be used. Time is measured in milliseconds
//! on a [`Clock`](crate::clock::Clock); the token never reads the clock
//! itself.

use std::time::Duration;

use veil::Redact;

use crate::{
    bounded::{push_exact, BoundedString},
    error::Result,
};

/// Prefix of every `Authorization` header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Capacity of the `Authorization` header value, prefix included.
pub const ACCESS_TOKEN_CAPACITY: usize = 400;

/// Safety margin subtracted from the lifetime announced by the provider.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(2);

/// Lifetime assumed for tokens supplied without one.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);

#[derive(Clone, PartialEq, Eq, Redact)]
pub struct BearerToken {
    #[redact]
    header: BoundedString<ACCESS_TOKEN_CAPACITY>,
    refreshed_at: u64,
    time_to_live: u64,
}

impl BearerToken {
    /// Creates a token obtained at `now_ms` that the provider declared
    /// valid for `expires_in`.
    ///
    /// The time to live is `expires_in` less [`EXPIRY_MARGIN`], saturating
    /// at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfRange`](crate::error::ErrorKind::OutOfRange)
    /// if the token does not fit [`ACCESS_TOKEN_CAPACITY`]. A truncated
    /// token would only be rejected by the server.
    pub fn new(access_token: &str, expires_in: Duration, now_ms: u64) -> Result<Self> {
        let mut header = BoundedString::new();
        push_exact(&mut header, BEARER_PREFIX)?;
        push_exact(&mut header, access_token)?;

        let time_to_live = expires_in.saturating_sub(EXPIRY_MARGIN);
        let time_to_live = u64::try_from(time_to_live.as_millis()).unwrap_or(u64::MAX);

        Ok(Self {
            header,
            refreshed_at: now_ms,
            time_to_live,
        })
    }

    /// The `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.header
    }

    /// The access token without the `Bearer ` prefix.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.header[BEARER_PREFIX.len()..]
    }

    /// Milliseconds the token may be used after it was obtained.
    #[must_use]
    pub fn time_to_live(&self) -> u64 {
        self.time_to_live
    }

    /// Clock reading when the token was obtained.
    #[must_use]
    pub fn refreshed_at(&self) -> u64 {
        self.refreshed_at
    }

    /// Whether the token must be refreshed at `now_ms`.
    ///
    /// A clock reading before `refreshed_at` counts as no time elapsed.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.refreshed_at) >= self.time_to_live
    }

    /// Milliseconds left at `now_ms`.
    #[must_use]
    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.time_to_live
            .saturating_sub(now_ms.saturating_sub(self.refreshed_at))
    }

    /// Forces the next expiry check to fail.
    pub fn expire(&mut self) {
        self.time_to_live = 0;
    }
}
