//! OAuth client credentials and the secrets file they are loaded from.
//!
//! The secrets file is TOML:
//!
//! ```toml
//! client_id = "0123456789abcdef0123456789abcdef"
//! client_secret = "0123456789abcdef0123456789abcdef"
//! refresh_token = "AQC..."
//! ```
//!
//! `refresh_token` may be left out before the first authorization code
//! exchange.

use std::{fs, str::FromStr};

use serde::Deserialize;
use veil::Redact;

use crate::{
    bounded::{copy_truncated, BoundedString},
    error::{Error, Result},
};

/// Capacity of the client id and client secret.
pub const CLIENT_ID_CAPACITY: usize = 32;

/// Capacity of the refresh token.
pub const REFRESH_TOKEN_CAPACITY: usize = 255;

/// Largest secrets file that is read.
pub const MAX_FILE_SIZE: u64 = 1024;

#[derive(Clone, Default, PartialEq, Eq, Redact)]
pub struct Credentials {
    client_id: BoundedString<CLIENT_ID_CAPACITY>,
    #[redact]
    client_secret: BoundedString<CLIENT_ID_CAPACITY>,
    #[redact]
    refresh_token: BoundedString<REFRESH_TOKEN_CAPACITY>,
}

#[derive(Deserialize)]
struct SecretsFile {
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
}

impl Credentials {
    /// Creates credentials, truncating values that exceed their capacity.
    #[must_use]
    pub fn new(client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        let mut credentials = Self::default();
        credentials.set_client_id(client_id);
        credentials.set_client_secret(client_secret);
        credentials.set_refresh_token(refresh_token);
        credentials
    }

    /// Loads credentials from a TOML secrets file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * The file cannot be read
    /// * The file is larger than [`MAX_FILE_SIZE`]
    /// * The TOML is invalid or a value does not fit its capacity
    pub fn from_file(secrets_file: &str) -> Result<Self> {
        // Prevent out-of-memory condition: secrets files should be small.
        let file_size = fs::metadata(secrets_file)?.len();
        if file_size > MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{secrets_file} is too large ({file_size} bytes)"
            )));
        }

        let contents = fs::read_to_string(secrets_file)?;
        contents.parse().map_err(|e: Error| {
            Error::new(e.kind, format!("{secrets_file} format is invalid: {e}"))
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Whether a refresh can be attempted.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.refresh_token.is_empty()
    }

    /// Returns `true` if the value was truncated.
    pub fn set_client_id(&mut self, client_id: &str) -> bool {
        warn_truncated("client id", copy_truncated(&mut self.client_id, client_id))
    }

    /// Returns `true` if the value was truncated.
    pub fn set_client_secret(&mut self, client_secret: &str) -> bool {
        warn_truncated(
            "client secret",
            copy_truncated(&mut self.client_secret, client_secret),
        )
    }

    /// Returns `true` if the value was truncated.
    pub fn set_refresh_token(&mut self, refresh_token: &str) -> bool {
        warn_truncated(
            "refresh token",
            copy_truncated(&mut self.refresh_token, refresh_token),
        )
    }
}

fn warn_truncated(what: &str, truncated: bool) -> bool {
    if truncated {
        warn!("{what} truncated to fit its buffer");
    }
    truncated
}

impl FromStr for Credentials {
    type Err = Error;

    /// Parses the contents of a secrets file.
    ///
    /// Unlike the setters, this rejects values that would be truncated.
    fn from_str(s: &str) -> Result<Self> {
        let secrets: SecretsFile = toml::from_str(s)?;

        let check = |name: &str, value: &str, capacity: usize| {
            if value.len() > capacity {
                return Err(Error::out_of_range(format!(
                    "{name} should be at most {capacity} bytes long but is {}",
                    value.len()
                )));
            }
            if value.is_empty() {
                return Err(Error::invalid_argument(format!("{name} is empty")));
            }
            Ok(())
        };

        check("client_id", &secrets.client_id, CLIENT_ID_CAPACITY)?;
        check("client_secret", &secrets.client_secret, CLIENT_ID_CAPACITY)?;
        if let Some(refresh_token) = &secrets.refresh_token {
            check("refresh_token", refresh_token, REFRESH_TOKEN_CAPACITY)?;
        }

        Ok(Self::new(
            &secrets.client_id,
            &secrets.client_secret,
            secrets.refresh_token.as_deref().unwrap_or_default(),
        ))
    }
}
