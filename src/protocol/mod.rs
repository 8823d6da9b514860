//! Wire types of the Spotify Web API.
//!
//! These structs mirror the JSON the API sends and nothing more. Fields
//! that the API may omit or send as `null` are `Option`s; conversion into
//! the fixed-capacity types handed to callers happens elsewhere.
//!
//! # Submodules
//!
//! * [`auth`] - Token endpoint responses
//! * [`player`] - Playback state, currently playing item and devices
//!
//! # Usage Example
//!
//! ```
//! use tinyspot::protocol;
//!
//! let error: protocol::ErrorResponse = protocol::json(body, "token")?;
//! println!("{error}");
//! ```

pub mod auth;
pub mod player;

use std::fmt::{self, Debug};

use serde::Deserialize;

use crate::error::Result;

/// Parses and logs a JSON document held in memory.
///
/// Streaming bodies go through
/// [`Response::json`](crate::http::Response::json) instead; this is for
/// bodies that were already collected, like error documents.
///
/// # Errors
///
/// Returns error if:
/// * `body` is not valid JSON
/// * The JSON structure doesn't match type `T`
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e:?})");
            }
            Err(e.into())
        }
    }
}

/// Error document sent along with failing statuses.
///
/// The Web API nests the error in an object, the accounts service uses
/// the OAuth2 shape.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorResponse {
    Api {
        error: ApiError,
    },
    OAuth {
        error: String,
        error_description: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub reason: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api { error } => {
                write!(f, "{}", error.message.as_deref().unwrap_or("no message"))?;
                if let Some(reason) = &error.reason {
                    write!(f, " ({reason})")?;
                }
                Ok(())
            }
            Self::OAuth {
                error,
                error_description,
            } => match error_description {
                Some(description) => write!(f, "{error}: {description}"),
                None => write!(f, "{error}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_nested() {
        let error: ErrorResponse = json(
            r#"{"error":{"status":404,"message":"Player command failed: No active device found","reason":"NO_ACTIVE_DEVICE"}}"#,
            "test",
        )
        .unwrap();
        assert_eq!(
            error.to_string(),
            "Player command failed: No active device found (NO_ACTIVE_DEVICE)"
        );
    }

    #[test]
    fn oauth_errors_are_flat() {
        let error: ErrorResponse = json(
            r#"{"error":"invalid_grant","error_description":"Invalid refresh token"}"#,
            "test",
        )
        .unwrap();
        assert_eq!(error.to_string(), "invalid_grant: Invalid refresh token");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(json::<ErrorResponse>("not json", "test").is_err());
    }
}
