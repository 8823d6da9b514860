use std::time::Duration;

use crate::{
    bounded::{truncated, BoundedString},
    error::{Error, Result},
};

/// Host of the Web API.
pub const API_HOST: &str = "api.spotify.com";

/// Host of the accounts service that issues tokens.
pub const ACCOUNTS_HOST: &str = "accounts.spotify.com";

/// Client settings.
///
/// [`Config::default`] talks to the production hosts over port 443.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,

    pub api_host: String,
    pub accounts_host: String,
    pub port: u16,

    /// Read timeout applied before every connection.
    pub timeout: Duration,

    /// Refresh stale bearer tokens before authorized requests.
    pub auto_refresh: bool,

    /// Discard stray bytes before JSON bodies.
    pub toss_until_json: bool,

    /// ISO 3166-1 alpha-2 country code added to playback queries.
    pub market: Option<String>,

    pub user_agent: String,
}

impl Config {
    /// Creates a configuration identifying as `app_name/app_version`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name or version is empty or contains
    /// characters that would break the `User-Agent` header.
    pub fn with_app(app_name: &str, app_version: &str) -> Result<Self> {
        // `User-Agent` string checks; there is no header library to do them.
        let illegal_chars = |chr: char| chr == '/' || chr == ';' || chr.is_control();
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
        {
            return Err(Error::invalid_argument(format!(
                "application name and/or version invalid (\"{app_name}\"; \"{app_version}\")"
            )));
        }

        Ok(Self::unchecked(app_name, app_version))
    }

    fn unchecked(app_name: &str, app_version: &str) -> Self {
        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name})");
        trace!("user agent: {user_agent}");

        Self {
            app_name: app_name.to_owned(),
            app_version: app_version.to_owned(),

            api_host: API_HOST.to_owned(),
            accounts_host: ACCOUNTS_HOST.to_owned(),
            port: 443,

            timeout: Duration::from_secs(2),

            auto_refresh: true,
            toss_until_json: false,
            market: None,

            user_agent,
        }
    }

    /// Sets the market, ignoring an empty string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `market` is two ASCII letters.
    pub fn set_market(&mut self, market: Option<&str>) -> Result<()> {
        self.market = match market.filter(|m| !m.is_empty()) {
            Some(market) => Some(market_code(market)?.as_str().to_owned()),
            None => None,
        };
        Ok(())
    }
}

/// Validates a market and returns it in upper case.
///
/// # Errors
///
/// Returns `InvalidArgument` unless `market` is two ASCII letters.
pub fn market_code(market: &str) -> Result<BoundedString<2>> {
    if market.len() != 2 || !market.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(Error::invalid_argument(format!(
            "market should be a two letter country code but is \"{market}\""
        )));
    }
    Ok(truncated(&market.to_ascii_uppercase()))
}

impl Default for Config {
    fn default() -> Self {
        Self::unchecked(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}
