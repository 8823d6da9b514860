//! OAuth2 token lifecycle.
//!
//! A [`Session`] owns the client [`Credentials`] and the current
//! [`BearerToken`], and knows how to obtain new tokens from the accounts
//! service:
//!
//! * Exchanging an authorization code for the initial token pair
//! * Refreshing the access token with the refresh token
//! * Refreshing automatically when a token has gone stale
//!
//! ```text
//! Unauthenticated --exchange/refresh--> Authenticated --ttl elapsed--> Expiring
//!        ^                                    ^                          |
//!        |                                    +-------refresh ok---------+
//!        +-------------------------refresh failed------------------------+
//! ```
//!
//! The session does not own a connection: every network operation borrows
//! the HTTP client of the caller.

use std::time::Duration;

use url::{form_urlencoded, Url};

use crate::{
    bounded::{push_exact, BoundedString},
    clock::{Clock, MonotonicClock},
    credentials::{Credentials, REFRESH_TOKEN_CAPACITY},
    error::{Error, Result},
    http::{self, Body, Request, ACCEPT_JSON},
    protocol::auth::AccessToken,
    tokens::{BearerToken, DEFAULT_EXPIRES_IN},
    transport::Transport,
};

/// Path of the token endpoint on the accounts host.
pub const TOKEN_PATH: &str = "/api/token";

/// Path of the authorization page on the accounts host.
pub const AUTHORIZE_PATH: &str = "/authorize";

/// Capacity of token request bodies.
pub const FORM_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenState {
    /// No bearer token.
    Unauthenticated,
    /// A bearer token within its time to live.
    Authenticated,
    /// A bearer token that must be refreshed before use.
    Expiring,
}

#[derive(Debug)]
pub struct Session<C: Clock = MonotonicClock> {
    credentials: Credentials,
    token: Option<BearerToken>,
    clock: C,
}

impl<C: Clock> Session<C> {
    #[must_use]
    pub fn new(credentials: Credentials, clock: C) -> Self {
        Self {
            credentials,
            token: None,
            clock,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn state(&self) -> TokenState {
        match &self.token {
            None => TokenState::Unauthenticated,
            Some(token) if token.is_expired(self.clock.now_ms()) => TokenState::Expiring,
            Some(_) => TokenState::Authenticated,
        }
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    /// The `Authorization` header value, even if stale.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.token.as_ref().map(BearerToken::authorization)
    }

    /// The access token without the `Bearer ` prefix.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(BearerToken::access_token)
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.credentials.refresh_token()
    }

    /// Installs an access token obtained elsewhere.
    ///
    /// Without `expires_in` the token is assumed to be fresh and valid for
    /// an hour, the lifetime Spotify grants.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the token is too long.
    pub fn set_bearer_token(&mut self, access_token: &str, expires_in: Option<Duration>) -> Result<()> {
        let expires_in = expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        self.token = Some(BearerToken::new(
            access_token,
            expires_in,
            self.clock.now_ms(),
        )?);
        Ok(())
    }

    /// Makes the next [`Session::ensure_fresh`] refresh.
    pub fn mark_expired(&mut self) {
        if let Some(token) = self.token.as_mut() {
            debug!("access token rejected; refreshing before the next request");
            token.expire();
        }
    }

    /// Builds the URL users visit to grant access.
    ///
    /// After consenting, the user is redirected to `redirect_uri` with a
    /// `code` query parameter for [`Session::request_access_tokens`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * No client id is configured (`FailedPrecondition`)
    /// * `accounts_host` or `redirect_uri` do not form a valid URL
    pub fn authorize_url(
        &self,
        accounts_host: &str,
        redirect_uri: &str,
        scopes: &[&str],
    ) -> Result<Url> {
        if self.credentials.client_id().is_empty() {
            return Err(Error::failed_precondition("client id is not set"));
        }

        // Fail on garbage here rather than on the accounts service.
        Url::parse(redirect_uri)?;

        let base = format!("https://{accounts_host}{AUTHORIZE_PATH}");
        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.credentials.client_id()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
            ],
        )?;

        Ok(url)
    }

    /// Exchanges an authorization code for an access and refresh token.
    ///
    /// On failure the session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * Client id, client secret or `code` are missing
    /// * The token request fails or is answered with anything but 200
    /// * The response does not decode
    pub fn request_access_tokens<T: Transport>(
        &mut self,
        http: &mut http::Client<T>,
        accounts_host: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<()> {
        if self.credentials.client_id().is_empty() || self.credentials.client_secret().is_empty()
        {
            return Err(Error::failed_precondition(
                "client id and secret are required to exchange a code",
            ));
        }
        if code.is_empty() {
            return Err(Error::invalid_argument("authorization code is empty"));
        }

        let mut form = BoundedString::<FORM_CAPACITY>::new();
        push_exact(&mut form, "grant_type=authorization_code")?;
        push_param(&mut form, "code", code)?;
        push_param(&mut form, "redirect_uri", redirect_uri)?;
        push_param(&mut form, "client_id", self.credentials.client_id())?;
        push_param(&mut form, "client_secret", self.credentials.client_secret())?;

        let now = self.clock.now_ms();
        let token = request_token(http, accounts_host, &form, "authorization code")?;

        if token.refresh_token.as_deref().unwrap_or_default().is_empty() {
            warn!("token response has no refresh token; keeping the previous one");
        }
        self.store(&token, now)?;

        info!("authorized; access token valid for {}s", token.expires_in.as_secs());
        Ok(())
    }

    /// Obtains a new access token with the refresh token.
    ///
    /// A rotated refresh token is stored as well. On failure the session is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * Client id, client secret or refresh token are missing
    ///   (`FailedPrecondition`; nothing is sent)
    /// * The token request fails or is answered with anything but 200
    /// * The response does not decode
    pub fn refresh_access_token<T: Transport>(
        &mut self,
        http: &mut http::Client<T>,
        accounts_host: &str,
    ) -> Result<()> {
        if !self.credentials.can_refresh() {
            return Err(Error::failed_precondition(
                "client id, secret and refresh token are required to refresh",
            ));
        }

        let mut form = BoundedString::<FORM_CAPACITY>::new();
        push_exact(&mut form, "grant_type=refresh_token")?;
        push_param(&mut form, "refresh_token", self.credentials.refresh_token())?;
        push_param(&mut form, "client_id", self.credentials.client_id())?;
        push_param(&mut form, "client_secret", self.credentials.client_secret())?;

        let now = self.clock.now_ms();
        let token = request_token(http, accounts_host, &form, "refresh token")?;
        self.store(&token, now)?;

        debug!(
            "access token refreshed; time to live: {}s",
            self.token
                .as_ref()
                .map_or(0, |token| token.time_to_live() / 1000)
        );
        Ok(())
    }

    /// Refreshes the access token if it is missing or stale.
    ///
    /// If the refresh fails, any stale token is dropped so the session
    /// reads as [`TokenState::Unauthenticated`].
    ///
    /// # Errors
    ///
    /// Returns the refresh error.
    pub fn ensure_fresh<T: Transport>(
        &mut self,
        http: &mut http::Client<T>,
        accounts_host: &str,
    ) -> Result<()> {
        match self.state() {
            TokenState::Authenticated => return Ok(()),
            TokenState::Expiring => debug!("access token expired; refreshing"),
            TokenState::Unauthenticated => debug!("no access token; refreshing"),
        }

        if let Err(e) = self.refresh_access_token(http, accounts_host) {
            if self.token.take().is_some() {
                warn!("dropping stale access token: {e}");
            }
            return Err(e);
        }

        Ok(())
    }

    /// Stores a token document; on error nothing changes.
    fn store(&mut self, token: &AccessToken, now_ms: u64) -> Result<()> {
        let bearer = BearerToken::new(&token.access_token, token.expires_in, now_ms)?;

        let refresh_token = token.refresh_token.as_deref().filter(|t| !t.is_empty());
        if let Some(refresh_token) = refresh_token {
            if refresh_token.len() > REFRESH_TOKEN_CAPACITY {
                return Err(Error::out_of_range(format!(
                    "refresh token should be at most {REFRESH_TOKEN_CAPACITY} bytes long but is {}",
                    refresh_token.len()
                )));
            }
            self.credentials.set_refresh_token(refresh_token);
        }
        self.token = Some(bearer);

        Ok(())
    }
}

/// POSTs a form to the token endpoint and decodes the token document.
fn request_token<T: Transport>(
    http: &mut http::Client<T>,
    accounts_host: &str,
    form: &str,
    origin: &str,
) -> Result<AccessToken> {
    let request =
        Request::post(accounts_host, TOKEN_PATH, Body::form(form)).with_accept(ACCEPT_JSON);
    http.fetch_json(&request, origin)
}

/// Appends `&name=value` with `value` form-urlencoded.
fn push_param<const N: usize>(
    form: &mut BoundedString<N>,
    name: &str,
    value: &str,
) -> Result<()> {
    push_exact(form, "&")?;
    push_exact(form, name)?;
    push_exact(form, "=")?;
    for part in form_urlencoded::byte_serialize(value.as_bytes()) {
        push_exact(form, part)?;
    }
    Ok(())
}
