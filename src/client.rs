//! The Spotify Web API client.
//!
//! [`Client`] ties together a transport, the token [`Session`] and the
//! [`Config`]. Playback commands, playback queries and image downloads are
//! implemented on it in [`player`](crate::player),
//! [`playback`](crate::playback) and [`image`](crate::image).
//!
//! Every authorized request passes the same gate first: if auto-refresh is
//! enabled and the bearer token is missing or stale, it is refreshed
//! synchronously. A failed refresh fails the request without sending it.
//! A `401 Unauthorized` answer marks the token stale, so the next request
//! refreshes; the rejected request itself is not repeated.
//!
//! # Example
//!
//! ```rust
//! use tinyspot::{client::Client, config::Config, credentials::Credentials, transport::TcpTransport};
//!
//! let credentials = Credentials::from_file("secrets.toml")?;
//! let mut client = Client::new(TcpTransport::new()?, credentials, Config::default());
//!
//! let playing = client.get_currently_playing(None)?;
//! println!("{} by {}", playing.track_name, playing.first_artist_name);
//! client.next_track(None)?;
//! ```

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    clock::{Clock, MonotonicClock},
    config::Config,
    credentials::Credentials,
    error::{Error, ErrorKind, Result},
    http::{self, status_error, Body, Method, Request, ACCEPT_JSON},
    session::{Session, TokenState},
    transport::Transport,
};

#[derive(Debug)]
pub struct Client<T: Transport, C: Clock = MonotonicClock> {
    pub(crate) http: http::Client<T>,
    pub(crate) session: Session<C>,
    pub(crate) config: Config,
}

impl<T: Transport> Client<T> {
    /// Creates a client that refreshes tokens with `credentials`.
    ///
    /// No request is made until the first operation.
    #[must_use]
    pub fn new(transport: T, credentials: Credentials, config: Config) -> Self {
        Self::with_clock(transport, credentials, config, MonotonicClock::new())
    }

    /// Creates a client from an access token alone.
    ///
    /// The token is assumed fresh and valid for an hour. Without a refresh
    /// token it cannot be renewed: once stale, requests fail with
    /// `FailedPrecondition` while auto-refresh is enabled.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the token is too long.
    pub fn with_bearer_token(transport: T, access_token: &str, config: Config) -> Result<Self> {
        let mut client = Self::new(transport, Credentials::default(), config);
        client.session.set_bearer_token(access_token, None)?;
        Ok(client)
    }
}

impl<T: Transport, C: Clock> Client<T, C> {
    #[must_use]
    pub fn with_clock(transport: T, credentials: Credentials, config: Config, clock: C) -> Self {
        Self {
            http: http::Client::new(transport, &config),
            session: Session::new(credentials, clock),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        self.http.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.http.transport_mut()
    }

    #[must_use]
    pub fn token_state(&self) -> TokenState {
        self.session.state()
    }

    /// The current access token, without the `Bearer ` prefix.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.session.access_token()
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.session.refresh_token()
    }

    pub fn set_client_id(&mut self, client_id: &str) {
        self.session.credentials_mut().set_client_id(client_id);
    }

    pub fn set_client_secret(&mut self, client_secret: &str) {
        self.session.credentials_mut().set_client_secret(client_secret);
    }

    pub fn set_refresh_token(&mut self, refresh_token: &str) {
        self.session.credentials_mut().set_refresh_token(refresh_token);
    }

    /// See [`Session::authorize_url`].
    pub fn authorize_url(&self, redirect_uri: &str, scopes: &[&str]) -> Result<Url> {
        self.session
            .authorize_url(&self.config.accounts_host, redirect_uri, scopes)
    }

    /// Exchanges an authorization code and returns the refresh token to
    /// keep for later runs.
    ///
    /// See [`Session::request_access_tokens`].
    pub fn request_access_tokens(&mut self, code: &str, redirect_uri: &str) -> Result<&str> {
        self.session.request_access_tokens(
            &mut self.http,
            &self.config.accounts_host,
            code,
            redirect_uri,
        )?;
        Ok(self.session.refresh_token())
    }

    /// See [`Session::refresh_access_token`].
    pub fn refresh_access_token(&mut self) -> Result<()> {
        self.session
            .refresh_access_token(&mut self.http, &self.config.accounts_host)
    }

    /// Refreshes the access token if it is missing or stale.
    ///
    /// Returns whether a refresh took place.
    pub fn check_and_refresh_access_token(&mut self) -> Result<bool> {
        let stale = self.session.state() != TokenState::Authenticated;
        self.session
            .ensure_fresh(&mut self.http, &self.config.accounts_host)?;
        Ok(stale)
    }

    /// Runs the refresh gate and checks that a token is present.
    fn authorize(&mut self) -> Result<()> {
        if self.config.auto_refresh {
            self.session
                .ensure_fresh(&mut self.http, &self.config.accounts_host)?;
        }

        if self.session.authorization().is_none() {
            return Err(Error::unauthenticated("no access token"));
        }
        Ok(())
    }

    fn rejected<R>(&mut self, result: &Result<R>) {
        if matches!(result, Err(e) if e.kind == ErrorKind::Unauthenticated) {
            self.session.mark_expired();
        }
    }

    /// Sends an authorized request to the Web API that must be answered
    /// with `204 No Content`.
    pub(crate) fn command(
        &mut self,
        method: Method,
        path: &str,
        body: Body<'_>,
        origin: &str,
    ) -> Result<()> {
        self.authorize()?;
        let authorization = self.session.authorization().unwrap_or_default();

        let request = Request::new(method, &self.config.api_host, path)
            .with_body(body)
            .with_authorization(authorization);

        let result = match self.http.execute(&request) {
            Ok(response) if response.status() == 204 => Ok(()),
            Ok(mut response) => Err(status_error(&mut response, origin)),
            Err(e) => Err(e),
        };

        self.rejected(&result);
        result
    }

    /// Sends an authorized `GET` to the Web API and decodes the JSON body.
    pub(crate) fn fetch<D>(&mut self, path: &str, origin: &str) -> Result<D>
    where
        D: DeserializeOwned + Debug,
    {
        self.authorize()?;
        let authorization = self.session.authorization().unwrap_or_default();

        let request = Request::get(&self.config.api_host, path)
            .with_accept(ACCEPT_JSON)
            .with_authorization(authorization);

        let result = self.http.fetch_json(&request, origin);

        self.rejected(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, transport::ScriptedTransport};
    use std::time::Duration;

    const TOKEN: &str = r#"{"access_token":"fresh","expires_in":3600}"#;

    fn client(transport: ScriptedTransport, clock: &ManualClock) -> Client<ScriptedTransport, ManualClock> {
        Client::with_clock(
            transport,
            Credentials::new("id", "secret", "refresh"),
            Config::default(),
            clock.clone(),
        )
    }

    #[test]
    fn first_request_refreshes_then_sends() {
        let clock = ManualClock::default();
        let mut transport = ScriptedTransport::new();
        transport.push_json(TOKEN).push_status(204, "");
        let mut client = client(transport, &clock);

        client
            .command(Method::Put, "/v1/me/player/pause", Body::empty(), "pause")
            .unwrap();

        let exchanges = client.transport().exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].host, "accounts.spotify.com");
        assert_eq!(exchanges[1].host, "api.spotify.com");
        assert!(exchanges[1]
            .request_text()
            .contains("Authorization: Bearer fresh\r\n"));
    }

    #[test]
    fn refresh_happens_exactly_at_ttl() {
        let clock = ManualClock::starting_at(1000);
        let mut transport = ScriptedTransport::new();
        transport
            .push_json(TOKEN)
            .push_status(204, "")
            .push_status(204, "")
            .push_json(TOKEN)
            .push_status(204, "");
        let mut client = client(transport, &clock);
        client.refresh_access_token().unwrap();
        let ttl = client.session().bearer_token().unwrap().time_to_live();

        client
            .command(Method::Put, "/v1/me/player/pause", Body::empty(), "pause")
            .unwrap();

        clock.set(1000 + ttl - 1);
        client
            .command(Method::Put, "/v1/me/player/pause", Body::empty(), "pause")
            .unwrap();
        assert_eq!(client.transport().exchanges().len(), 3);

        clock.set(1000 + ttl);
        client
            .command(Method::Put, "/v1/me/player/pause", Body::empty(), "pause")
            .unwrap();
        let exchanges = client.transport().exchanges();
        assert_eq!(exchanges.len(), 5);
        assert_eq!(exchanges[3].host, "accounts.spotify.com");
    }

    #[test]
    fn unauthorized_marks_token_stale() {
        let clock = ManualClock::default();
        let mut transport = ScriptedTransport::new();
        transport.push_status(401, r#"{"error":{"status":401,"message":"The access token expired"}}"#);
        let mut client = client(transport, &clock);
        client.session_mut().set_bearer_token("old", None).unwrap();

        let err = client
            .fetch::<serde_json::Value>("/v1/me/player", "player")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
        assert_eq!(client.token_state(), TokenState::Expiring);
        assert_eq!(client.transport().exchanges().len(), 1);
    }

    #[test]
    fn failed_refresh_skips_request() {
        let clock = ManualClock::default();
        let mut transport = ScriptedTransport::new();
        transport.push_status(400, r#"{"error":"invalid_grant"}"#);
        let mut client = client(transport, &clock);
        client
            .session_mut()
            .set_bearer_token("old", Some(Duration::from_secs(1)))
            .unwrap();

        let err = client
            .command(Method::Post, "/v1/me/player/next", Body::empty(), "next")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(client.token_state(), TokenState::Unauthenticated);
        assert_eq!(client.transport().exchanges().len(), 1);
    }

    #[test]
    fn without_auto_refresh_stale_tokens_are_sent() {
        let clock = ManualClock::default();
        let mut transport = ScriptedTransport::new();
        transport.push_status(204, "");
        let config = Config {
            auto_refresh: false,
            ..Config::default()
        };
        let mut client = Client::with_clock(transport, Credentials::default(), config, clock.clone());
        client
            .session_mut()
            .set_bearer_token("old", Some(Duration::ZERO))
            .unwrap();

        client
            .command(Method::Put, "/v1/me/player/play", Body::empty(), "play")
            .unwrap();
        assert_eq!(client.transport().exchanges().len(), 1);
    }

    #[test]
    fn bearer_only_client_sends_token() {
        let mut transport = ScriptedTransport::new();
        transport.push_status(204, "");
        let mut client = Client::with_bearer_token(transport, "given", Config::default()).unwrap();

        client
            .command(Method::Put, "/v1/me/player/play", Body::empty(), "play")
            .unwrap();
        assert_eq!(client.access_token(), Some("given"));
        assert!(client
            .transport()
            .last_exchange()
            .unwrap()
            .request_text()
            .contains("Authorization: Bearer given\r\n"));
    }

    #[test]
    fn unauthenticated_without_credentials() {
        let config = Config {
            auto_refresh: false,
            ..Config::default()
        };
        let mut client = Client::new(ScriptedTransport::new(), Credentials::default(), config);
        let err = client
            .command(Method::Put, "/v1/me/player/play", Body::empty(), "play")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    #[test]
    fn check_and_refresh_reports_refresh() {
        let clock = ManualClock::default();
        let mut transport = ScriptedTransport::new();
        transport.push_json(TOKEN);
        let mut client = client(transport, &clock);

        assert!(client.check_and_refresh_access_token().unwrap());
        assert!(!client.check_and_refresh_access_token().unwrap());
    }
}
