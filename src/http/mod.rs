//! Minimal HTTP/1.1 client over a [`Transport`].
//!
//! This module wraps a transport and adds:
//! * A fresh connection for every request
//! * Consistent timeouts and headers
//! * Status line and header parsing, with body framing
//!
//! # Example
//!
//! ```rust
//! use tinyspot::http::{Client, Request};
//!
//! let mut client = Client::new(transport, &config);
//! let request = Request::get("api.spotify.com", "/v1/me/player")
//!     .with_authorization(bearer);
//! let response = client.execute(&request)?;
//! assert_eq!(response.status(), 200);
//! ```

pub mod request;
pub mod response;

use std::{fmt::Debug, str, time::Duration};

use serde::de::DeserializeOwned;

pub use request::{Body, Method, Request};
pub use response::{parse_status_line, Framing, Response};

use crate::{
    config::Config,
    error::{Error, ErrorKind, Result},
    protocol::{self, ErrorResponse},
    transport::Transport,
};

/// Media type requested for JSON endpoints.
pub const ACCEPT_JSON: &str = "application/json";

/// Bytes of an error document that are inspected.
pub const ERROR_BODY_LEN: usize = 256;

/// Converts a response with an unexpected status into an error.
///
/// The kind follows [`ErrorKind::from_status`]. If the body holds one of the
/// API's error documents, its message is included.
pub fn status_error<T: Transport>(response: &mut Response<'_, T>, origin: &str) -> Error {
    let status = response.status();
    let body = response
        .read_prefix::<ERROR_BODY_LEN>()
        .unwrap_or_default();

    let explanation = str::from_utf8(&body)
        .ok()
        .filter(|text| text.trim_start().starts_with('{'))
        .and_then(|text| protocol::json::<ErrorResponse>(text, origin).ok());

    match explanation {
        Some(explanation) => {
            warn!("{origin}: HTTP status {status}: {explanation}");
            Error::new(
                ErrorKind::from_status(status),
                format!("{origin}: unexpected HTTP status {status}: {explanation}"),
            )
        }
        None => {
            warn!("{origin}: HTTP status {status}");
            Error::from_status(status, origin)
        }
    }
}

/// HTTP client owning its transport.
///
/// Not reentrant: the [`Response`] returned by [`Client::execute`] borrows
/// the client until it is dropped, which also closes the connection.
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    port: u16,
    timeout: Duration,
    user_agent: Option<String>,
    toss_until_json: bool,
}

impl<T: Transport> Client<T> {
    /// Creates a new client from the connection settings in `config`.
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            port: config.port,
            timeout: config.timeout,
            user_agent: Some(config.user_agent.clone()).filter(|ua| !ua.is_empty()),
            toss_until_json: config.toss_until_json,
        }
    }

    /// Opens a connection to the request's host, sends the request and
    /// reads the response head.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * The connection cannot be opened (`Unavailable`)
    /// * The request cannot be sent (`Unavailable`)
    /// * The status line is missing or malformed (`DataLoss`)
    pub fn execute(&mut self, request: &Request<'_>) -> Result<Response<'_, T>> {
        // Drop anything left over from an earlier exchange.
        self.transport.close();
        self.transport.set_timeout(self.timeout);

        if let Err(e) = self.transport.connect(request.host, self.port) {
            warn!("connection to {}:{} failed: {e}", request.host, self.port);
            return Err(Error::unavailable(format!(
                "connection to {} failed: {e}",
                request.host
            )));
        }

        // Give the scheduler a breather.
        self.transport.pause();

        debug!("{} {}{}", request.method, request.host, request.path);
        if let Err(e) = request.write_to(&mut self.transport, self.user_agent.as_deref()) {
            error!("failed to send request: {e}");
            self.transport.close();
            return Err(Error::unavailable(format!("failed to send request: {e}")));
        }

        let response = Response::receive(&mut self.transport)?;
        debug!("status code: {}", response.status());

        Ok(response)
    }

    /// Executes `request` and decodes a `200 OK` JSON body.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * The request fails as in [`Client::execute`]
    /// * The status is not 200 (`204 No Content` is `NotFound`)
    /// * The body does not decode into `D`
    pub fn fetch_json<D>(&mut self, request: &Request<'_>, origin: &str) -> Result<D>
    where
        D: DeserializeOwned + Debug,
    {
        let toss_until_json = self.toss_until_json;
        let mut response = self.execute(request)?;

        if response.status() != 200 {
            return Err(status_error(&mut response, origin));
        }

        if toss_until_json {
            let tossed = response.toss_until_json()?;
            if tossed > 0 {
                debug!("{origin}: tossed {tossed} bytes before JSON");
            }
        }

        response.json(origin)
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the client, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
