//! In-memory transport that replays scripted responses.
//!
//! Each call to [`Transport::connect`] consumes the next scripted response.
//! Everything written during that connection is recorded, so tests can
//! assert on the exact request bytes.
//!
//! ```rust
//! use tinyspot::transport::ScriptedTransport;
//!
//! let mut transport = ScriptedTransport::new();
//! transport.push_response("HTTP/1.1 204 No Content\r\n\r\n");
//! ```

use std::{
    collections::VecDeque,
    io::{self, Cursor, Read, Write},
    time::Duration,
};

use super::Transport;

/// One connection as seen by the scripted peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Exchange {
    pub host: String,
    pub port: u16,
    pub request: Vec<u8>,
}

impl Exchange {
    /// The request as (lossy) text.
    #[must_use]
    pub fn request_text(&self) -> String {
        String::from_utf8_lossy(&self.request).into_owned()
    }

    /// The request line, without the trailing CRLF.
    #[must_use]
    pub fn request_line(&self) -> String {
        self.request_text()
            .split("\r\n")
            .next()
            .unwrap_or_default()
            .to_owned()
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: VecDeque<Vec<u8>>,
    exchanges: Vec<Exchange>,
    current: Option<Cursor<Vec<u8>>>,
    read_limit: Option<usize>,
    timeout: Option<Duration>,
    pauses: usize,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw response for the next connection.
    pub fn push_response(&mut self, response: impl Into<Vec<u8>>) -> &mut Self {
        self.responses.push_back(response.into());
        self
    }

    /// Queues a `Content-Length` framed response with the given status and
    /// body.
    pub fn push_status(&mut self, status: u16, body: &str) -> &mut Self {
        let response = format!(
            "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        self.push_response(response)
    }

    /// Queues a `200 OK` JSON response.
    pub fn push_json(&mut self, body: &str) -> &mut Self {
        self.push_status(200, body)
    }

    /// Limits every read to at most `limit` bytes, like a slow socket.
    pub fn with_read_limit(&mut self, limit: usize) -> &mut Self {
        self.read_limit = Some(limit.max(1));
        self
    }

    /// Connections made so far, oldest first.
    #[must_use]
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// The most recent connection.
    #[must_use]
    pub fn last_exchange(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    /// Responses not yet consumed.
    #[must_use]
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    /// Timeout most recently configured by the client.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of cooperative yields taken.
    #[must_use]
    pub fn pauses(&self) -> usize {
        self.pauses
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.close();

        let Some(response) = self.responses.pop_front() else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no scripted response left for {host}:{port}"),
            ));
        };

        self.exchanges.push(Exchange {
            host: host.to_owned(),
            port,
            request: Vec::new(),
        });
        self.current = Some(Cursor::new(response));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    fn close(&mut self) {
        self.current = None;
    }

    fn pause(&mut self) {
        self.pauses += 1;
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(cursor) = self.current.as_mut() else {
            return Ok(0);
        };

        let max = self.read_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        let n = cursor.read(&mut buf[..max])?;
        if n == 0 && !buf.is_empty() {
            // Peer hung up after the last scripted byte.
            self.current = None;
        }
        Ok(n)
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current.is_none() {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if let Some(exchange) = self.exchanges.last_mut() {
            exchange.request.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
