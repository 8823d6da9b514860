//! TCP transport with optional TLS.

use std::{
    fmt,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

#[cfg(feature = "tls")]
use std::sync::Arc;

use super::Transport;
use crate::error::Result;

/// Transport over `std::net::TcpStream`.
///
/// With the `tls` feature, [`TcpTransport::new`] wraps every connection in
/// rustls using the Mozilla root certificates from `webpki-roots`.
/// [`TcpTransport::plain`] never does, which is useful against local test
/// servers.
pub struct TcpTransport {
    stream: Option<Stream>,
    timeout: Duration,

    #[cfg(feature = "tls")]
    tls: Option<Arc<rustls::ClientConfig>>,
}

enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>),
}

impl TcpTransport {
    /// Default time to wait for individual network reads.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a transport that speaks TLS when the `tls` feature is on.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration cannot be built.
    pub fn new() -> Result<Self> {
        #[cfg(feature = "tls")]
        {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let provider = Arc::new(rustls::crypto::ring::default_provider());
            let config = rustls::ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_root_certificates(roots)
                .with_no_client_auth();

            Ok(Self {
                stream: None,
                timeout: Self::DEFAULT_TIMEOUT,
                tls: Some(Arc::new(config)),
            })
        }

        #[cfg(not(feature = "tls"))]
        {
            warn!("built without TLS support; connections are unencrypted");
            Ok(Self::plain())
        }
    }

    /// Creates a transport that never uses TLS.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            stream: None,
            timeout: Self::DEFAULT_TIMEOUT,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    fn stream(&mut self) -> io::Result<&mut Stream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }

    #[cfg(feature = "tls")]
    fn wrap(&self, host: &str, socket: TcpStream) -> io::Result<Stream> {
        let Some(config) = self.tls.as_ref() else {
            return Ok(Stream::Plain(socket));
        };

        let server_name = rustls::pki_types::ServerName::try_from(host.to_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let connection = rustls::ClientConnection::new(Arc::clone(config), server_name)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        Ok(Stream::Tls(Box::new(rustls::StreamOwned::new(
            connection, socket,
        ))))
    }

    #[cfg(not(feature = "tls"))]
    #[expect(clippy::unused_self)]
    fn wrap(&self, _host: &str, socket: TcpStream) -> io::Result<Stream> {
        Ok(Stream::Plain(socket))
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("connected", &self.stream.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.close();

        let socket = TcpStream::connect((host, port))?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.set_write_timeout(Some(self.timeout))?;
        socket.set_nodelay(true)?;

        self.stream = Some(self.wrap(host, socket)?);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            trace!("closing connection");
            let socket = match stream {
                Stream::Plain(socket) => socket,
                #[cfg(feature = "tls")]
                Stream::Tls(mut tls) => {
                    tls.conn.send_close_notify();
                    let _ = tls.conn.complete_io(&mut tls.sock);
                    tls.sock
                }
            };
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    fn pause(&mut self) {
        std::thread::yield_now();
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // An idle transport reads as a closed one.
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };

        let result = match stream {
            Stream::Plain(socket) => socket.read(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(tls) => tls.read(buf),
        };

        match result {
            Ok(0) => {
                self.stream = None;
                Ok(0)
            }
            // Peers regularly hang up without a TLS close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.stream = None;
                Ok(0)
            }
            other => other,
        }
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream()? {
            Stream::Plain(socket) => socket.write(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream()? {
            Stream::Plain(socket) => socket.flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(tls) => tls.flush(),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}
