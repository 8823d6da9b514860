//! Byte-stream transports.
//!
//! The HTTP engine talks to the network only through [`Transport`]: a
//! blocking, bidirectional byte stream that can be (re)connected to a host.
//! Read timeouts are the transport's business; a timed out read surfaces as
//! an I/O error or an early end of stream.
//!
//! # Implementations
//!
//! * [`tcp::TcpTransport`] - `std::net::TcpStream`, wrapped in rustls when
//!   the `tls` feature is enabled
//! * [`scripted::ScriptedTransport`] - replays canned responses from memory
//!   and records every request, for tests and offline demos
//!
//! Firmware ports implement the trait on top of their network stack.

pub mod scripted;
pub mod tcp;

use std::{
    io::{self, Read, Write},
    time::Duration,
};

pub use scripted::ScriptedTransport;
pub use tcp::TcpTransport;

/// A connectable, blocking byte stream.
pub trait Transport: Read + Write {
    /// Opens a connection to `host:port`, closing any previous one.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Sets the read timeout applied to subsequent connections.
    fn set_timeout(&mut self, timeout: Duration);

    /// Returns whether the stream is open and the peer has not closed it.
    fn is_connected(&self) -> bool;

    /// Closes the connection. Closing an idle transport does nothing.
    fn close(&mut self);

    /// Cooperative yield point, taken after connecting and while streaming.
    ///
    /// Schedulers that need periodic yields (watchdogs, cooperative RTOS
    /// tasks) hook in here.
    fn pause(&mut self) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        (**self).connect(host, port)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        (**self).set_timeout(timeout);
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn pause(&mut self) {
        (**self).pause();
    }
}
