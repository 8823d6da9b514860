//! HTTP/1.1 response parsing and body streaming.
//!
//! A [`Response`] is created right after the request has been sent. It
//! reads the status line and all headers eagerly, then exposes the body
//! through [`std::io::Read`] with the framing the headers announced:
//!
//! * `Transfer-Encoding: chunked` - chunks are decoded transparently
//! * `Content-Length` - exactly that many bytes
//! * neither - everything until the peer closes the connection
//!
//! All buffering uses fixed-size arrays; nothing here allocates.
//!
//! The connection is closed when the response is dropped.

use std::{
    cmp,
    io::{self, BufRead, Read, Write},
    str,
};

use serde::de::DeserializeOwned;

use crate::{
    error::{Error, Result},
    transport::Transport,
};

/// Bytes of the status line that are kept; the rest is discarded.
pub const STATUS_LINE_LEN: usize = 32;

/// Bytes of a header line that are kept; the rest is discarded.
pub const HEADER_LINE_LEN: usize = 256;

/// Size of the stack buffer used when streaming bodies.
pub const STREAM_CHUNK_LEN: usize = 128;

const READ_BUFFER_LEN: usize = 128;

/// Parses an HTTP status line into its numeric status.
///
/// The line is split on spaces. It is accepted only if the first token is
/// exactly `HTTP/1.0` or `HTTP/1.1`; the status is the leading decimal
/// digits of the second token. Anything up to and including the first
/// carriage return ends the line.
///
/// ```rust
/// use tinyspot::http::parse_status_line;
///
/// assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n"), Some(200));
/// assert_eq!(parse_status_line(b"GARBAGE\r\n"), None);
/// ```
#[must_use]
pub fn parse_status_line(line: &[u8]) -> Option<u16> {
    let end = line.iter().position(|&b| b == b'\r').unwrap_or(line.len());
    let mut tokens = line[..end]
        .split(|&b| b == b' ')
        .filter(|token| !token.is_empty());

    let version = tokens.next()?;
    if version != b"HTTP/1.0" && version != b"HTTP/1.1" {
        return None;
    }

    let code = tokens.next()?;
    let digits = code.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    str::from_utf8(&code[..digits]).ok()?.parse().ok()
}

/// How the end of the body is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// This many bytes are left.
    Length(u64),
    /// Chunked transfer coding.
    Chunked,
    /// Read until the peer closes the connection.
    UntilClose,
}

/// Fixed-size read buffer over a borrowed transport.
struct Reader<'t, T: Transport> {
    transport: &'t mut T,
    buf: [u8; READ_BUFFER_LEN],
    pos: usize,
    len: usize,
}

impl<'t, T: Transport> Reader<'t, T> {
    fn new(transport: &'t mut T) -> Self {
        Self {
            transport,
            buf: [0; READ_BUFFER_LEN],
            pos: 0,
            len: 0,
        }
    }

    /// Reads up to and including `\n`, keeping at most `N` bytes without
    /// the line terminator.
    ///
    /// Returns `false` if the stream ended before a `\n` was seen.
    fn read_line<const N: usize>(&mut self, line: &mut heapless::Vec<u8, N>) -> io::Result<bool> {
        line.clear();
        loop {
            let available = self.fill_buf()?;
            if available.is_empty() {
                return Ok(false);
            }

            let (consumed, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            let content = if done {
                &available[..consumed - 1]
            } else {
                available
            };
            for &b in content {
                // Over-long lines are truncated, not rejected.
                let _ = line.push(b);
            }
            self.consume(consumed);

            if done {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(true);
            }
        }
    }
}

impl<T: Transport> Read for Reader<'_, T> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        // Large reads bypass the buffer when it is empty.
        if self.pos == self.len && out.len() >= self.buf.len() {
            return self.transport.read(out);
        }

        let available = self.fill_buf()?;
        let n = cmp::min(available.len(), out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<T: Transport> BufRead for Reader<'_, T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.len {
            self.len = self.transport.read(&mut self.buf)?;
            self.pos = 0;
        }
        Ok(&self.buf[self.pos..self.len])
    }

    fn consume(&mut self, amount: usize) {
        self.pos = cmp::min(self.pos + amount, self.len);
    }
}

/// A response whose status line and headers have been read.
///
/// Reading from it yields the decoded body.
pub struct Response<'t, T: Transport> {
    reader: Reader<'t, T>,
    status: u16,
    content_length: Option<u64>,
    framing: Framing,
    chunk_remaining: u64,
    chunk_finished: bool,
    pending: Option<u8>,
}

impl<'t, T: Transport> Response<'t, T> {
    /// Reads the status line and headers from a transport that just sent a
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DataLoss`](crate::error::ErrorKind::DataLoss) if
    /// the status line is missing or malformed, after closing the
    /// connection.
    pub fn receive(transport: &'t mut T) -> Result<Self> {
        let mut reader = Reader::new(transport);

        let mut line = heapless::Vec::<u8, STATUS_LINE_LEN>::new();
        let status = match reader.read_line(&mut line) {
            Ok(_) => parse_status_line(&line),
            Err(e) => {
                warn!("reading status line failed: {e}");
                None
            }
        };
        trace!("status line: {}", String::from_utf8_lossy(&line));

        let Some(status) = status else {
            reader.transport.close();
            return Err(Error::data_loss(format!(
                "malformed HTTP status line: {:?}",
                String::from_utf8_lossy(&line)
            )));
        };

        let mut response = Self {
            reader,
            status,
            content_length: None,
            framing: Framing::UntilClose,
            chunk_remaining: 0,
            chunk_finished: false,
            pending: None,
        };
        response.read_headers();

        Ok(response)
    }

    fn read_headers(&mut self) {
        let mut chunked = false;
        let mut line = heapless::Vec::<u8, HEADER_LINE_LEN>::new();

        loop {
            match self.reader.read_line(&mut line) {
                Ok(true) if line.is_empty() => break,
                Ok(true) => {}
                Ok(false) => {
                    // Carry on with whatever follows; the body will likely
                    // fail to decode.
                    warn!("invalid response: end of headers not found");
                    self.framing = Framing::Length(0);
                    return;
                }
                Err(e) => {
                    warn!("invalid response: reading headers failed: {e}");
                    self.framing = Framing::Length(0);
                    return;
                }
            }

            let Ok(text) = str::from_utf8(&line) else {
                continue;
            };
            let Some((name, value)) = text.split_once(':') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());

            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse().ok();
                debug!("Content-Length: {value}");
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                chunked = value
                    .split(',')
                    .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
            }
        }

        self.framing = if chunked {
            Framing::Chunked
        } else if let Some(length) = self.content_length {
            Framing::Length(length)
        } else {
            Framing::UntilClose
        };
    }

    /// The numeric HTTP status.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The announced `Content-Length`, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// How the end of the body is determined.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Discards body bytes before the first `{`.
    ///
    /// Some proxies emit stray bytes between the headers and a JSON
    /// payload. Returns the number of bytes discarded.
    pub fn toss_until_json(&mut self) -> io::Result<usize> {
        let mut tossed = 0;
        let mut byte = [0u8; 1];

        while self.read(&mut byte)? == 1 {
            if byte[0] == b'{' {
                self.pending = Some(b'{');
                break;
            }
            trace!("tossing an unexpected byte: {:#04x}", byte[0]);
            tossed += 1;
        }

        Ok(tossed)
    }

    /// Decodes the body as JSON.
    ///
    /// `origin` names the endpoint in log messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `D`.
    pub fn json<D>(&mut self, origin: &str) -> Result<D>
    where
        D: DeserializeOwned + std::fmt::Debug,
    {
        match serde_json::from_reader::<_, D>(&mut *self) {
            Ok(result) => {
                trace!("{origin}: {result:#?}");
                Ok(result)
            }
            Err(e) => {
                error!("{origin}: failed parsing response ({e})");
                Err(e.into())
            }
        }
    }

    /// Reads at most `N` body bytes.
    ///
    /// Meant for error documents, which are only of interest for
    /// diagnostics.
    pub fn read_prefix<const N: usize>(&mut self) -> io::Result<heapless::Vec<u8, N>> {
        let mut prefix = heapless::Vec::new();
        let mut buf = [0u8; STREAM_CHUNK_LEN];

        while !prefix.is_full() {
            let want = cmp::min(buf.len(), N - prefix.len());
            let n = self.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            // Cannot fail: `n <= want`.
            let _ = prefix.extend_from_slice(&buf[..n]);
        }

        Ok(prefix)
    }

    /// Streams the body into `sink` in chunks of [`STREAM_CHUNK_LEN`] bytes.
    ///
    /// Stops when the body is complete or the peer closes the connection,
    /// taking a cooperative yield after every chunk. Returns the number of
    /// bytes forwarded.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the transport or writing to the
    /// sink fails.
    pub fn stream_to<W>(&mut self, sink: &mut W) -> Result<u64>
    where
        W: Write + ?Sized,
    {
        let mut buf = [0u8; STREAM_CHUNK_LEN];
        let mut total = 0u64;

        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }

            sink.write_all(&buf[..n])?;
            total += n as u64;
            self.reader.transport.pause();
        }

        sink.flush()?;
        Ok(total)
    }

    fn read_chunked(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.chunk_finished {
                return Ok(0);
            }

            if self.chunk_remaining > 0 {
                let max = usize::try_from(self.chunk_remaining)
                    .map_or(out.len(), |r| r.min(out.len()));
                let n = self.reader.read(&mut out[..max])?;
                if n == 0 {
                    warn!("connection closed inside a chunk");
                    self.chunk_finished = true;
                }
                self.chunk_remaining -= n as u64;
                return Ok(n);
            }

            let mut line = heapless::Vec::<u8, 32>::new();
            let complete = self.reader.read_line(&mut line)?;
            let size = str::from_utf8(&line)
                .ok()
                .map(|text| text.split(';').next().unwrap_or_default().trim())
                .unwrap_or_default();

            if size.is_empty() {
                if !complete {
                    self.chunk_finished = true;
                    return Ok(0);
                }
                // The CRLF that terminates the previous chunk.
                continue;
            }

            let size = u64::from_str_radix(size, 16).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("bad chunk size: {e}"))
            })?;

            if size == 0 {
                self.chunk_finished = true;
                // Skip trailers up to the final empty line.
                let mut trailer = heapless::Vec::<u8, HEADER_LINE_LEN>::new();
                while self.reader.read_line(&mut trailer)? && !trailer.is_empty() {}
                return Ok(0);
            }

            self.chunk_remaining = size;
        }
    }
}

impl<T: Transport> Read for Response<'_, T> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        if let Some(byte) = self.pending.take() {
            out[0] = byte;
            return Ok(1);
        }

        match self.framing {
            Framing::Length(0) => Ok(0),
            Framing::Length(remaining) => {
                let max = usize::try_from(remaining).map_or(out.len(), |r| r.min(out.len()));
                let n = self.reader.read(&mut out[..max])?;
                if n == 0 {
                    warn!("connection closed with {remaining} body bytes outstanding");
                    self.framing = Framing::Length(0);
                } else {
                    self.framing = Framing::Length(remaining - n as u64);
                }
                Ok(n)
            }
            Framing::Chunked => self.read_chunked(out),
            Framing::UntilClose => self.reader.read(out),
        }
    }
}

impl<T: Transport> Drop for Response<'_, T> {
    fn drop(&mut self) {
        if self.reader.transport.is_connected() {
            trace!("closing client");
            self.reader.transport.close();
        }
    }
}
