//! HTTP/1.1 request emission.

use std::{
    fmt,
    io::{self, Write},
};

/// Request methods used by the Web API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request body and its media type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Body<'a> {
    pub content_type: &'a str,
    pub content: &'a [u8],
}

impl<'a> Body<'a> {
    pub const JSON: &'static str = "application/json";
    pub const FORM: &'static str = "application/x-www-form-urlencoded";

    #[must_use]
    pub fn json(content: &'a str) -> Self {
        Self {
            content_type: Self::JSON,
            content: content.as_bytes(),
        }
    }

    #[must_use]
    pub fn form(content: &'a str) -> Self {
        Self {
            content_type: Self::FORM,
            content: content.as_bytes(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::json("")
    }
}

/// A request that borrows all of its parts.
///
/// Nothing is allocated: the request is written straight to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    pub host: &'a str,
    pub path: &'a str,
    pub authorization: Option<&'a str>,
    pub accept: Option<&'a str>,
    pub body: Option<Body<'a>>,
}

impl<'a> Request<'a> {
    #[must_use]
    pub fn new(method: Method, host: &'a str, path: &'a str) -> Self {
        Self {
            method,
            host,
            path,
            authorization: None,
            accept: None,
            body: None,
        }
    }

    #[must_use]
    pub fn get(host: &'a str, path: &'a str) -> Self {
        Self::new(Method::Get, host, path)
    }

    #[must_use]
    pub fn put(host: &'a str, path: &'a str, body: Body<'a>) -> Self {
        Self::new(Method::Put, host, path).with_body(body)
    }

    #[must_use]
    pub fn post(host: &'a str, path: &'a str, body: Body<'a>) -> Self {
        Self::new(Method::Post, host, path).with_body(body)
    }

    #[must_use]
    pub fn with_authorization(mut self, authorization: &'a str) -> Self {
        self.authorization = Some(authorization);
        self
    }

    #[must_use]
    pub fn with_accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Body<'a>) -> Self {
        self.body = Some(body);
        self
    }

    /// Writes the request line, headers and body.
    ///
    /// Headers are emitted in a fixed order: `Host`, `User-Agent`,
    /// `Accept`, `Content-Type`, `Authorization`, `Cache-Control`,
    /// `Connection`, `Content-Length`. Requests with a body always carry a
    /// `Content-Length`, also when the body is empty.
    pub fn write_to<W>(&self, writer: &mut W, user_agent: Option<&str>) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        write!(writer, "{} {} HTTP/1.1\r\n", self.method, self.path)?;
        write!(writer, "Host: {}\r\n", self.host)?;

        if let Some(user_agent) = user_agent {
            write!(writer, "User-Agent: {user_agent}\r\n")?;
        }
        if let Some(accept) = self.accept {
            write!(writer, "Accept: {accept}\r\n")?;
        }
        if let Some(body) = self.body {
            write!(writer, "Content-Type: {}\r\n", body.content_type)?;
        }
        if let Some(authorization) = self.authorization {
            write!(writer, "Authorization: {authorization}\r\n")?;
        }

        writer.write_all(b"Cache-Control: no-cache\r\n")?;
        writer.write_all(b"Connection: close\r\n")?;

        match self.body {
            Some(body) => {
                write!(writer, "Content-Length: {}\r\n\r\n", body.content.len())?;
                writer.write_all(body.content)?;
            }
            None => writer.write_all(b"\r\n")?,
        }

        writer.flush()
    }
}
