//! # tinyspot
//!
//! A Spotify Web API playback controller for small devices.
//!
//! tinyspot keeps an OAuth2 access token fresh, sends playback commands
//! (play, pause, seek, volume, shuffle, repeat, next and previous) and
//! decodes the playback state into fixed-capacity structs that a display
//! or a physical controller can use directly. It speaks a minimal
//! HTTP/1.1 over any blocking byte stream, one request per connection.
//!
//! ## Modules
//!
//! * [`client`] - The API client and its refresh gate
//! * [`player`] - Playback commands
//! * [`playback`] - Playback queries and their result types
//! * [`image`] - Album art download
//! * [`session`] - Token lifecycle: code exchange and refresh
//! * [`http`] - Request emission and response parsing
//! * [`transport`] - Byte stream abstraction, TCP/TLS and scripted
//!
//! Supporting modules: [`bounded`], [`clock`], [`config`],
//! [`credentials`], [`error`], [`protocol`], [`tokens`].
//!
//! ## Memory
//!
//! Request paths, form bodies, headers and result strings all live in
//! [`heapless`] buffers of fixed capacity. Strings from the API that do
//! not fit are truncated on a character boundary; request parts that do
//! not fit are rejected.
//!
//! ## Features
//!
//! * `tls` (default) - HTTPS in [`transport::TcpTransport`] through rustls
//! * `binary` (default) - The `tinyspot` command line tool

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod bounded;
pub mod client;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod image;
pub mod playback;
pub mod player;
pub mod protocol;
pub mod session;
pub mod tokens;
pub mod transport;
