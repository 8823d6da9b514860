//! Album art download.
//!
//! Images are streamed straight from the socket into a caller-supplied
//! [`Write`] sink in small chunks, so an image never has to fit in memory.

use std::io::Write;

use crate::{
    client::Client,
    clock::Clock,
    error::{Error, Result},
    http::{status_error, Framing, Request},
    transport::Transport,
};

/// `Accept` header sent for images.
pub const IMAGE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const HTTPS_PREFIX: &str = "https://";

/// Splits an `https://` URL into host and path.
///
/// The host ends at the first `/` after the scheme; without one, the path
/// is `/`.
///
/// ```rust
/// use tinyspot::image::split_https_url;
///
/// let (host, path) = split_https_url("https://i.scdn.co/image/ab67").unwrap();
/// assert_eq!((host, path), ("i.scdn.co", "/image/ab67"));
/// ```
///
/// # Errors
///
/// Returns `InvalidArgument` if `url` does not start with `https://` or has
/// no host.
pub fn split_https_url(url: &str) -> Result<(&str, &str)> {
    let Some(rest) = url.strip_prefix(HTTPS_PREFIX) else {
        return Err(Error::invalid_argument(format!(
            "only https URLs are supported: {url}"
        )));
    };

    let (host, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, "/"),
    };

    if host.is_empty() {
        return Err(Error::invalid_argument(format!("URL has no host: {url}")));
    }

    Ok((host, path))
}

impl<T: Transport, C: Clock> Client<T, C> {
    /// Downloads the image at `image_url` into `sink`.
    ///
    /// No authorization is sent. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * `image_url` is not an `https://` URL (nothing is sent)
    /// * The connection fails or the status is not 200
    /// * The response announces no body (`DataLoss`)
    /// * Reading the body or writing the sink fails
    pub fn get_image<W>(&mut self, image_url: &str, sink: &mut W) -> Result<u64>
    where
        W: Write + ?Sized,
    {
        let (host, path) = split_https_url(image_url)?;
        debug!("downloading image from {host}{path}");

        let request = Request::get(host, path).with_accept(IMAGE_ACCEPT);
        let mut response = self.http.execute(&request)?;

        if response.status() != 200 {
            return Err(status_error(&mut response, "image"));
        }

        match response.framing() {
            Framing::Length(0) => return Err(Error::data_loss("image has no content")),
            Framing::UntilClose => {
                return Err(Error::data_loss("image has unknown content length"));
            }
            Framing::Length(_) | Framing::Chunked => {}
        }

        let written = response.stream_to(sink)?;
        if let Some(expected) = response.content_length().filter(|&len| len != written) {
            warn!("image truncated: received {written} of {expected} bytes");
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("https://i.scdn.co/image/ab67", "i.scdn.co", "/image/ab67")]
    #[case("https://i.scdn.co", "i.scdn.co", "/")]
    #[case("https://host/", "host", "/")]
    fn urls_split_at_first_slash(#[case] url: &str, #[case] host: &str, #[case] path: &str) {
        assert_eq!(split_https_url(url).unwrap(), (host, path));
    }

    #[rstest]
    #[case("http://i.scdn.co/image/ab67")]
    #[case("ftp://i.scdn.co/")]
    #[case("https:///path")]
    #[case("")]
    fn unsupported_urls_are_rejected(#[case] url: &str) {
        assert_eq!(
            split_https_url(url).unwrap_err().kind,
            ErrorKind::InvalidArgument
        );
    }
}
