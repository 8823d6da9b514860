//! Playback commands.
//!
//! Every command builds its endpoint path in a local [`Path`] buffer,
//! optionally qualifies it with a device id and sends it through the
//! client's refresh gate. The Web API answers a successful command with
//! `204 No Content`; any other status fails the command.
//!
//! Commands take `device_id: Option<&str>`. `None` and `Some("")` both
//! address the active device.

use url::form_urlencoded;

use crate::{
    bounded::{push_exact, push_fmt, BoundedString},
    client::Client,
    clock::Clock,
    error::{Error, Result},
    http::{Body, Method},
    playback::RepeatMode,
    transport::Transport,
};

pub const PLAYER_ENDPOINT: &str = "/v1/me/player";
pub const PLAY_ENDPOINT: &str = "/v1/me/player/play";
pub const PAUSE_ENDPOINT: &str = "/v1/me/player/pause";
pub const NEXT_ENDPOINT: &str = "/v1/me/player/next";
pub const PREVIOUS_ENDPOINT: &str = "/v1/me/player/previous";
pub const SEEK_ENDPOINT: &str = "/v1/me/player/seek";
pub const VOLUME_ENDPOINT: &str = "/v1/me/player/volume";
pub const SHUFFLE_ENDPOINT: &str = "/v1/me/player/shuffle";
pub const REPEAT_ENDPOINT: &str = "/v1/me/player/repeat";
pub const CURRENTLY_PLAYING_ENDPOINT: &str = "/v1/me/player/currently-playing";
pub const DEVICES_ENDPOINT: &str = "/v1/me/player/devices";

/// Query parameter that selects the target device.
pub const DEVICE_ID_PARAM: &str = "deviceId";

/// Capacity of request paths, query included.
pub const PATH_CAPACITY: usize = 128;

/// A request path.
pub type Path = BoundedString<PATH_CAPACITY>;

/// Appends the device qualifier to `path`.
///
/// The parameter is joined with `&` if `path` already has a query and with
/// `?` otherwise. Nothing is appended for `None` or an empty id.
///
/// # Errors
///
/// Returns `OutOfRange` if the result does not fit; `path` may then hold a
/// partial qualifier and must be discarded.
pub fn append_device(path: &mut Path, device_id: Option<&str>) -> Result<()> {
    let Some(device_id) = device_id.filter(|id| !id.is_empty()) else {
        return Ok(());
    };

    let separator = if path.contains('?') { '&' } else { '?' };
    push_fmt(path, format_args!("{separator}{DEVICE_ID_PARAM}="))?;
    for part in form_urlencoded::byte_serialize(device_id.as_bytes()) {
        push_exact(path, part)?;
    }
    Ok(())
}

/// Builds `endpoint` with the device qualifier.
///
/// # Errors
///
/// Returns `OutOfRange` if the path does not fit.
pub fn with_device(endpoint: &str, device_id: Option<&str>) -> Result<Path> {
    let mut path = Path::new();
    push_exact(&mut path, endpoint)?;
    append_device(&mut path, device_id)?;
    Ok(path)
}

impl<T: Transport, C: Clock> Client<T, C> {
    /// Resumes playback.
    pub fn play(&mut self, device_id: Option<&str>) -> Result<()> {
        let path = with_device(PLAY_ENDPOINT, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "play")
    }

    /// Starts playback with a JSON body, for example
    /// `{"context_uri":"spotify:album:..."}` or `{"uris":["spotify:track:..."]}`.
    pub fn play_with_body(&mut self, body: &str, device_id: Option<&str>) -> Result<()> {
        let path = with_device(PLAY_ENDPOINT, device_id)?;
        self.command(Method::Put, &path, Body::json(body), "play")
    }

    pub fn pause(&mut self, device_id: Option<&str>) -> Result<()> {
        let path = with_device(PAUSE_ENDPOINT, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "pause")
    }

    pub fn next_track(&mut self, device_id: Option<&str>) -> Result<()> {
        let path = with_device(NEXT_ENDPOINT, device_id)?;
        self.command(Method::Post, &path, Body::empty(), "next track")
    }

    pub fn previous_track(&mut self, device_id: Option<&str>) -> Result<()> {
        let path = with_device(PREVIOUS_ENDPOINT, device_id)?;
        self.command(Method::Post, &path, Body::empty(), "previous track")
    }

    /// Seeks to `position_ms` in the current item.
    pub fn seek(&mut self, position_ms: u64, device_id: Option<&str>) -> Result<()> {
        let mut path = Path::new();
        push_fmt(&mut path, format_args!("{SEEK_ENDPOINT}?position_ms={position_ms}"))?;
        append_device(&mut path, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "seek")
    }

    /// Sets the volume in percent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without sending anything if `volume` is
    /// above 100.
    pub fn set_volume(&mut self, volume: u8, device_id: Option<&str>) -> Result<()> {
        if volume > 100 {
            return Err(Error::invalid_argument(format!(
                "volume should be between 0 and 100 but is {volume}"
            )));
        }

        let mut path = Path::new();
        push_fmt(&mut path, format_args!("{VOLUME_ENDPOINT}?volume_percent={volume}"))?;
        append_device(&mut path, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "set volume")
    }

    pub fn set_shuffle(&mut self, shuffle: bool, device_id: Option<&str>) -> Result<()> {
        let mut path = Path::new();
        push_fmt(&mut path, format_args!("{SHUFFLE_ENDPOINT}?state={shuffle}"))?;
        append_device(&mut path, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "set shuffle")
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode, device_id: Option<&str>) -> Result<()> {
        let mut path = Path::new();
        push_fmt(&mut path, format_args!("{REPEAT_ENDPOINT}?state={mode}"))?;
        append_device(&mut path, device_id)?;
        self.command(Method::Put, &path, Body::empty(), "set repeat mode")
    }
}
