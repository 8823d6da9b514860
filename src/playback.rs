//! Playback state as handed to callers.
//!
//! The types here have a fixed layout: every string is a
//! [`BoundedString`] whose capacity matches what a small display or
//! controller can hold. They are filled from the [`protocol::player`] wire
//! types, truncating over-long strings and defaulting absent fields to
//! empty, zero or `false`.
//!
//! The queries themselves are methods on [`Client`]:
//!
//! * [`Client::get_currently_playing`] - the item playing and its progress
//! * [`Client::get_player_details`] - device, shuffle and repeat state
//! * [`Client::first_device`] and [`Client::devices`] - available devices

use std::{fmt, str::FromStr};

use crate::{
    bounded::{push_exact, push_fmt, truncated, BoundedString},
    client::Client,
    clock::Clock,
    config::market_code,
    error::{Error, Result},
    player::{Path, CURRENTLY_PLAYING_ENDPOINT, DEVICES_ENDPOINT, PLAYER_ENDPOINT},
    protocol::player as wire,
    transport::Transport,
};

/// Capacity of names and URIs.
pub const NAME_CAPACITY: usize = 63;

/// Capacity of image URLs.
pub const IMAGE_URL_CAPACITY: usize = 64;

/// Capacity of device ids and names.
pub const DEVICE_ID_CAPACITY: usize = 40;

/// Capacity of device types.
pub const DEVICE_TYPE_CAPACITY: usize = 19;

/// Most devices returned by [`Client::devices`].
pub const MAX_DEVICES: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepeatMode {
    Track,
    Context,
    #[default]
    Off,
}

impl RepeatMode {
    /// The value of the `state` query parameter and of `repeat_state`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Context => "context",
            Self::Off => "off",
        }
    }

    /// Interprets a `repeat_state`; anything unknown is `Off`.
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        state.parse().unwrap_or_default()
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "track" => Ok(Self::Track),
            "context" => Ok(Self::Context),
            "off" => Ok(Self::Off),
            _ => Err(Error::invalid_argument(format!("unknown repeat mode: {s}"))),
        }
    }
}

/// The item playing on the active device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrentlyPlaying {
    pub first_artist_name: BoundedString<NAME_CAPACITY>,
    pub first_artist_uri: BoundedString<NAME_CAPACITY>,
    pub album_name: BoundedString<NAME_CAPACITY>,
    pub album_uri: BoundedString<NAME_CAPACITY>,
    pub track_name: BoundedString<NAME_CAPACITY>,
    pub track_uri: BoundedString<NAME_CAPACITY>,
    pub image_url: BoundedString<IMAGE_URL_CAPACITY>,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Device {
    pub id: BoundedString<DEVICE_ID_CAPACITY>,
    pub name: BoundedString<DEVICE_ID_CAPACITY>,
    pub kind: BoundedString<DEVICE_TYPE_CAPACITY>,
    pub is_active: bool,
    pub is_restricted: bool,
    pub is_private_session: bool,
    pub volume_percent: u32,
}

/// The state of the player on the active device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerDetails {
    pub device: Device,
    pub progress_ms: u64,
    pub is_playing: bool,
    pub shuffle_state: bool,
    pub repeat_state: RepeatMode,
}

fn text<const N: usize>(value: Option<&String>) -> BoundedString<N> {
    truncated(value.map_or("", String::as_str))
}

impl From<&wire::CurrentlyPlaying> for CurrentlyPlaying {
    fn from(playing: &wire::CurrentlyPlaying) -> Self {
        let item = playing.item.as_ref();
        let album = item.and_then(|item| item.album.as_ref());
        let artist = item.and_then(wire::Item::first_artist);
        let image = item.and_then(wire::Item::first_image);

        Self {
            first_artist_name: text(artist.and_then(|a| a.name.as_ref())),
            first_artist_uri: text(artist.and_then(|a| a.uri.as_ref())),
            album_name: text(album.and_then(|a| a.name.as_ref())),
            album_uri: text(album.and_then(|a| a.uri.as_ref())),
            track_name: text(item.and_then(|i| i.name.as_ref())),
            track_uri: text(item.and_then(|i| i.uri.as_ref())),
            image_url: text(image.and_then(|i| i.url.as_ref())),
            is_playing: playing.is_playing.unwrap_or_default(),
            progress_ms: playing.progress_ms.unwrap_or_default(),
            duration_ms: item.and_then(|i| i.duration_ms).unwrap_or_default(),
        }
    }
}

impl From<&wire::Device> for Device {
    fn from(device: &wire::Device) -> Self {
        Self {
            id: text(device.id.as_ref()),
            name: text(device.name.as_ref()),
            kind: text(device.kind.as_ref()),
            is_active: device.is_active.unwrap_or_default(),
            is_restricted: device.is_restricted.unwrap_or_default(),
            is_private_session: device.is_private_session.unwrap_or_default(),
            volume_percent: device.volume_percent.unwrap_or_default(),
        }
    }
}

impl From<&wire::PlaybackState> for PlayerDetails {
    fn from(state: &wire::PlaybackState) -> Self {
        Self {
            device: state.device.as_ref().map(Device::from).unwrap_or_default(),
            progress_ms: state.progress_ms.unwrap_or_default(),
            is_playing: state.is_playing.unwrap_or_default(),
            shuffle_state: state.shuffle_state.unwrap_or_default(),
            repeat_state: state
                .repeat_state
                .as_deref()
                .map(RepeatMode::from_state)
                .unwrap_or_default(),
        }
    }
}

/// Appends `?market=<code>` to `path` when a market is given.
///
/// The market must be a two letter country code, as for
/// [`Config::set_market`](crate::config::Config::set_market).
fn with_market(endpoint: &str, market: Option<&str>) -> Result<Path> {
    let mut path = Path::new();
    push_exact(&mut path, endpoint)?;
    if let Some(market) = market.filter(|m| !m.is_empty()) {
        let market = market_code(market)?;
        push_fmt(&mut path, format_args!("?market={market}"))?;
    }
    Ok(path)
}

impl<T: Transport, C: Clock> Client<T, C> {
    /// Fetches the item playing on the active device.
    ///
    /// `market` overrides [`Config::market`](crate::config::Config::market).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * The refresh gate or the request fails
    /// * Nothing is playing (`NotFound`, from `204 No Content`)
    /// * The body does not decode
    pub fn get_currently_playing(&mut self, market: Option<&str>) -> Result<CurrentlyPlaying> {
        let market = market.or(self.config.market.as_deref());
        let path = with_market(CURRENTLY_PLAYING_ENDPOINT, market)?;

        let playing: wire::CurrentlyPlaying = self.fetch(&path, "currently playing")?;
        Ok(CurrentlyPlaying::from(&playing))
    }

    /// Fetches the state of the player on the active device.
    ///
    /// # Errors
    ///
    /// As for [`Client::get_currently_playing`].
    pub fn get_player_details(&mut self, market: Option<&str>) -> Result<PlayerDetails> {
        let market = market.or(self.config.market.as_deref());
        let path = with_market(PLAYER_ENDPOINT, market)?;

        let state: wire::PlaybackState = self.fetch(&path, "player details")?;
        Ok(PlayerDetails::from(&state))
    }

    /// Fetches the first device of the device list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the list is empty, or any error of the request.
    pub fn first_device(&mut self) -> Result<Device> {
        let devices: wire::Devices = self.fetch(DEVICES_ENDPOINT, "devices")?;
        devices
            .devices
            .as_deref()
            .and_then(<[wire::Device]>::first)
            .map(Device::from)
            .ok_or_else(|| Error::not_found("no devices available"))
    }

    /// Fetches up to [`MAX_DEVICES`] devices, in the order the API lists
    /// them.
    ///
    /// # Errors
    ///
    /// Returns any error of the request. An empty list is not an error.
    pub fn devices(&mut self) -> Result<heapless::Vec<Device, MAX_DEVICES>> {
        let devices: wire::Devices = self.fetch(DEVICES_ENDPOINT, "devices")?;
        let devices = devices.devices.unwrap_or_default();
        if devices.len() > MAX_DEVICES {
            debug!("ignoring {} devices", devices.len() - MAX_DEVICES);
        }

        Ok(devices.iter().take(MAX_DEVICES).map(Device::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("track", RepeatMode::Track)]
    #[case("context", RepeatMode::Context)]
    #[case("off", RepeatMode::Off)]
    #[case("", RepeatMode::Off)]
    #[case("TRACK", RepeatMode::Off)]
    fn repeat_states(#[case] state: &str, #[case] expected: RepeatMode) {
        assert_eq!(RepeatMode::from_state(state), expected);
    }

    #[test]
    fn repeat_mode_round_trips_through_text() {
        for mode in [RepeatMode::Track, RepeatMode::Context, RepeatMode::Off] {
            assert_eq!(mode.as_str().parse::<RepeatMode>().unwrap(), mode);
        }
        assert!("all".parse::<RepeatMode>().is_err());
    }

    #[test]
    fn absent_fields_default() {
        let playing = CurrentlyPlaying::from(&wire::CurrentlyPlaying::default());
        assert_eq!(playing, CurrentlyPlaying::default());

        let details = PlayerDetails::from(&wire::PlaybackState::default());
        assert_eq!(details.repeat_state, RepeatMode::Off);
        assert!(details.device.id.is_empty());
    }

    #[test]
    fn long_names_are_truncated() {
        let wire = wire::CurrentlyPlaying {
            item: Some(wire::Item {
                name: Some("x".repeat(100)),
                ..wire::Item::default()
            }),
            ..wire::CurrentlyPlaying::default()
        };
        let playing = CurrentlyPlaying::from(&wire);
        assert_eq!(playing.track_name.len(), NAME_CAPACITY);
    }

    #[test]
    fn market_is_appended() {
        assert_eq!(
            with_market(PLAYER_ENDPOINT, Some("SE")).unwrap().as_str(),
            "/v1/me/player?market=SE"
        );
        assert_eq!(
            with_market(PLAYER_ENDPOINT, Some("")).unwrap().as_str(),
            "/v1/me/player"
        );
        assert_eq!(
            with_market(PLAYER_ENDPOINT, Some("de")).unwrap().as_str(),
            "/v1/me/player?market=DE"
        );
    }

    #[rstest]
    #[case("S&E")]
    #[case("S&")]
    #[case("SWE")]
    #[case("1E")]
    fn malformed_markets_are_rejected(#[case] market: &str) {
        let err = with_market(CURRENTLY_PLAYING_ENDPOINT, Some(market)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }
}
