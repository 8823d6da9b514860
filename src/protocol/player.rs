//! Player endpoint response types.
//!
//! Only the fields tinyspot exposes are declared; serde skips the rest.
//! Every field is optional: the API leaves out or nulls fields depending on
//! the kind of item playing (tracks, episodes, ads) and on the device.
//!
//! # Example Response
//!
//! `GET /v1/me/player/currently-playing`:
//!
//! ```json
//! {
//!     "is_playing": true,
//!     "progress_ms": 12345,
//!     "item": {
//!         "name": "Song",
//!         "uri": "spotify:track:...",
//!         "duration_ms": 210000,
//!         "album": {
//!             "name": "Album",
//!             "uri": "spotify:album:...",
//!             "artists": [{ "name": "Artist", "uri": "spotify:artist:..." }],
//!             "images": [{ "url": "https://i.scdn.co/image/...", "width": 640 }]
//!         }
//!     }
//! }
//! ```

use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CurrentlyPlaying {
    pub is_playing: Option<bool>,
    pub progress_ms: Option<u64>,
    pub item: Option<Item>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub duration_ms: Option<u64>,
    pub album: Option<Album>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Album {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub artists: Option<Vec<Artist>>,
    pub images: Option<Vec<Image>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Artist {
    pub name: Option<String>,
    pub uri: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

/// `GET /v1/me/player`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PlaybackState {
    pub device: Option<Device>,
    pub progress_ms: Option<u64>,
    pub is_playing: Option<bool>,
    pub shuffle_state: Option<bool>,
    pub repeat_state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_active: Option<bool>,
    pub is_private_session: Option<bool>,
    pub is_restricted: Option<bool>,
    pub volume_percent: Option<u32>,
}

/// `GET /v1/me/player/devices`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Devices {
    pub devices: Option<Vec<Device>>,
}

impl Item {
    /// The album's first artist, which the API lists as the main one.
    #[must_use]
    pub fn first_artist(&self) -> Option<&Artist> {
        self.album.as_ref()?.artists.as_ref()?.first()
    }

    /// The album's first image, the largest one.
    #[must_use]
    pub fn first_image(&self) -> Option<&Image> {
        self.album.as_ref()?.images.as_ref()?.first()
    }
}
