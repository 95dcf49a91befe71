//! Typed views of the Plex Media Server JSON payloads
//!
//! Only the fields the monitor needs are modelled; everything else in the
//! server's responses is ignored by serde.

use serde::{Deserialize, Serialize};

/// Top-level wrapper every Plex JSON response is enclosed in
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

/// `GET /identity`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub machine_identifier: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DirectoryContainer {
    #[serde(rename = "Directory", default)]
    pub directory: Vec<LibrarySection>,
}

/// A media item as returned by the sessions and library endpoints
///
/// The same shape describes a playing session (with `sessionKey`, `Player`
/// and `User` set) and a library item (with `addedAt` and `Image` set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub rating_key: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_title: Option<String>,
    #[serde(default)]
    pub grandparent_title: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub parent_thumb: Option<String>,
    #[serde(default)]
    pub grandparent_thumb: Option<String>,
    #[serde(default)]
    pub art: Option<String>,
    #[serde(default)]
    pub added_at: Option<i64>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(rename = "Image", default)]
    pub images: Vec<Image>,
    #[serde(rename = "Player", default)]
    pub player: Option<Player>,
    #[serde(rename = "User", default)]
    pub user: Option<User>,
}

impl Metadata {
    /// Human readable title, prefixed with the show/artist or season/album name
    pub fn display_title(&self) -> String {
        if let Some(grandparent) = non_empty(&self.grandparent_title) {
            return format!("{} - {}", grandparent, self.title);
        }

        match self.kind.as_deref() {
            Some("season") | Some("album") => match non_empty(&self.parent_title) {
                Some(parent) => format!("{} - {}", parent, self.title),
                None => self.title.clone(),
            },
            _ => self.title.clone(),
        }
    }

    /// Path of the best thumbnail for this item
    pub fn thumb_path(&self) -> Option<&str> {
        non_empty(&self.thumb)
            .or_else(|| non_empty(&self.parent_thumb))
            .or_else(|| non_empty(&self.grandparent_thumb))
    }

    /// Path of the structured "coverPoster" image, if the server provided one
    pub fn cover_poster_path(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|image| image.kind == "coverPoster")
            .map(|image| image.url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Path of the artwork used for "recently added" announcements
    pub fn poster_path(&self) -> Option<&str> {
        self.cover_poster_path().or_else(|| non_empty(&self.art))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Structured image reference attached to library items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Playback client of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub machine_identifier: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Account watching a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// A library section (`GET /library/sections`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySection {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One push notification received over the notification WebSocket
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "PlaySessionStateNotification", default)]
    pub play_session_states: Vec<PlaySessionState>,
}

impl Notification {
    /// Build a `playing` notification, mostly useful for tests and replay tools
    pub fn playing(states: Vec<PlaySessionState>) -> Self {
        Self {
            kind: "playing".to_string(),
            play_session_states: states,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.kind == "playing"
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationEnvelope {
    #[serde(rename = "NotificationContainer")]
    pub container: Notification,
}

/// Playback state change of one session
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySessionState {
    pub session_key: String,
    /// Media key (e.g. `/library/metadata/1234`)
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub rating_key: Option<String>,
    #[serde(default)]
    pub client_identifier: Option<String>,
    pub state: String,
    #[serde(default)]
    pub view_offset: Option<i64>,
}

impl PlaySessionState {
    pub fn new(session_key: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            state: state.into(),
            ..Default::default()
        }
    }
}
