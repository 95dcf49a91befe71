//! Events handed to the host's trigger dispatch

use serde::Serialize;

/// A playback session started (or resumed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStart {
    pub player_title: String,
    pub player_id: String,
    pub media_title: String,
    /// Absolute URL of the media thumbnail, `None` when it could not be resolved
    pub media_image: Option<String>,
    pub user_title: String,
}

/// A playback session was paused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPause {
    pub player_title: String,
    pub player_id: String,
    pub media_title: String,
    pub user_title: String,
}

/// A playback session stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStop {
    pub player_title: String,
    pub player_id: String,
    pub media_title: String,
    pub user_title: String,
}

/// A new item appeared in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAdded {
    pub title: String,
    /// Absolute URL of the poster, `None` when it could not be resolved
    pub image: Option<String>,
    #[serde(skip)]
    pub added_at: i64,
}

/// Every event the monitor emits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "tokens", rename_all = "snake_case")]
pub enum MonitorEvent {
    PlayerStart(PlayerStart),
    PlayerPause(PlayerPause),
    PlayerStop(PlayerStop),
    #[serde(rename = "recently_added")]
    ItemAdded(ItemAdded),
}

impl MonitorEvent {
    /// Trigger name the host dispatches this event under
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::PlayerStart(_) => "player_start",
            MonitorEvent::PlayerPause(_) => "player_pause",
            MonitorEvent::PlayerStop(_) => "player_stop",
            MonitorEvent::ItemAdded(_) => "recently_added",
        }
    }

    pub fn is_session_event(&self) -> bool {
        !matches!(self, MonitorEvent::ItemAdded(_))
    }
}
