//! Private client for Plex Media Server communication
//!
//! This crate provides a small typed client for the parts of the Plex HTTP
//! API that plex-monitor relies on (identity, sessions, recently added items,
//! library sections and refreshes) plus the push notification WebSocket.

mod client;
mod error;
mod notifications;
pub mod types;

pub use client::{ClientConfig, PlexClient};
pub use error::{PlexError, Result};
pub use notifications::{parse_notification, NotificationStream};
pub use types::{
    Identity, Image, LibrarySection, Metadata, Notification, PlaySessionState, Player, User,
};
