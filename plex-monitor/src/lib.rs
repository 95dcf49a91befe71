//! # plex-monitor
//!
//! Watches one Plex Media Server and turns its push notifications and library
//! listings into deduplicated, ordered events: playback started, paused and
//! stopped, and new items added to the library.
//!
//! Playback notifications arrive unordered and duplicated over the server's
//! WebSocket; the [`SessionTracker`] keeps the last accepted state of every
//! session and announces each real change exactly once. The library is
//! polled on a fixed interval; the [`LibraryChangeDetector`] compares the
//! newest `addedAt` against a persisted watermark and announces new items
//! oldest first, spaced out in time.
//!
//! [`PlexMonitor`] wires everything together:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plex_monitor::prelude::*;
//!
//! let (emitter, mut events) = ChannelEmitter::new();
//! let monitor = PlexMonitor::for_server(
//!     &ServerConfig::from_env()?,
//!     MonitorConfig::default(),
//!     Arc::new(emitter),
//! )?;
//! monitor.start()?;
//! ```

mod cache;
pub mod config;
pub mod connection;
pub mod emitter;
pub mod error;
pub mod event;
pub mod library;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod watermark;

pub use cache::TtlCache;
pub use config::{MonitorConfig, ServerConfig};
pub use connection::{ConnectionManager, MediaServer, NotificationFeed, NotificationHandler};
pub use emitter::{ChannelEmitter, EventEmitter, TracingEmitter};
pub use error::{
    ArtworkError, ConfigError, ConnectionError, EmitError, MonitorError, RequestError, Result,
    StoreError,
};
pub use event::{ItemAdded, MonitorEvent, PlayerPause, PlayerStart, PlayerStop};
pub use library::{detect, CheckOutcome, Detection, LibraryChangeDetector};
pub use model::{PlaybackState, SessionEventKind, SessionKey, SessionState};
pub use monitor::{PlexMonitor, RecentItem};
pub use poller::{Availability, PollOutcome, Poller};
pub use scheduler::Scheduler;
pub use server::PlexServer;
pub use session::{NotificationOutcome, SessionTracker};
pub use watermark::{JsonFileWatermarkStore, MemoryWatermarkStore, Watermark, WatermarkStore};

pub use plex_client;

/// The types most hosts need
pub mod prelude {
    pub use crate::{
        Availability, ChannelEmitter, EventEmitter, MonitorConfig, MonitorError, MonitorEvent,
        PlexMonitor, ServerConfig, TracingEmitter,
    };
}
