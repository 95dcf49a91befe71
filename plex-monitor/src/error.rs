//! Error types for the plex-monitor crate.

use plex_client::PlexError;

/// Errors raised while establishing the connection to the server.
///
/// Any of these marks the server unavailable; the next poll tick retries.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The server rejected the access token
    #[error("Unauthorized: the server rejected the access token")]
    Unauthorized,

    /// The server could not be reached
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// The server answered, but it is not the one this monitor is bound to
    #[error("Identity mismatch: expected machine {expected}, found {actual}")]
    IdentityMismatch {
        /// Configured machine identifier
        expected: String,
        /// Machine identifier reported by the server
        actual: String,
    },

    /// Anything else that went wrong during the handshake
    #[error("Connection protocol error: {0}")]
    Protocol(String),
}

impl From<PlexError> for ConnectionError {
    fn from(err: PlexError) -> Self {
        match err {
            PlexError::Unauthorized => ConnectionError::Unauthorized,
            PlexError::Network(_) | PlexError::Timeout => {
                ConnectionError::Unreachable(err.to_string())
            }
            other => ConnectionError::Protocol(other.to_string()),
        }
    }
}

/// Errors from on-demand queries against a connected server.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Not connected to the server")]
    NotConnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Request failed: {0}")]
    Failed(#[from] PlexError),
}

/// Errors while building an artwork URL.
#[derive(Debug, thiserror::Error)]
pub enum ArtworkError {
    #[error("Item has no artwork")]
    MissingArtwork,

    #[error("Invalid artwork URL: {0}")]
    InvalidUrl(String),
}

/// Errors from the watermark store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Watermark I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watermark file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No data directory available for the watermark file")]
    NoDataDir,
}

/// Errors from an event emitter.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The receiving side of the event channel is gone
    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Event dispatch failed: {0}")]
    Dispatch(String),
}

/// Invalid monitor or server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Umbrella error of the monitor facade.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Artwork(#[from] ArtworkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] PlexError),

    #[error("Monitor has been shut down")]
    ShutDown,
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
