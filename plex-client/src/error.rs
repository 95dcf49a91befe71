//! Error types for the Plex client

use thiserror::Error;

/// Errors that can occur while talking to a Plex Media Server
#[derive(Debug, Error)]
pub enum PlexError {
    /// Network or HTTP transport error (connection refused, DNS, TLS, ...)
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The server rejected the token
    #[error("Unauthorized: the server rejected the access token")]
    Unauthorized,

    /// The server answered with a non-success status code
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be decoded
    #[error("Response parsing error: {0}")]
    Parse(String),

    /// A URL could not be built from the configured base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The notification WebSocket failed
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl PlexError {
    /// Whether the error means the server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PlexError::Network(_) | PlexError::Timeout)
    }
}

impl From<reqwest::Error> for PlexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlexError::Timeout
        } else if err.is_decode() {
            PlexError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                PlexError::Unauthorized
            } else {
                PlexError::Status {
                    status: status.as_u16(),
                    url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                }
            }
        } else {
            PlexError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for PlexError {
    fn from(err: url::ParseError) -> Self {
        PlexError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for PlexError {
    fn from(err: serde_json::Error) -> Self {
        PlexError::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PlexError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::Http(response) if response.status().as_u16() == 401 => {
                PlexError::Unauthorized
            }
            WsError::Io(io) => PlexError::Network(io.to_string()),
            other => PlexError::WebSocket(other.to_string()),
        }
    }
}

/// Result type for Plex client operations
pub type Result<T> = std::result::Result<T, PlexError>;
