//! Push notification WebSocket

use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::types::{Notification, NotificationEnvelope};
use crate::{PlexError, Result};

/// Messages larger than this are dropped without being parsed
const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Live notification feed of one server
///
/// Yields one [`Notification`] per JSON message. Control frames are handled
/// internally; the stream ends when the server closes the socket.
///
/// After `keepalive` without any inbound frame a Ping is sent. If the next
/// `keepalive` passes without a frame as well, the socket is considered dead
/// and [`PlexError::WebSocket`] is returned.
pub struct NotificationStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    keepalive: Duration,
    awaiting_pong: bool,
}

impl NotificationStream {
    pub(crate) async fn connect(
        url: Url,
        connect_timeout: Duration,
        keepalive: Duration,
    ) -> Result<Self> {
        tracing::debug!(host = ?url.host_str(), "Opening notification socket");
        let (socket, _response) =
            tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| PlexError::Timeout)??;
        Ok(Self {
            socket,
            keepalive,
            awaiting_pong: false,
        })
    }

    /// Wait for the next notification
    ///
    /// Returns `None` once the socket is closed.
    pub async fn next(&mut self) -> Option<Result<Notification>> {
        loop {
            let message = match tokio::time::timeout(self.keepalive, self.socket.next()).await {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(e))) => return Some(Err(e.into())),
                Ok(None) => return None,
                Err(_) if self.awaiting_pong => {
                    tracing::warn!(keepalive = ?self.keepalive, "Notification socket went silent");
                    return Some(Err(PlexError::WebSocket(
                        "no answer to keepalive ping".to_string(),
                    )));
                }
                Err(_) => {
                    tracing::trace!("Sending keepalive ping");
                    if let Err(e) = self.socket.send(Message::Ping(Vec::new())).await {
                        return Some(Err(e.into()));
                    }
                    self.awaiting_pong = true;
                    continue;
                }
            };
            self.awaiting_pong = false;

            if message.len() > MAX_MESSAGE_SIZE {
                tracing::warn!(size = message.len(), "Ignoring oversized notification");
                continue;
            }

            match message {
                Message::Text(text) => return Some(parse_notification(&text)),
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => return Some(parse_notification(text)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring non UTF-8 binary notification");
                    }
                },
                Message::Close(frame) => {
                    tracing::debug!(?frame, "Notification socket closed by server");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    tracing::trace!("Control frame on notification socket");
                }
            }
        }
    }

    /// Turn the feed into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<Notification>> + Send + 'static {
        futures::stream::unfold(self, |mut feed| async move {
            feed.next().await.map(|item| (item, feed))
        })
    }
}

/// Parse one notification message body
pub fn parse_notification(text: &str) -> Result<Notification> {
    let envelope: NotificationEnvelope = serde_json::from_str(text)?;
    Ok(envelope.container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playing_notification() {
        let text = r#"{"NotificationContainer":{"type":"playing","size":1,
            "PlaySessionStateNotification":[{"sessionKey":"3","key":"/library/metadata/9","state":"buffering"}]}}"#;

        let notification = parse_notification(text).unwrap();
        assert!(notification.is_playing());
        assert_eq!(notification.play_session_states[0].state, "buffering");
    }

    #[test]
    fn test_parse_rejects_unknown_envelope() {
        let result = parse_notification(r#"{"type":"playing"}"#);
        assert!(matches!(result, Err(PlexError::Parse(_))));
    }
}
