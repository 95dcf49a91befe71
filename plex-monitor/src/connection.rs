//! Connection manager: one live connection to one server
//!
//! The manager owns the push notification feed of a [`MediaServer`] and fans
//! every notification out to the registered [`NotificationHandler`]s from a
//! dedicated dispatch task. On-demand queries go through the same manager so
//! they share its connected state and request timeout.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use plex_client::{LibrarySection, Metadata, Notification, PlexError};
use tokio::task::JoinHandle;

use crate::error::{ArtworkError, ConnectionError, RequestError};
use crate::model::SessionKey;

/// Push notifications of one connection; ends when the connection drops
pub type NotificationFeed = BoxStream<'static, Result<Notification, RequestError>>;

/// Transport to a media server
///
/// [`PlexServer`](crate::PlexServer) is the HTTP/WebSocket implementation.
#[async_trait]
pub trait MediaServer: Send + Sync + 'static {
    /// Verify the server and open its notification feed
    async fn connect(&self) -> Result<NotificationFeed, ConnectionError>;

    /// Full description of an active session
    async fn session_detail(&self, session_key: &SessionKey) -> Result<Metadata, RequestError>;

    /// Recently added library items, newest first
    async fn recently_added(&self) -> Result<Vec<Metadata>, RequestError>;

    async fn library_sections(&self) -> Result<Vec<LibrarySection>, RequestError>;

    /// Scan a library section; `force` re-reads every file
    async fn refresh_library(&self, section_key: &str, force: bool) -> Result<(), RequestError>;

    /// Absolute URL of an artwork path, including the credential
    fn artwork_url(&self, path: &str) -> Result<String, ArtworkError>;
}

/// Listener for inbound notifications
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn on_notification(&self, notification: &Notification);
}

type Handlers = Arc<RwLock<Vec<Arc<dyn NotificationHandler>>>>;

pub struct ConnectionManager {
    server: Arc<dyn MediaServer>,
    request_timeout: Duration,
    connected: Arc<AtomicBool>,
    /// Incremented per connection so a stale dispatcher cannot flip the flag
    epoch: Arc<AtomicU64>,
    handlers: Handlers,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(server: Arc<dyn MediaServer>, request_timeout: Duration) -> Self {
        Self {
            server,
            request_timeout,
            connected: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            handlers: Arc::new(RwLock::new(Vec::new())),
            dispatcher: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Establish the connection and start delivering notifications
    ///
    /// A no-op while connected. Concurrent calls are serialized, so only
    /// one of them performs the handshake. A handshake that does not finish
    /// within the request timeout fails as unreachable.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let _guard = self.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let attempt = match tokio::time::timeout(self.request_timeout, self.server.connect()).await
        {
            Ok(attempt) => attempt,
            Err(_) => Err(ConnectionError::Unreachable(format!(
                "handshake did not complete within {:?}",
                self.request_timeout
            ))),
        };
        let feed = match attempt {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = %e, "Connection attempt failed");
                return Err(e);
            }
        };

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(dispatch(
            feed,
            Arc::clone(&self.handlers),
            Arc::clone(&self.connected),
            Arc::clone(&self.epoch),
            epoch,
        ));
        if let Some(previous) = self.dispatcher.lock().replace(handle) {
            previous.abort();
        }

        tracing::info!(epoch, "Connected to media server");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Register a listener; listeners are called in registration order
    pub fn on_notification(&self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Stop the dispatch task and mark the connection as down
    pub fn disconnect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("Disconnected from media server");
        }
    }

    pub async fn session_detail(&self, session_key: &SessionKey) -> Result<Metadata, RequestError> {
        self.query("session_detail", self.server.session_detail(session_key))
            .await
    }

    pub async fn recently_added(&self) -> Result<Vec<Metadata>, RequestError> {
        self.query("recently_added", self.server.recently_added()).await
    }

    pub async fn library_sections(&self) -> Result<Vec<LibrarySection>, RequestError> {
        self.query("library_sections", self.server.library_sections())
            .await
    }

    pub async fn refresh_library(&self, section_key: &str, force: bool) -> Result<(), RequestError> {
        self.query(
            "refresh_library",
            self.server.refresh_library(section_key, force),
        )
        .await
    }

    pub fn artwork_url(&self, path: &str) -> Result<String, ArtworkError> {
        self.server.artwork_url(path)
    }

    async fn query<T, F>(&self, name: &'static str, request: F) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, RequestError>>,
    {
        if !self.is_connected() {
            return Err(RequestError::NotConnected);
        }

        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::debug!(query = name, error = %e, "Query failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(query = name, timeout = ?self.request_timeout, "Query timed out");
                Err(RequestError::Timeout)
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.get_mut().take() {
            handle.abort();
        }
    }
}

/// Deliver each notification to every handler, strictly in arrival order
async fn dispatch(
    mut feed: NotificationFeed,
    handlers: Handlers,
    connected: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    own_epoch: u64,
) {
    while let Some(item) = feed.next().await {
        let notification = match item {
            Ok(notification) => notification,
            Err(RequestError::Failed(PlexError::Parse(e))) => {
                tracing::warn!(error = %e, "Skipping unreadable notification");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notification feed failed");
                break;
            }
        };

        let snapshot: Vec<Arc<dyn NotificationHandler>> = handlers.read().clone();
        for handler in snapshot {
            handler.on_notification(&notification).await;
        }
    }

    if epoch.load(Ordering::SeqCst) == own_epoch {
        connected.store(false, Ordering::SeqCst);
        tracing::info!("Notification feed ended; will reconnect on next poll");
    }
}
