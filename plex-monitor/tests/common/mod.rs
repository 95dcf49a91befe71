//! Shared test fixtures: a scriptable in-memory media server

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;
use plex_monitor::plex_client::{
    Image, LibrarySection, Metadata, Notification, PlaySessionState, Player, PlexError, User,
};
use plex_monitor::{
    ArtworkError, ConnectionError, ConnectionManager, MediaServer, NotificationFeed, RequestError,
    SessionKey,
};

type FeedSender = mpsc::UnboundedSender<Result<Notification, RequestError>>;

#[derive(Default)]
pub struct MockServer {
    connect_failures: Mutex<VecDeque<ConnectionError>>,
    connect_hangs: AtomicUsize,
    feed: Mutex<Option<FeedSender>>,
    sessions: Mutex<HashMap<String, Metadata>>,
    detail_failures: Mutex<HashMap<String, usize>>,
    listing: Mutex<Vec<Metadata>>,
    listing_failures: AtomicUsize,
    listing_delay: Mutex<Option<Duration>>,
    refreshes: Mutex<Vec<(String, bool)>>,
    pub connect_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub listing_calls: AtomicUsize,
}

impl MockServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `connect()` calls fail, in order
    pub fn fail_connect(&self, err: ConnectionError) {
        self.connect_failures.lock().push_back(err);
    }

    /// Make the next `times` handshakes never complete
    pub fn hang_connect(&self, times: usize) {
        self.connect_hangs.store(times, Ordering::SeqCst);
    }

    pub fn push(&self, notification: Notification) {
        if let Some(tx) = self.feed.lock().as_ref() {
            let _ = tx.unbounded_send(Ok(notification));
        }
    }

    pub fn push_playing(&self, session_key: &str, state: &str) {
        self.push(Notification::playing(vec![PlaySessionState::new(
            session_key,
            state,
        )]));
    }

    pub fn push_error(&self, err: RequestError) {
        if let Some(tx) = self.feed.lock().as_ref() {
            let _ = tx.unbounded_send(Err(err));
        }
    }

    /// End the notification feed as a dropped socket would
    pub fn close_feed(&self) {
        self.feed.lock().take();
    }

    pub fn set_session(&self, session_key: &str, detail: Metadata) {
        self.sessions.lock().insert(session_key.to_string(), detail);
    }

    /// Stop listing a session, as the server does once playback ended
    pub fn remove_session(&self, session_key: &str) {
        self.sessions.lock().remove(session_key);
    }

    /// Make the next `times` detail lookups of a session fail
    pub fn fail_detail(&self, session_key: &str, times: usize) {
        self.detail_failures
            .lock()
            .insert(session_key.to_string(), times);
    }

    pub fn set_listing(&self, items: Vec<Metadata>) {
        *self.listing.lock() = items;
    }

    pub fn fail_listing(&self, times: usize) {
        self.listing_failures.store(times, Ordering::SeqCst);
    }

    pub fn delay_listing(&self, delay: Duration) {
        *self.listing_delay.lock() = Some(delay);
    }

    pub fn refreshes(&self) -> Vec<(String, bool)> {
        self.refreshes.lock().clone()
    }
}

#[async_trait]
impl MediaServer for MockServer {
    async fn connect(&self) -> Result<NotificationFeed, ConnectionError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let hanging = self
            .connect_hangs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hanging {
            futures::future::pending::<()>().await;
        }
        let failure = self.connect_failures.lock().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }

        let (tx, rx) = mpsc::unbounded();
        *self.feed.lock() = Some(tx);
        Ok(rx.boxed())
    }

    async fn session_detail(&self, session_key: &SessionKey) -> Result<Metadata, RequestError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.detail_failures.lock();
            if let Some(remaining) = failures.get_mut(session_key.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RequestError::Timeout);
                }
            }
        }

        self.sessions
            .lock()
            .get(session_key.as_str())
            .cloned()
            .ok_or_else(|| RequestError::SessionNotFound(session_key.to_string()))
    }

    async fn recently_added(&self) -> Result<Vec<Metadata>, RequestError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.listing_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .listing_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RequestError::Failed(PlexError::Status {
                status: 500,
                url: "/library/recentlyAdded".to_string(),
            }));
        }

        Ok(self.listing.lock().clone())
    }

    async fn library_sections(&self) -> Result<Vec<LibrarySection>, RequestError> {
        Ok(vec![
            LibrarySection {
                key: "1".to_string(),
                title: "Movies".to_string(),
                kind: "movie".to_string(),
            },
            LibrarySection {
                key: "2".to_string(),
                title: "TV Shows".to_string(),
                kind: "show".to_string(),
            },
        ])
    }

    async fn refresh_library(&self, section_key: &str, force: bool) -> Result<(), RequestError> {
        self.refreshes.lock().push((section_key.to_string(), force));
        Ok(())
    }

    fn artwork_url(&self, path: &str) -> Result<String, ArtworkError> {
        if path.is_empty() {
            return Err(ArtworkError::MissingArtwork);
        }
        if path.contains(' ') {
            return Err(ArtworkError::InvalidUrl(path.to_string()));
        }
        Ok(format!("http://plex.test{}?X-Plex-Token=t", path))
    }
}

/// Session detail of an episode playing on a named player
pub fn episode_session(player: &str, user: &str) -> Metadata {
    Metadata {
        kind: Some("episode".to_string()),
        title: "Pilot".to_string(),
        grandparent_title: Some("The Show".to_string()),
        thumb: Some("/library/metadata/10/thumb/1".to_string()),
        player: Some(Player {
            title: player.to_string(),
            machine_identifier: format!("{}-id", player),
            ..Default::default()
        }),
        user: Some(User {
            id: None,
            title: user.to_string(),
        }),
        ..Default::default()
    }
}

/// Library item with a poster image
pub fn library_item(title: &str, added_at: i64) -> Metadata {
    Metadata {
        kind: Some("movie".to_string()),
        title: title.to_string(),
        added_at: Some(added_at),
        art: Some(format!("/art/{}", added_at)),
        images: vec![Image {
            kind: "coverPoster".to_string(),
            url: format!("/poster/{}", added_at),
            alt: Some(title.to_string()),
        }],
        ..Default::default()
    }
}

/// Connection manager over `server`, already connected
pub async fn connected(server: &Arc<MockServer>) -> Arc<ConnectionManager> {
    let connection = Arc::new(ConnectionManager::new(
        Arc::clone(server) as Arc<dyn MediaServer>,
        Duration::from_secs(15),
    ));
    connection.connect().await.unwrap();
    connection
}

/// Let spawned tasks run without moving the paused clock much
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}
