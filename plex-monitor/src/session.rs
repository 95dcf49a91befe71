//! Session state tracker
//!
//! Turns the unordered, duplicated stream of play session notifications into
//! exactly one event per logical state change. The per-session state is
//! committed before the session detail is fetched, so a failed fetch or
//! emission never causes a second announcement of the same change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use plex_client::{Metadata, Notification};
use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::connection::{ConnectionManager, NotificationHandler};
use crate::emitter::{emit_logged, EventEmitter};
use crate::error::{ArtworkError, RequestError};
use crate::event::{MonitorEvent, PlayerPause, PlayerStart, PlayerStop};
use crate::model::{
    transition, DiscardReason, PlaybackState, SessionEventKind, SessionKey, SessionState,
    Transition,
};

/// What happened to one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// `buffering`; nothing stored
    Transient,
    /// Same state as last time
    Duplicate,
    /// Stored as the new baseline, but the state has no event
    Silent,
    /// Stored and announced
    Emitted(SessionEventKind),
    /// Stored, but the session detail could not be fetched; nothing announced
    DetailFailed,
    /// The tracker has been shut down
    TornDown,
}

#[derive(Debug)]
struct TrackedSession {
    state: SessionState,
    last_seen: Instant,
    /// Last detail fetched for this session, outlives the cache entry
    last_detail: Option<Metadata>,
}

pub struct SessionTracker {
    sessions: Mutex<HashMap<SessionKey, TrackedSession>>,
    details: TtlCache<SessionKey, Metadata>,
    connection: Arc<ConnectionManager>,
    emitter: Arc<dyn EventEmitter>,
    torn_down: Arc<AtomicBool>,
}

impl SessionTracker {
    pub fn new(
        connection: Arc<ConnectionManager>,
        emitter: Arc<dyn EventEmitter>,
        detail_ttl: Duration,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            details: TtlCache::new(detail_ttl),
            connection,
            emitter,
            torn_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a torn-down flag with other components
    pub fn with_shutdown_signal(mut self, signal: Arc<AtomicBool>) -> Self {
        self.torn_down = signal;
        self
    }

    /// Classify one `(session, state)` report and emit its event, if any
    pub async fn handle_notification(
        &self,
        session_key: &SessionKey,
        raw_state: &str,
    ) -> NotificationOutcome {
        if self.is_torn_down() {
            return NotificationOutcome::TornDown;
        }

        let incoming = PlaybackState::parse(raw_state);
        let emit = {
            let mut sessions = self.sessions.lock();
            let now = Instant::now();
            let last = sessions
                .get(session_key)
                .map(|s| s.state.clone())
                .unwrap_or_default();

            match transition(&last, &incoming) {
                Transition::Discard(reason) => {
                    if let Some(session) = sessions.get_mut(session_key) {
                        session.last_seen = now;
                    }
                    tracing::debug!(session = %session_key, state = raw_state, ?reason, "Notification discarded");
                    return match reason {
                        DiscardReason::Transient => NotificationOutcome::Transient,
                        DiscardReason::Duplicate => NotificationOutcome::Duplicate,
                    };
                }
                Transition::Accept { next, emit } => {
                    tracing::debug!(session = %session_key, from = %last, to = %next, "Session state changed");
                    let session = sessions
                        .entry(session_key.clone())
                        .or_insert_with(|| TrackedSession {
                            state: SessionState::default(),
                            last_seen: now,
                            last_detail: None,
                        });
                    session.state = next;
                    session.last_seen = now;
                    emit
                }
            }
        };

        let Some(kind) = emit else {
            return NotificationOutcome::Silent;
        };

        let detail = match self.detail(session_key).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(session = %session_key, error = %e, "Could not fetch session detail");
                return NotificationOutcome::DetailFailed;
            }
        };

        if self.is_torn_down() {
            return NotificationOutcome::TornDown;
        }

        emit_logged(self.emitter.as_ref(), self.event_for(kind, &detail));
        NotificationOutcome::Emitted(kind)
    }

    /// Last accepted state of a session
    pub fn state_of(&self, session_key: &SessionKey) -> Option<SessionState> {
        self.sessions
            .lock()
            .get(session_key)
            .map(|s| s.state.clone())
    }

    pub fn tracked_sessions(&self) -> Vec<(SessionKey, SessionState)> {
        self.sessions
            .lock()
            .iter()
            .map(|(key, s)| (key.clone(), s.state.clone()))
            .collect()
    }

    pub fn forget(&self, session_key: &SessionKey) -> Option<SessionState> {
        self.details.remove(session_key);
        self.sessions.lock().remove(session_key).map(|s| s.state)
    }

    /// Drop sessions not reported for longer than `max_idle`; returns how many
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|key, session| {
            let keep = session.last_seen.elapsed() <= max_idle;
            if !keep {
                self.details.remove(key);
            }
            keep
        });
        before - sessions.len()
    }

    pub fn clear(&self) {
        self.sessions.lock().clear();
        self.details.clear();
    }

    /// Stop handling notifications and forget every session
    pub fn shut_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        self.clear();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    async fn detail(&self, session_key: &SessionKey) -> Result<Metadata, RequestError> {
        if let Some(detail) = self.details.get(session_key) {
            return Ok(detail);
        }

        match self.connection.session_detail(session_key).await {
            Ok(detail) => {
                self.details.insert(session_key.clone(), detail.clone());
                if let Some(session) = self.sessions.lock().get_mut(session_key) {
                    session.last_detail = Some(detail.clone());
                }
                Ok(detail)
            }
            // The server drops a session from its listing as soon as playback ends
            Err(RequestError::SessionNotFound(key)) => {
                let known = self
                    .sessions
                    .lock()
                    .get(session_key)
                    .and_then(|s| s.last_detail.clone());
                match known {
                    Some(detail) => {
                        tracing::debug!(session = %session_key, "Session no longer listed; using last known detail");
                        Ok(detail)
                    }
                    None => Err(RequestError::SessionNotFound(key)),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn event_for(&self, kind: SessionEventKind, detail: &Metadata) -> MonitorEvent {
        let player = detail.player.clone().unwrap_or_default();
        let user_title = detail
            .user
            .as_ref()
            .map(|u| u.title.clone())
            .unwrap_or_default();
        let media_title = detail.display_title();

        match kind {
            SessionEventKind::Start => MonitorEvent::PlayerStart(PlayerStart {
                player_title: player.title,
                player_id: player.machine_identifier,
                media_title,
                media_image: self.media_image(detail),
                user_title,
            }),
            SessionEventKind::Pause => MonitorEvent::PlayerPause(PlayerPause {
                player_title: player.title,
                player_id: player.machine_identifier,
                media_title,
                user_title,
            }),
            SessionEventKind::Stop => MonitorEvent::PlayerStop(PlayerStop {
                player_title: player.title,
                player_id: player.machine_identifier,
                media_title,
                user_title,
            }),
        }
    }

    fn media_image(&self, detail: &Metadata) -> Option<String> {
        let url = detail
            .thumb_path()
            .ok_or(ArtworkError::MissingArtwork)
            .and_then(|path| self.connection.artwork_url(path));

        match url {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(title = %detail.title, error = %e, "No artwork for session");
                None
            }
        }
    }
}

#[async_trait]
impl NotificationHandler for SessionTracker {
    async fn on_notification(&self, notification: &Notification) {
        if !notification.is_playing() {
            tracing::trace!(kind = %notification.kind, "Ignoring notification");
            return;
        }

        for entry in &notification.play_session_states {
            let key = SessionKey::new(entry.session_key.as_str());
            self.handle_notification(&key, &entry.state).await;
        }
    }
}
