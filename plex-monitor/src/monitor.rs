//! The monitor facade: wires every component for one server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use plex_client::LibrarySection;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::{MonitorConfig, ServerConfig};
use crate::connection::{ConnectionManager, MediaServer};
use crate::emitter::EventEmitter;
use crate::error::{MonitorError, Result};
use crate::library::LibraryChangeDetector;
use crate::poller::{Availability, Poller};
use crate::scheduler::Scheduler;
use crate::server::PlexServer;
use crate::session::SessionTracker;
use crate::watermark::{JsonFileWatermarkStore, WatermarkStore};

/// A recently added item as shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentItem {
    pub title: String,
    pub image: Option<String>,
}

/// Monitor of one media server
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use plex_monitor::{ChannelEmitter, MonitorConfig, PlexMonitor, ServerConfig};
///
/// let (emitter, mut events) = ChannelEmitter::new();
/// let monitor = PlexMonitor::for_server(
///     &ServerConfig::from_env()?,
///     MonitorConfig::default(),
///     Arc::new(emitter),
/// )?;
/// monitor.start()?;
///
/// while let Some(event) = events.recv().await {
///     println!("{}: {:?}", event.name(), event);
/// }
/// ```
pub struct PlexMonitor {
    config: MonitorConfig,
    scheduler: Arc<Scheduler>,
    connection: Arc<ConnectionManager>,
    tracker: Arc<SessionTracker>,
    detector: Arc<LibraryChangeDetector>,
    poller: Arc<Poller>,
    started: AtomicBool,
}

impl PlexMonitor {
    pub fn new(
        config: MonitorConfig,
        server: Arc<dyn MediaServer>,
        store: Arc<dyn WatermarkStore>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self> {
        config.validate()?;

        let scheduler = Arc::new(Scheduler::new());
        let connection = Arc::new(ConnectionManager::new(server, config.request_timeout));
        let tracker = Arc::new(
            SessionTracker::new(
                Arc::clone(&connection),
                Arc::clone(&emitter),
                config.session_cache_ttl,
            )
            .with_shutdown_signal(scheduler.shutdown_signal()),
        );
        let detector = Arc::new(LibraryChangeDetector::new(
            Arc::clone(&connection),
            store,
            emitter,
            Arc::clone(&scheduler),
            config.emission_spacing,
        ));

        let mut poller = Poller::new(
            Arc::clone(&connection),
            Arc::clone(&detector),
            Arc::clone(&scheduler),
        );
        if let Some(max_idle) = config.session_idle_timeout {
            poller = poller.with_idle_pruning(Arc::clone(&tracker), max_idle);
        }

        Ok(Self {
            config,
            scheduler,
            connection,
            tracker,
            detector,
            poller: Arc::new(poller),
            started: AtomicBool::new(false),
        })
    }

    /// Monitor a Plex server, keeping the watermark under the data directory
    pub fn for_server(
        server: &ServerConfig,
        config: MonitorConfig,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self> {
        let store = JsonFileWatermarkStore::in_data_dir(server.machine_identifier.as_deref())?;
        tracing::debug!(path = %store.path().display(), "Watermark file");

        Self::new(
            config,
            Arc::new(PlexServer::new(server)?),
            Arc::new(store),
            emitter,
        )
    }

    /// Subscribe to notifications and start polling, the first poll immediately
    ///
    /// Calling `start` again is a no-op.
    pub fn start(&self) -> Result<()> {
        if self.scheduler.is_shut_down() {
            return Err(MonitorError::ShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.connection.on_notification(self.tracker.clone());

        let poller = Arc::clone(&self.poller);
        self.scheduler.every(self.config.poll_interval, move || {
            poller.tick();
            std::future::ready(())
        });

        tracing::info!(interval = ?self.config.poll_interval, "Monitor started");
        Ok(())
    }

    /// Stop everything; no event is emitted once this returns
    pub fn shutdown(&self) {
        if self.scheduler.is_shut_down() {
            return;
        }
        self.scheduler.shutdown();
        self.tracker.shut_down();
        self.connection.disconnect();
        self.connection.clear_handlers();
        tracing::info!("Monitor shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.scheduler.is_shut_down()
    }

    /// Force a full rescan of a library section
    pub async fn rescan_library(&self, section_key: &str) -> Result<()> {
        self.connection.refresh_library(section_key, true).await?;
        tracing::info!(section = section_key, "Library rescan requested");
        Ok(())
    }

    /// Scan a library section for changed files
    pub async fn refresh_library(&self, section_key: &str) -> Result<()> {
        self.connection.refresh_library(section_key, false).await?;
        tracing::info!(section = section_key, "Library refresh requested");
        Ok(())
    }

    pub async fn library_sections(&self) -> Result<Vec<LibrarySection>> {
        Ok(self.connection.library_sections().await?)
    }

    /// Current "recently added" listing, newest first
    pub async fn recently_added(&self) -> Result<Vec<RecentItem>> {
        let items = self.connection.recently_added().await?;
        Ok(items
            .into_iter()
            .map(|item| RecentItem {
                image: item
                    .thumb_path()
                    .and_then(|path| self.connection.artwork_url(path).ok()),
                title: item.display_title(),
            })
            .collect())
    }

    pub fn availability(&self) -> Availability {
        self.poller.availability()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.poller.subscribe()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }

    pub fn detector(&self) -> &Arc<LibraryChangeDetector> {
        &self.detector
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }
}

impl Drop for PlexMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
