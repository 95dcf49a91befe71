//! Library change detector
//!
//! Compares the "recently added" listing against the stored watermark and
//! announces every item added since the previous poll, oldest first and
//! spaced out in time. The very first poll only establishes the watermark.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use plex_client::Metadata;

use crate::connection::ConnectionManager;
use crate::emitter::{emit_logged, EventEmitter};
use crate::error::{ArtworkError, RequestError};
use crate::event::{ItemAdded, MonitorEvent};
use crate::scheduler::Scheduler;
use crate::watermark::{Watermark, WatermarkStore};

/// Result of comparing one listing against the watermark
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No item in the listing carries a timestamp
    Empty,
    /// Nothing newer than the watermark
    Unchanged,
    /// First poll; the watermark is set without announcing anything
    Baseline { most_recent: i64 },
    /// Items newer than the watermark, oldest first
    NewItems { most_recent: i64, items: Vec<Metadata> },
}

impl Detection {
    /// Watermark to commit, if it moves
    pub fn most_recent(&self) -> Option<i64> {
        match self {
            Detection::Baseline { most_recent } | Detection::NewItems { most_recent, .. } => {
                Some(*most_recent)
            }
            Detection::Empty | Detection::Unchanged => None,
        }
    }
}

/// Compare a listing against a watermark
///
/// The watermark never moves backwards: a listing whose newest item is older
/// than the watermark (e.g. after a deletion) counts as unchanged.
pub fn detect(items: &[Metadata], watermark: Watermark) -> Detection {
    let Some(most_recent) = items.iter().filter_map(|item| item.added_at).max() else {
        return Detection::Empty;
    };

    match watermark {
        Watermark::At(at) if most_recent <= at => Detection::Unchanged,
        Watermark::Uninitialized => Detection::Baseline { most_recent },
        Watermark::At(_) => {
            let mut new_items: Vec<Metadata> = items
                .iter()
                .filter(|item| matches!(item.added_at, Some(added) if watermark.is_before(added)))
                .cloned()
                .collect();
            new_items.sort_by_key(|item| item.added_at);
            Detection::NewItems {
                most_recent,
                items: new_items,
            }
        }
    }
}

/// Offset of the `index`-th paced emission from the first one
fn emission_delay(spacing: Duration, index: usize) -> Duration {
    spacing.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

/// What one call to [`LibraryChangeDetector::check_for_new_items`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Empty,
    Unchanged,
    Baseline {
        watermark: i64,
    },
    NewItems {
        previous: i64,
        watermark: i64,
        /// Number of paced emissions scheduled
        scheduled: usize,
    },
}

pub struct LibraryChangeDetector {
    connection: Arc<ConnectionManager>,
    store: Arc<dyn WatermarkStore>,
    emitter: Arc<dyn EventEmitter>,
    scheduler: Arc<Scheduler>,
    emission_spacing: Duration,
    watermark: Mutex<Watermark>,
}

impl LibraryChangeDetector {
    /// Create a detector, loading the persisted watermark
    ///
    /// A store that cannot be read is logged and treated as empty.
    pub fn new(
        connection: Arc<ConnectionManager>,
        store: Arc<dyn WatermarkStore>,
        emitter: Arc<dyn EventEmitter>,
        scheduler: Arc<Scheduler>,
        emission_spacing: Duration,
    ) -> Self {
        let watermark = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not load watermark; starting fresh");
            Watermark::Uninitialized
        });
        tracing::debug!(?watermark, "Library watermark loaded");

        Self {
            connection,
            store,
            emitter,
            scheduler,
            emission_spacing,
            watermark: Mutex::new(watermark),
        }
    }

    pub fn watermark(&self) -> Watermark {
        *self.watermark.lock()
    }

    /// Fetch the listing and schedule an event for each new item
    ///
    /// Returns once the emissions are scheduled; they fire
    /// `emission_spacing` apart, the first one immediately.
    ///
    /// Only the first page of the listing is seen. If more items are added
    /// between two polls than the page holds, the oldest of them are never
    /// announced.
    pub async fn check_for_new_items(&self) -> Result<CheckOutcome, RequestError> {
        let items = self.connection.recently_added().await?;

        let (previous, detection) = {
            let mut watermark = self.watermark.lock();
            let previous = *watermark;
            let detection = detect(&items, previous);
            if let Some(most_recent) = detection.most_recent() {
                *watermark = Watermark::At(most_recent);
            }
            (previous, detection)
        };

        if let Some(most_recent) = detection.most_recent() {
            self.persist(most_recent).await;
        }

        let outcome = match detection {
            Detection::Empty => CheckOutcome::Empty,
            Detection::Unchanged => CheckOutcome::Unchanged,
            Detection::Baseline { most_recent } => {
                tracing::info!(watermark = most_recent, "Library baseline established");
                CheckOutcome::Baseline {
                    watermark: most_recent,
                }
            }
            Detection::NewItems { most_recent, items } => {
                let scheduled = self.schedule(items);
                tracing::info!(count = scheduled, watermark = most_recent, "New library items");
                CheckOutcome::NewItems {
                    previous: previous.value().unwrap_or_default(),
                    watermark: most_recent,
                    scheduled,
                }
            }
        };

        Ok(outcome)
    }

    /// Save on the blocking pool; a failure is logged and the poll goes on
    async fn persist(&self, most_recent: i64) {
        let store = Arc::clone(&self.store);
        let saved =
            tokio::task::spawn_blocking(move || store.save(Watermark::At(most_recent))).await;

        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, watermark = most_recent, "Failed to persist watermark");
            }
            Err(e) => {
                tracing::error!(error = %e, watermark = most_recent, "Watermark save task failed");
            }
        }
    }

    fn schedule(&self, items: Vec<Metadata>) -> usize {
        let count = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let event = MonitorEvent::ItemAdded(ItemAdded {
                title: item.display_title(),
                image: self.poster(&item),
                added_at: item.added_at.unwrap_or_default(),
            });

            let emitter = Arc::clone(&self.emitter);
            let delay = emission_delay(self.emission_spacing, index);
            self.scheduler.after(delay, async move {
                emit_logged(emitter.as_ref(), event);
            });
        }
        count
    }

    fn poster(&self, item: &Metadata) -> Option<String> {
        let url = item
            .poster_path()
            .ok_or(ArtworkError::MissingArtwork)
            .and_then(|path| self.connection.artwork_url(path));

        match url {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(title = %item.title, error = %e, "No artwork for new item");
                None
            }
        }
    }
}
