//! Poller: drives library checks and reconnects

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::connection::ConnectionManager;
use crate::error::{ConnectionError, RequestError};
use crate::library::{CheckOutcome, LibraryChangeDetector};
use crate::scheduler::Scheduler;
use crate::session::SessionTracker;

/// Whether the monitored server is usable
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Availability {
    /// No poll has completed yet
    #[default]
    Unknown,
    Available,
    /// Last connection attempt failed, with the reason
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// What one poll cycle did
#[derive(Debug)]
pub enum PollOutcome {
    /// Could not connect; the library was not checked
    Unavailable(ConnectionError),
    Checked(CheckOutcome),
    /// Connected, but the library check failed
    CheckFailed(RequestError),
}

pub struct Poller {
    connection: Arc<ConnectionManager>,
    detector: Arc<LibraryChangeDetector>,
    scheduler: Arc<Scheduler>,
    idle_pruning: Option<(Arc<SessionTracker>, Duration)>,
    availability: watch::Sender<Availability>,
    in_flight: Arc<AtomicBool>,
}

impl Poller {
    pub fn new(
        connection: Arc<ConnectionManager>,
        detector: Arc<LibraryChangeDetector>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let (availability, _) = watch::channel(Availability::Unknown);
        Self {
            connection,
            detector,
            scheduler,
            idle_pruning: None,
            availability,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Forget sessions idle for longer than `max_idle` at the start of each cycle
    pub fn with_idle_pruning(mut self, tracker: Arc<SessionTracker>, max_idle: Duration) -> Self {
        self.idle_pruning = Some((tracker, max_idle));
        self
    }

    /// Start one poll cycle in the background
    ///
    /// Returns `false` without doing anything while the previous cycle is
    /// still running.
    pub fn tick(self: &Arc<Self>) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Previous poll still running; skipping tick");
            return false;
        }

        let guard = InFlight(Arc::clone(&self.in_flight));
        let poller = Arc::clone(self);
        self.scheduler.spawn(async move {
            let _guard = guard;
            poller.poll_once().await;
        });
        true
    }

    /// Run one poll cycle to completion
    pub async fn poll_once(&self) -> PollOutcome {
        if let Some((tracker, max_idle)) = &self.idle_pruning {
            let pruned = tracker.prune_idle(*max_idle);
            if pruned > 0 {
                tracing::debug!(pruned, "Forgot idle sessions");
            }
        }

        if !self.connection.is_connected() {
            if let Err(e) = self.connection.connect().await {
                self.publish(Availability::Unavailable(e.to_string()));
                return PollOutcome::Unavailable(e);
            }
        }
        self.publish(Availability::Available);

        match self.detector.check_for_new_items().await {
            Ok(outcome) => {
                tracing::debug!(?outcome, "Library checked");
                PollOutcome::Checked(outcome)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Library check failed");
                PollOutcome::CheckFailed(e)
            }
        }
    }

    pub fn availability(&self) -> Availability {
        self.availability.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn publish(&self, next: Availability) {
        self.availability.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            match &next {
                Availability::Unavailable(reason) => {
                    tracing::warn!(%reason, "Server unavailable")
                }
                _ => tracing::info!(availability = ?next, "Server availability changed"),
            }
            *current = next.clone();
            true
        });
    }
}

/// Clears the in-flight flag when a cycle ends or is aborted
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
