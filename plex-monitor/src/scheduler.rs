//! Recurring and deferred tasks that are cancelled together
//!
//! Every task spawned through a [`Scheduler`] is tracked by its `JoinHandle`.
//! [`Scheduler::shutdown`] raises the shared torn-down flag and aborts all of
//! them, so nothing scheduled here runs after teardown.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default)]
pub struct Scheduler {
    shutdown_signal: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `period`, the first run immediately
    ///
    /// Missed ticks are skipped rather than bursted. The returned future of
    /// each run is awaited before the next tick is taken.
    pub fn every<F, Fut>(&self, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        self.track(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if shutdown_signal.load(Ordering::SeqCst) {
                    break;
                }
                task().await;
            }
        }));
    }

    /// Run `task` once after `delay`
    ///
    /// The task is dropped without running if the scheduler is shut down first.
    pub fn after<Fut>(&self, delay: Duration, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        self.track(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shutdown_signal.load(Ordering::SeqCst) {
                return;
            }
            task.await;
        }));
    }

    /// Run `task` right away as a tracked background task
    pub fn spawn<Fut>(&self, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.track(tokio::spawn(task));
    }

    /// Raise the torn-down flag and abort every outstanding task
    pub fn shutdown(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        for task in tasks {
            task.abort();
        }
        tracing::debug!(aborted = count, "Scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// Shared torn-down flag, for components that check it before side effects
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    /// Number of tasks that have not finished yet
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    fn track(&self, handle: JoinHandle<()>) {
        if self.is_shut_down() {
            handle.abort();
            return;
        }
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
