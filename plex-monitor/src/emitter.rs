//! Event emitter interface and the bundled implementations

use tokio::sync::mpsc;

use crate::error::EmitError;
use crate::event::MonitorEvent;

/// Receives classified events for dispatch to the host's trigger mechanism
///
/// Called from the notification dispatch task and from deferred library
/// emissions. Implementations must not block.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: MonitorEvent) -> Result<(), EmitError>;
}

/// Forwards events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelEmitter {
    /// Create an emitter together with the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: MonitorEvent) -> Result<(), EmitError> {
        self.tx.send(event).map_err(|_| EmitError::ChannelClosed)
    }
}

/// Logs every event and drops it
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn emit(&self, event: MonitorEvent) -> Result<(), EmitError> {
        let tokens = serde_json::to_string(&event).map_err(|e| EmitError::Dispatch(e.to_string()))?;
        tracing::info!(event = event.name(), %tokens, "Event");
        Ok(())
    }
}

/// Emit and log failures; emission errors never reach monitor state
pub(crate) fn emit_logged(emitter: &dyn EventEmitter, event: MonitorEvent) {
    let name = event.name();
    match emitter.emit(event) {
        Ok(()) => tracing::debug!(event = name, "Event emitted"),
        Err(e) => tracing::warn!(event = name, error = %e, "Failed to emit event"),
    }
}
