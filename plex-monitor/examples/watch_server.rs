//! Watch a Plex server and print every event until Ctrl-C
//!
//! ```text
//! PLEX_URL=http://192.168.1.10:32400 PLEX_TOKEN=... \
//! PLEX_MONITOR_LOG_MODE=development cargo run -p plex-monitor --example watch_server
//! ```

use std::sync::Arc;

use plex_monitor::logging::{init_logging_from_env, is_initialized, LoggingMode};
use plex_monitor::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;
    if !is_initialized() {
        plex_monitor::logging::init_logging(LoggingMode::Development)?;
    }

    let server = ServerConfig::from_env()?;
    let (emitter, mut events) = ChannelEmitter::new();
    let monitor = PlexMonitor::for_server(&server, MonitorConfig::responsive(), Arc::new(emitter))?;
    let mut availability = monitor.subscribe_availability();

    monitor.start()?;
    println!("Watching {} (Ctrl-C to stop)", server.base_url);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("{:<16} {}", event.name(), serde_json::to_string(&event)?);
            }
            Ok(()) = availability.changed() => {
                println!("availability: {:?}", *availability.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown();
    Ok(())
}
