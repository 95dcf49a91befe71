//! Configuration types for the monitor
//!
//! [`MonitorConfig`] controls polling cadence, pacing and timeouts.
//! [`ServerConfig`] identifies the server and carries its access token.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a [`PlexMonitor`](crate::PlexMonitor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between library polls (and reconnect attempts)
    /// Default: 60 seconds
    pub poll_interval: Duration,

    /// Delay between consecutive "recently added" events of one poll
    /// Default: 2 seconds
    pub emission_spacing: Duration,

    /// Upper bound for every on-demand query against the server
    /// Default: 15 seconds
    pub request_timeout: Duration,

    /// How long a fetched session detail is reused
    /// Default: 5 seconds
    pub session_cache_ttl: Duration,

    /// Forget sessions that have not been seen for this long
    /// Default: None (sessions are kept until shutdown)
    pub session_idle_timeout: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            emission_spacing: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            session_cache_ttl: Duration::from_secs(5),
            session_idle_timeout: None,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short poll interval for interactive use
    pub fn responsive() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            emission_spacing: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    /// Infrequent polling with idle session cleanup, for long running hosts
    pub fn quiet() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            emission_spacing: Duration::from_secs(5),
            session_idle_timeout: Some(Duration::from_secs(6 * 60 * 60)),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_emission_spacing(mut self, spacing: Duration) -> Self {
        self.emission_spacing = spacing;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_session_cache_ttl(mut self, ttl: Duration) -> Self {
        self.session_cache_ttl = ttl;
        self
    }

    pub fn with_session_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Reject values the monitor cannot run with
    ///
    /// `emission_spacing` and `session_cache_ttl` may be zero (no pacing,
    /// no caching); the interval and timeouts may not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("poll_interval"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        if matches!(self.session_idle_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(ConfigError::ZeroDuration("session_idle_timeout"));
        }
        Ok(())
    }
}

/// Identity and credential of the monitored server
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://192.168.1.10:32400`
    pub base_url: String,

    /// Access token sent with every request
    pub token: String,

    /// Expected machine identifier; when set, `connect()` refuses any other server
    pub machine_identifier: Option<String>,
}

impl ServerConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            machine_identifier: None,
        }
    }

    pub fn with_machine_identifier(mut self, id: impl Into<String>) -> Self {
        self.machine_identifier = Some(id.into());
        self
    }

    /// Read `PLEX_URL`, `PLEX_TOKEN` and the optional `PLEX_MACHINE_IDENTIFIER`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = read("PLEX_URL").ok_or(ConfigError::Missing("PLEX_URL"))?;
        let token = read("PLEX_TOKEN").ok_or(ConfigError::Missing("PLEX_TOKEN"))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "PLEX_URL",
                reason: format!("'{}' is not an http(s) URL", base_url),
            });
        }

        Ok(Self {
            base_url,
            token,
            machine_identifier: read("PLEX_MACHINE_IDENTIFIER"),
        })
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("machine_identifier", &self.machine_identifier)
            .finish()
    }
}
