use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::notifications::NotificationStream;
use crate::types::{
    DirectoryContainer, Envelope, Identity, LibrarySection, Metadata, MetadataContainer,
};
use crate::{PlexError, Result};

/// Header carrying the access token on every request
const TOKEN_HEADER: &str = "X-Plex-Token";

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for establishing the TCP/TLS connection
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Overall timeout of a single HTTP request
    /// Default: 15 seconds
    pub request_timeout: Duration,

    /// Quiet period on the notification socket after which a Ping is sent;
    /// a second quiet period without any frame ends the feed
    /// Default: 30 seconds
    pub keepalive_interval: Duration,

    /// Value of the `X-Plex-Client-Identifier` header
    pub client_identifier: String,

    /// Value of the `X-Plex-Product` header
    pub product: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(30),
            client_identifier: "plex-monitor".to_string(),
            product: "plex-monitor".to_string(),
        }
    }
}

/// A minimal client for one Plex Media Server
///
/// Every request is sent with `Accept: application/json` and the access token
/// in the `X-Plex-Token` header. The client is cheap to clone; clones share
/// the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PlexClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    connect_timeout: Duration,
    keepalive_interval: Duration,
}

impl PlexClient {
    /// Create a client with default settings
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, token, ClientConfig::default())
    }

    /// Create a client with custom settings
    pub fn with_config(
        base_url: &str,
        token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(PlexError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                base_url.scheme(),
                base_url
            )));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        for (name, value) in [
            ("X-Plex-Client-Identifier", &config.client_identifier),
            ("X-Plex-Product", &config.product),
        ] {
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| PlexError::InvalidUrl(format!("invalid header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| PlexError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
            connect_timeout: config.connect_timeout,
            keepalive_interval: config.keepalive_interval,
        })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /identity`
    pub async fn identity(&self) -> Result<Identity> {
        self.get_json("/identity").await
    }

    /// `GET /status/sessions`
    pub async fn sessions(&self) -> Result<Vec<Metadata>> {
        let container: MetadataContainer = self.get_json("/status/sessions").await?;
        Ok(container.metadata)
    }

    /// Find one active session by its session key
    pub async fn session(&self, session_key: &str) -> Result<Option<Metadata>> {
        let sessions = self.sessions().await?;
        Ok(sessions
            .into_iter()
            .find(|s| s.session_key.as_deref() == Some(session_key)))
    }

    /// `GET /library/recentlyAdded`, newest first
    pub async fn recently_added(&self) -> Result<Vec<Metadata>> {
        let container: MetadataContainer = self.get_json("/library/recentlyAdded").await?;
        Ok(container.metadata)
    }

    /// `GET /library/sections`
    pub async fn library_sections(&self) -> Result<Vec<LibrarySection>> {
        let container: DirectoryContainer = self.get_json("/library/sections").await?;
        Ok(container.directory)
    }

    /// Ask the server to scan a library section
    ///
    /// With `force` set, the server re-reads every file instead of only the
    /// changed ones.
    pub async fn refresh_section(&self, section_key: &str, force: bool) -> Result<()> {
        if section_key.is_empty() || section_key.contains(|c| matches!(c, '/' | '?' | '#')) {
            return Err(PlexError::InvalidUrl(format!(
                "invalid library section key '{}'",
                section_key
            )));
        }

        let mut url = self.endpoint(&format!("/library/sections/{}/refresh", section_key))?;
        if force {
            url.query_pairs_mut().append_pair("force", "1");
        }

        let response = self.request(Method::GET, url).send().await?;
        Self::check_status(response)?;
        Ok(())
    }

    /// Absolute URL of an image or asset path, carrying the token
    ///
    /// Paths that are already absolute URLs (artwork served by a third party)
    /// are returned untouched so the token is never sent elsewhere.
    pub fn asset_url(&self, path: &str) -> Result<Url> {
        if path.is_empty() {
            return Err(PlexError::InvalidUrl("empty asset path".to_string()));
        }
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }

        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair(TOKEN_HEADER, &self.token);
        Ok(url)
    }

    /// URL of the push notification WebSocket
    pub fn notifications_url(&self) -> Result<Url> {
        let mut url = self.endpoint("/:/websockets/notifications")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| PlexError::InvalidUrl(format!("cannot use {} for {}", scheme, url)))?;
        url.query_pairs_mut().append_pair(TOKEN_HEADER, &self.token);
        Ok(url)
    }

    /// Open the push notification WebSocket
    ///
    /// The WebSocket handshake is bounded by the connect timeout.
    pub async fn notifications(&self) -> Result<NotificationStream> {
        NotificationStream::connect(
            self.notifications_url()?,
            self.connect_timeout,
            self.keepalive_interval,
        )
        .await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}{}", base, path))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header(TOKEN_HEADER, &self.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::trace!(url = %url, "GET");

        let response = self.request(Method::GET, url).send().await?;
        let response = Self::check_status(response)?;
        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.media_container)
    }

    fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PlexError::Unauthorized);
        }
        if !status.is_success() {
            return Err(PlexError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}
