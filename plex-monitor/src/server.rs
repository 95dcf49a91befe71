//! [`MediaServer`] over the Plex HTTP API and notification WebSocket

use async_trait::async_trait;
use futures::StreamExt;
use plex_client::{ClientConfig, LibrarySection, Metadata, PlexClient, PlexError};

use crate::config::ServerConfig;
use crate::connection::{MediaServer, NotificationFeed};
use crate::error::{ArtworkError, ConnectionError, RequestError};
use crate::model::SessionKey;

/// A Plex Media Server, optionally pinned to one machine identifier
#[derive(Debug, Clone)]
pub struct PlexServer {
    client: PlexClient,
    machine_identifier: Option<String>,
}

impl PlexServer {
    pub fn new(config: &ServerConfig) -> Result<Self, PlexError> {
        Self::with_client_config(config, ClientConfig::default())
    }

    pub fn with_client_config(
        config: &ServerConfig,
        client_config: ClientConfig,
    ) -> Result<Self, PlexError> {
        let client = PlexClient::with_config(&config.base_url, config.token.clone(), client_config)?;
        Ok(Self {
            client,
            machine_identifier: config.machine_identifier.clone(),
        })
    }

    pub fn client(&self) -> &PlexClient {
        &self.client
    }
}

#[async_trait]
impl MediaServer for PlexServer {
    async fn connect(&self) -> Result<NotificationFeed, ConnectionError> {
        let identity = self.client.identity().await?;

        if let Some(expected) = &self.machine_identifier {
            if *expected != identity.machine_identifier {
                return Err(ConnectionError::IdentityMismatch {
                    expected: expected.clone(),
                    actual: identity.machine_identifier,
                });
            }
        }

        let notifications = self.client.notifications().await?;
        tracing::info!(
            machine = %identity.machine_identifier,
            version = identity.version.as_deref().unwrap_or("unknown"),
            "Plex server verified"
        );

        Ok(notifications
            .into_stream()
            .map(|item| item.map_err(request_error))
            .boxed())
    }

    async fn session_detail(&self, session_key: &SessionKey) -> Result<Metadata, RequestError> {
        self.client
            .session(session_key.as_str())
            .await
            .map_err(request_error)?
            .ok_or_else(|| RequestError::SessionNotFound(session_key.to_string()))
    }

    async fn recently_added(&self) -> Result<Vec<Metadata>, RequestError> {
        self.client.recently_added().await.map_err(request_error)
    }

    async fn library_sections(&self) -> Result<Vec<LibrarySection>, RequestError> {
        self.client.library_sections().await.map_err(request_error)
    }

    async fn refresh_library(&self, section_key: &str, force: bool) -> Result<(), RequestError> {
        self.client
            .refresh_section(section_key, force)
            .await
            .map_err(request_error)
    }

    fn artwork_url(&self, path: &str) -> Result<String, ArtworkError> {
        if path.trim().is_empty() {
            return Err(ArtworkError::MissingArtwork);
        }
        self.client
            .asset_url(path)
            .map(String::from)
            .map_err(|e| ArtworkError::InvalidUrl(e.to_string()))
    }
}

fn request_error(err: PlexError) -> RequestError {
    match err {
        PlexError::Timeout => RequestError::Timeout,
        other => RequestError::Failed(other),
    }
}
