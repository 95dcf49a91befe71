//! PlexServer against a mock HTTP server

use mockito::{Matcher, Server};
use plex_monitor::{
    ArtworkError, ConnectionError, MediaServer, PlexServer, RequestError, ServerConfig, SessionKey,
};

fn plex(server: &Server, machine: Option<&str>) -> PlexServer {
    let mut config = ServerConfig::new(server.url(), "token");
    if let Some(machine) = machine {
        config = config.with_machine_identifier(machine);
    }
    PlexServer::new(&config).unwrap()
}

#[tokio::test]
async fn test_connect_rejects_other_server() {
    let mut server = Server::new_async().await;
    let _identity = server
        .mock("GET", "/identity")
        .with_status(200)
        .with_body(r#"{"MediaContainer":{"machineIdentifier":"other"}}"#)
        .create_async()
        .await;

    match plex(&server, Some("expected")).connect().await {
        Err(ConnectionError::IdentityMismatch { expected, actual }) => {
            assert_eq!(expected, "expected");
            assert_eq!(actual, "other");
        }
        Err(other) => panic!("expected identity mismatch, got {:?}", other),
        Ok(_) => panic!("expected identity mismatch, got a feed"),
    }
}

#[tokio::test]
async fn test_connect_unauthorized() {
    let mut server = Server::new_async().await;
    let _identity = server
        .mock("GET", "/identity")
        .with_status(401)
        .create_async()
        .await;

    assert!(matches!(
        plex(&server, None).connect().await,
        Err(ConnectionError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_connect_unreachable() {
    let config = ServerConfig::new("http://127.0.0.1:1", "token");
    let server = PlexServer::new(&config).unwrap();

    assert!(matches!(
        server.connect().await,
        Err(ConnectionError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_session_detail_lookup() {
    let mut server = Server::new_async().await;
    let _sessions = server
        .mock("GET", "/status/sessions")
        .expect(2)
        .with_status(200)
        .with_body(
            r#"{"MediaContainer":{"size":1,"Metadata":[
                {"sessionKey":"7","type":"track","title":"Song","grandparentTitle":"Band",
                 "Player":{"title":"Kitchen","machineIdentifier":"k1"},"User":{"title":"carol"}}
            ]}}"#,
        )
        .create_async()
        .await;
    let plex = plex(&server, None);

    let detail = plex.session_detail(&SessionKey::from("7")).await.unwrap();
    assert_eq!(detail.display_title(), "Band - Song");

    assert!(matches!(
        plex.session_detail(&SessionKey::from("8")).await,
        Err(RequestError::SessionNotFound(key)) if key == "8"
    ));
}

#[tokio::test]
async fn test_rescan_sends_force_flag() {
    let mut server = Server::new_async().await;
    let rescan = server
        .mock("GET", "/library/sections/4/refresh")
        .match_query(Matcher::UrlEncoded("force".into(), "1".into()))
        .match_header("x-plex-token", "token")
        .with_status(200)
        .create_async()
        .await;

    plex(&server, None).refresh_library("4", true).await.unwrap();
    rescan.assert_async().await;
}

#[tokio::test]
async fn test_artwork_urls() {
    let server = Server::new_async().await;
    let plex = plex(&server, None);

    let url = plex.artwork_url("/library/metadata/1/thumb/2").unwrap();
    assert!(url.starts_with(&server.url()));
    assert!(url.ends_with("/library/metadata/1/thumb/2?X-Plex-Token=token"));

    assert!(matches!(
        plex.artwork_url(""),
        Err(ArtworkError::MissingArtwork)
    ));
}
