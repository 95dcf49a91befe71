//! Request/response tests for PlexClient against a mock HTTP server

use mockito::{Matcher, Server};
use plex_client::{PlexClient, PlexError};
use rstest::rstest;

const TOKEN: &str = "test-token";

fn client_for(server: &Server) -> PlexClient {
    PlexClient::new(&server.url(), TOKEN).unwrap()
}

#[tokio::test]
async fn test_identity_sends_token_and_accept_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/identity")
        .match_header("x-plex-token", TOKEN)
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"MediaContainer":{"size":0,"machineIdentifier":"server-1","version":"1.40.0"}}"#)
        .create_async()
        .await;

    let identity = client_for(&server).identity().await.unwrap();

    assert_eq!(identity.machine_identifier, "server-1");
    assert_eq!(identity.version.as_deref(), Some("1.40.0"));
    mock.assert_async().await;
}

#[rstest]
#[case(401, "unauthorized")]
#[case(500, "status")]
#[case(404, "status")]
#[tokio::test]
async fn test_error_statuses(#[case] status: usize, #[case] expected: &str) {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/identity")
        .with_status(status)
        .create_async()
        .await;

    let err = client_for(&server).identity().await.unwrap_err();

    match (expected, err) {
        ("unauthorized", PlexError::Unauthorized) => {}
        ("status", PlexError::Status { status: got, .. }) => assert_eq!(got as usize, status),
        (_, other) => panic!("unexpected error for {}: {:?}", status, other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/library/recentlyAdded")
        .with_status(200)
        .with_body("<MediaContainer/>")
        .create_async()
        .await;

    let err = client_for(&server).recently_added().await.unwrap_err();
    assert!(matches!(err, PlexError::Parse(_)));
}

#[tokio::test]
async fn test_recently_added_keeps_server_order() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/library/recentlyAdded")
        .with_status(200)
        .with_body(
            r#"{"MediaContainer":{"size":2,"Metadata":[
                {"title":"Newer","addedAt":700,"art":"/art/2",
                 "Image":[{"alt":"Newer","type":"coverPoster","url":"/poster/2"}]},
                {"title":"Older","addedAt":600,"art":"/art/1"}
            ]}}"#,
        )
        .create_async()
        .await;

    let items = client_for(&server).recently_added().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].added_at, Some(700));
    assert_eq!(items[0].poster_path(), Some("/poster/2"));
    assert_eq!(items[1].poster_path(), Some("/art/1"));
}

#[tokio::test]
async fn test_empty_container_yields_empty_list() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/library/recentlyAdded")
        .with_status(200)
        .with_body(r#"{"MediaContainer":{"size":0}}"#)
        .create_async()
        .await;

    let items = client_for(&server).recently_added().await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_session_lookup_by_key() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/status/sessions")
        .expect(2)
        .with_status(200)
        .with_body(
            r#"{"MediaContainer":{"size":2,"Metadata":[
                {"sessionKey":"1","title":"A","Player":{"title":"TV","machineIdentifier":"p1"},"User":{"title":"alice"}},
                {"sessionKey":"2","title":"B","Player":{"title":"Phone","machineIdentifier":"p2"},"User":{"title":"bob"}}
            ]}}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let session = client.session("2").await.unwrap().unwrap();
    assert_eq!(session.title, "B");
    assert_eq!(session.player.unwrap().title, "Phone");

    assert!(client.session("99").await.unwrap().is_none());
}

#[tokio::test]
async fn test_library_sections() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/library/sections")
        .with_status(200)
        .with_body(
            r#"{"MediaContainer":{"size":2,"Directory":[
                {"key":"1","title":"Movies","type":"movie"},
                {"key":"2","title":"Music","type":"artist"}
            ]}}"#,
        )
        .create_async()
        .await;

    let sections = client_for(&server).library_sections().await.unwrap();

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[1].key, "2");
    assert_eq!(sections[1].kind, "artist");
}

#[tokio::test]
async fn test_refresh_and_forced_rescan() {
    let mut server = Server::new_async().await;
    let refresh = server
        .mock("GET", "/library/sections/3/refresh")
        .match_header("x-plex-token", TOKEN)
        .with_status(200)
        .create_async()
        .await;
    let rescan = server
        .mock("GET", "/library/sections/3/refresh")
        .match_query(Matcher::UrlEncoded("force".into(), "1".into()))
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    client.refresh_section("3", false).await.unwrap();
    client.refresh_section("3", true).await.unwrap();

    refresh.assert_async().await;
    rescan.assert_async().await;
}

#[tokio::test]
async fn test_refresh_rejects_path_injection() {
    let server = Server::new_async().await;
    let err = client_for(&server)
        .refresh_section("../../identity", false)
        .await
        .unwrap_err();

    assert!(matches!(err, PlexError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = PlexClient::new("http://127.0.0.1:1", TOKEN).unwrap();
    let err = client.identity().await.unwrap_err();

    assert!(err.is_unreachable(), "expected unreachable, got {:?}", err);
}
