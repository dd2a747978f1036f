//! Remote source download tests against a local mock server

use std::collections::BTreeMap;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recplay::application::ports::NativeError;
use recplay::infrastructure::platform::desktop::fetch_remote;

async fn serve(status: u16, body: &'static [u8]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clip.wav"))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn downloads_body() {
    let server = serve(200, b"RIFF....WAVE").await;
    let url = format!("{}/clip.wav", server.uri());

    let bytes = fetch_remote(&reqwest::Client::new(), &url, &BTreeMap::new())
        .await
        .unwrap();
    assert_eq!(bytes, b"RIFF....WAVE");
}

#[tokio::test]
async fn forwards_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private.wav"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("X-Client", "recplay"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"ok"[..]))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), "Bearer abc".to_string());
    headers.insert("X-Client".to_string(), "recplay".to_string());
    let url = format!("{}/private.wav", server.uri());

    let bytes = fetch_remote(&reqwest::Client::new(), &url, &headers)
        .await
        .unwrap();
    assert_eq!(bytes, b"ok");
}

#[tokio::test]
async fn missing_headers_do_not_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // Unmatched requests get a 404 from the mock server.
    let url = format!("{}/private.wav", server.uri());
    let err = fetch_remote(&reqwest::Client::new(), &url, &BTreeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, NativeError::Unavailable(_)));
}

#[tokio::test]
async fn auth_failures_map_to_permission_denied() {
    for status in [401, 403] {
        let server = serve(status, b"").await;
        let url = format!("{}/clip.wav", server.uri());

        let err = fetch_remote(&reqwest::Client::new(), &url, &BTreeMap::new())
            .await
            .unwrap_err();
        match err {
            NativeError::PermissionDenied(msg) => assert!(msg.contains(&status.to_string())),
            other => panic!("expected PermissionDenied for {}, got {:?}", status, other),
        }
    }
}

#[tokio::test]
async fn other_statuses_are_unavailable() {
    for status in [404, 500] {
        let server = serve(status, b"").await;
        let url = format!("{}/clip.wav", server.uri());

        let err = fetch_remote(&reqwest::Client::new(), &url, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, NativeError::Unavailable(ref msg) if msg.contains("HTTP")),
            "{:?}",
            err
        );
    }
}

#[tokio::test]
async fn unreachable_host_is_unavailable() {
    let server = MockServer::start().await;
    let url = format!("{}/clip.wav", server.uri());
    drop(server);

    let err = fetch_remote(&reqwest::Client::new(), &url, &BTreeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, NativeError::Unavailable(_)));
}
