//! Integration tests for the Discord profile client
//!
//! Uses a mock HTTP server to simulate `GET /users/@me`.

use filestage::auth::{AccessToken, DiscordClient, ProfileSource};
use filestage::error::AppError;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn client(server: &MockServer) -> DiscordClient {
    DiscordClient::new(reqwest::Client::new(), server.uri())
}

#[tokio::test]
async fn test_fetch_profile_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "42",
            "username": "alice",
            "avatar": "ab12",
            "discriminator": "0001",
            "locale": "en-GB",
            "mfa_enabled": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = client(&server)
        .fetch_profile(&AccessToken::new("abc123"))
        .await
        .unwrap();

    assert_eq!(user.id, "42");
    assert_eq!(user.avatar.as_deref(), Some("ab12"));
    assert_eq!(user.locale.as_deref(), Some("en-GB"));
    assert_eq!(user.mfa_enabled, Some(false));
}

#[tokio::test]
async fn test_fetch_profile_maps_http_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let error = client(&server)
        .fetch_profile(&AccessToken::new("expired"))
        .await
        .expect_err("401 must fail");

    assert!(matches!(error, AppError::Identity(message) if message.contains("401")));
}

#[tokio::test]
async fn test_fetch_profile_rejects_incomplete_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "42"})))
        .mount(&server)
        .await;

    let error = client(&server)
        .fetch_profile(&AccessToken::new("T"))
        .await
        .expect_err("missing username must fail");

    assert!(matches!(error, AppError::HttpClient(_)));
}

#[tokio::test]
async fn test_fetch_profile_reports_network_failure() {
    // Nothing listens on a port we just released
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let error = DiscordClient::new(reqwest::Client::new(), uri)
        .fetch_profile(&AccessToken::new("T"))
        .await
        .expect_err("closed port must fail");

    assert!(matches!(error, AppError::HttpClient(_)));
}
