//! Integration tests using WireMock
//!
//! These tests drive the full client against a mock HTTP server: token
//! endpoint, refresh, organization scoping, RowVersion handling, error
//! classification and retry.

mod auth;
mod pipeline;
mod session;

use integrations_minimax::{
    minimax_config, MinimaxClient, MinimaxConfig, RefreshConfig, RetryConfig,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth/token";

/// Helper to create a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Retry and refresh tuned for fast tests.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(20),
        jitter: 0.0,
        ..RetryConfig::default()
    }
}

pub fn fast_refresh() -> RefreshConfig {
    RefreshConfig {
        refresh_retry_delay: Duration::from_millis(10),
        ..RefreshConfig::default()
    }
}

/// Configuration pointing both endpoints at the mock server.
pub fn config_for(server: &MockServer) -> integrations_minimax::MinimaxConfigBuilder {
    minimax_config()
        .client_id("test-client")
        .client_secret("test-secret")
        .base_url(format!("{}/API/", server.uri()))
        .auth_url(format!("{}{}", server.uri(), TOKEN_PATH))
        .retry(fast_retry())
        .refresh(fast_refresh())
}

pub fn client_for(config: MinimaxConfig) -> MinimaxClient {
    MinimaxClient::new(config).expect("Failed to build client")
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    body
}

/// Mount a password-grant token endpoint.
pub async fn mount_password_grant(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body(access_token, Some("refresh-1"))),
        )
        .mount(server)
        .await;
}
