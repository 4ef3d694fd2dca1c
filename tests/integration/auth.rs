//! Integration tests for authentication and token refresh

use super::*;
use integrations_minimax::{
    Credentials, ErrorKind, FileTokenStore, Token, TokenStore, TokenStoreConfig,
};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, path_regex};

fn stale_token() -> Token {
    Token {
        access_token: "stale-access".to_string(),
        token_type: "Bearer".to_string(),
        expires_in: Some(3600),
        refresh_token: Some("refresh-1".to_string()),
        obtained_at: Some(chrono::Utc::now().timestamp_millis() - 2 * 3_600_000),
    }
}

#[tokio::test]
async fn test_login_success() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .and(body_string_contains("username=jane%40example.com"))
        .and(body_string_contains("scope=minimax.rs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("access-1", Some("refresh-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).build().unwrap());
    let token = client.login("jane@example.com", "s3cret").await.unwrap();

    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert!(token.obtained_at.is_some());

    let state = client.session_state().await.unwrap();
    assert!(state.is_authenticated);
    assert_eq!(state.token, Some(token));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The user name or password is incorrect."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).build().unwrap());
    let err = client
        .login_with(&Credentials::new("jane@example.com", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(
        err.message(),
        "invalid_grant: The user name or password is incorrect."
    );
    assert!(!client.session_state().await.unwrap().is_authenticated);
}

#[tokio::test]
async fn test_token_endpoint_server_error() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).build().unwrap());
    let err = client.login("jane", "pw").await.unwrap_err();

    assert_eq!(*err.kind(), ErrorKind::Server);
    assert_eq!(err.status_code(), Some(502));
}

#[tokio::test]
async fn test_stale_file_token_is_refreshed() {
    let server = setup_mock_server().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("session/token.json");

    FileTokenStore::new(&token_path)
        .save(&stale_token())
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh-access", None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/customers/1"))
        .and(header("Authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"CustomerId": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server)
        .token_store(TokenStoreConfig::File {
            path: token_path.clone(),
            create_dir: true,
        })
        .build()
        .unwrap();
    let client = client_for(config);
    client.set_organization_id("7");

    let customer: Value = client.customers().get("1").await.unwrap();
    assert_eq!(customer["CustomerId"], 1);

    let persisted = FileTokenStore::new(&token_path).load().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "fresh-access");
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_refresh() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("fresh-access", Some("refresh-2")))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/API/api/orgs/7/customers/\d+$"))
        .and(header("Authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"CustomerId": 1})))
        .expect(8)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(config_for(&server).build().unwrap()));
    client
        .session()
        .coordinator()
        .client()
        .store()
        .save(&stale_token())
        .await
        .unwrap();
    client.set_organization_id("7");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .customers()
                    .get::<Value>(&i.to_string())
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let token = client.session().get_auth_token().await.unwrap();
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_rejected_refresh_is_not_retried() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).default_org_id("7").build().unwrap());
    client
        .session()
        .coordinator()
        .client()
        .store()
        .save(&stale_token())
        .await
        .unwrap();
    client.set_organization_id("7");

    let err = client.customers().get::<Value>("1").await.unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(err.status_code(), Some(401));
    assert!(err
        .message()
        .starts_with("session is not authenticated or token refresh failed"));
    assert_eq!(err.inner().unwrap().message(), "invalid_grant");
}

#[tokio::test]
async fn test_refresh_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = minimax_config()
        .client_id("test-client")
        .client_secret("test-secret")
        .base_url(format!("{}/API/", uri))
        .auth_url(format!("{}{}", uri, TOKEN_PATH))
        .retry(RetryConfig::disabled())
        .refresh(fast_refresh())
        .build()
        .unwrap();
    let client = client_for(config);
    client
        .session()
        .coordinator()
        .client()
        .store()
        .save(&stale_token())
        .await
        .unwrap();

    let err = client.session().get_auth_token().await.unwrap_err();
    assert!(err.is_network());
    assert!(err.is_retryable());
}
