//! Integration tests for the request pipeline

use super::*;
use integrations_minimax::{ErrorKind, ListParams, PagedResult, RequestOptions};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};

async fn logged_in_client(server: &MockServer, config: MinimaxConfig) -> MinimaxClient {
    mount_password_grant(server, "access-1").await;
    let client = client_for(config);
    client.login("jane", "pw").await.unwrap();
    client.set_organization_id("7");
    client
}

#[tokio::test]
async fn test_concurrency_conflict_exposes_current_row_version() {
    let server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/API/api/orgs/7/customers/1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Concurrency conflict. Current RowVersion: xyz789"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let current = json!({"CustomerId": 1, "Name": "Acme", "RowVersion": "abc123"});

    let err = client
        .customers()
        .update::<Value, _>("1", &current, &json!({"Name": "Acme Ltd"}))
        .await
        .unwrap_err();

    assert!(err.is_concurrency());
    assert_eq!(err.status_code(), Some(409));
    assert_eq!(err.current_row_version(), Some("xyz789"));
}

#[tokio::test]
async fn test_update_sends_row_version() {
    let server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/API/api/orgs/7/customers/1"))
        .and(header("X-Organization-Id", "7"))
        .and(header("Authorization", "Bearer access-1"))
        .and(body_partial_json(json!({"Name": "Acme Ltd", "RowVersion": "abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CustomerId": 1, "Name": "Acme Ltd", "RowVersion": "def456"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let current = json!({"CustomerId": 1, "Name": "Acme", "RowVersion": "abc123"});

    let updated: Value = client
        .customers()
        .update("1", &current, &json!({"Name": "Acme Ltd"}))
        .await
        .unwrap();
    assert_eq!(updated["RowVersion"], "def456");
}

#[tokio::test]
async fn test_server_errors_retried_then_succeed() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/journals/3"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/journals/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"JournalId": 3})))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;

    let started = std::time::Instant::now();
    let journal: Value = client.journals().get("3").await.unwrap();
    assert_eq!(journal["JournalId"], 3);
    // 20ms + 40ms + 80ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(140));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/employees/1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"Message": "boom"})))
        .expect(4)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let err = client.employees().get::<Value>("1").await.unwrap_err();

    assert_eq!(*err.kind(), ErrorKind::Server);
    assert_eq!(err.message(), "boom");
}

#[tokio::test]
async fn test_validation_error_payload() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/API/api/orgs/7/issuedinvoices"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "Message": "Validation failed",
            "ValidationErrors": [{"Field": "Customer", "Error": "Required"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let err = client
        .invoices()
        .create::<Value, _>(&json!({"Rows": []}))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), ErrorKind::Validation { .. }));
    assert_eq!(err.validation_errors().unwrap()[0]["Field"], "Customer");
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/customers/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let err = client.customers().get::<Value>("404").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_request_timeout_is_network_error() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/customers/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server)
        .timeout(Duration::from_millis(100))
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();
    let client = logged_in_client(&server, config).await;

    let err = client.customers().get::<Value>("1").await.unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::Network { timed_out: true });
}

#[tokio::test]
async fn test_list_with_paging_and_delete() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/7/customers"))
        .and(query_param("CurrentPage", "2"))
        .and(query_param("PageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Rows": [{"CustomerId": 2, "RowVersion": "rv2"}],
            "TotalRows": 3,
            "CurrentPageNumber": 2,
            "PageSize": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/API/api/orgs/7/customers/2"))
        .and(query_param("rowVersion", "rv2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server, config_for(&server).build().unwrap()).await;
    let customers = client.customers();

    let page: PagedResult<Value> = customers.list(&ListParams::page(2, 1)).await.unwrap();
    assert_eq!(page.total_rows, 3);
    assert!(page.has_more());

    let row = &page.rows[0];
    customers
        .delete("2", row["RowVersion"].as_str())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthenticated_call_skips_token() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/API/api/public/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).build().unwrap());
    let pong: Value = client
        .http()
        .get("api/public/ping", RequestOptions::new().unauthenticated())
        .await
        .unwrap();
    assert_eq!(pong["ok"], true);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
