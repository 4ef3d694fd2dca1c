//! Integration tests for session and organization handling

use super::*;
use integrations_minimax::{ErrorKind, ListParams, ORGANIZATION_HEADER};
use wiremock::matchers::{header, method, path};

#[tokio::test]
async fn test_login_selects_default_organization() {
    let server = setup_mock_server().await;
    mount_password_grant(&server, "access-1").await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/100/customers/1"))
        .and(header(ORGANIZATION_HEADER, "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"CustomerId": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).default_org_id("100").build().unwrap());
    assert_eq!(client.organization_id(), None);

    client.login("jane", "pw").await.unwrap();
    assert_eq!(client.organization_id().as_deref(), Some("100"));

    let _: Value = client.customers().get("1").await.unwrap();
}

#[tokio::test]
async fn test_selected_organization_survives_relogin() {
    let server = setup_mock_server().await;
    mount_password_grant(&server, "access-1").await;

    let client = client_for(config_for(&server).default_org_id("100").build().unwrap());
    client.login("jane", "pw").await.unwrap();
    client.set_organization_id("200");

    client.login("jane", "pw").await.unwrap();
    assert_eq!(client.organization_id().as_deref(), Some("200"));
}

#[tokio::test]
async fn test_per_call_organization_override() {
    let server = setup_mock_server().await;
    mount_password_grant(&server, "access-1").await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/300/journals/5"))
        .and(header(ORGANIZATION_HEADER, "300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"JournalId": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).default_org_id("100").build().unwrap());
    client.login("jane", "pw").await.unwrap();

    let journal: Value = client
        .journals()
        .in_organization("300")
        .get("5")
        .await
        .unwrap();
    assert_eq!(journal["JournalId"], 5);
    assert_eq!(client.organization_id().as_deref(), Some("100"));
}

#[tokio::test]
async fn test_list_user_organizations() {
    let server = setup_mock_server().await;
    mount_password_grant(&server, "access-1").await;

    Mock::given(method("GET"))
        .and(path("/API/api/currentuser/orgs"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Rows": [
                {"Organisation": {"ID": 100, "Name": "Acme d.o.o."}, "ApiAccess": true},
                {"Organisation": {"ID": 200, "Name": "Beta d.o.o."}, "ApiAccess": true}
            ],
            "TotalRows": 2,
            "CurrentPageNumber": 1,
            "PageSize": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).build().unwrap());
    client.login("jane", "pw").await.unwrap();

    let orgs = client
        .organizations()
        .list(&ListParams::default())
        .await
        .unwrap();
    assert_eq!(orgs.total_rows, 2);
    assert!(!orgs.has_more());

    let requests = server.received_requests().await.unwrap();
    let org_call = requests
        .iter()
        .find(|r| r.url.path() == "/API/api/currentuser/orgs")
        .unwrap();
    assert!(org_call.headers.get("x-organization-id").is_none());
}

#[tokio::test]
async fn test_logout_requires_new_login() {
    let server = setup_mock_server().await;
    mount_password_grant(&server, "access-1").await;

    Mock::given(method("GET"))
        .and(path("/API/api/orgs/100/customers/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"CustomerId": 1})))
        .mount(&server)
        .await;

    let client = client_for(config_for(&server).default_org_id("100").build().unwrap());
    client.login("jane", "pw").await.unwrap();
    let _: Value = client.customers().get("1").await.unwrap();

    client.logout().await.unwrap();
    let state = client.session_state().await.unwrap();
    assert!(!state.is_authenticated);
    assert_eq!(state.token, None);
    assert_eq!(state.organization_id, None);

    let err = client
        .customers()
        .in_organization("100")
        .get::<Value>("1")
        .await
        .unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(*err.kind(), ErrorKind::Authentication);
}
