#![allow(clippy::unwrap_used)]
// Integration tests for `PoolCareClient` using wiremock.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolcare_api::{Credentials, Device, Error, PoolCareClient, select_primary};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PoolCareClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/prod", server.uri())).unwrap();
    let client = PoolCareClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn login_body() -> serde_json::Value {
    json!({
        "credentials": {"access_key": "AK", "secret_key": "SK", "session_token": "TOK"},
        "identity_id": "eu-west-1:abc",
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/prod/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(server)
        .await;
}

async fn login(server: &MockServer, client: &PoolCareClient) -> Credentials {
    mount_login(server).await;
    client.authenticate("a@b.c", &secret("pw")).await.unwrap()
}

fn device() -> Device {
    Device {
        pool_id: "p1".into(),
        blue_key: "bk1".into(),
    }
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/prod/user/login"))
        .and(body_json(json!({"email": "a@b.c", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .expect(1)
        .mount(&server)
        .await;

    let creds = client.authenticate("a@b.c", &secret("pw")).await.unwrap();

    assert_eq!(creds.access_key, "AK");
    assert_eq!(creds.secret_key.expose_secret(), "SK");
    assert_eq!(creds.session_token.expose_secret(), "TOK");
    assert_eq!(creds.region, "eu-west-1");
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/prod/user/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = client.authenticate("a@b.c", &secret("wrong")).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_without_identity_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/prod/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": {"access_key": "AK", "secret_key": "SK", "session_token": "TOK"},
        })))
        .mount(&server)
        .await;

    let result = client.authenticate("a@b.c", &secret("pw")).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_login_non_json_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/prod/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client.authenticate("a@b.c", &secret("pw")).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_login_unreachable_is_transport_error() {
    let client = PoolCareClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1/prod").unwrap(),
    );

    let result = client.authenticate("a@b.c", &secret("pw")).await;
    assert!(matches!(result, Err(Error::Transport(_))), "got {result:?}");
}

// ── Device discovery ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_sends_signed_listing_query() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/pools"))
        .and(query_param("page", "1"))
        .and(query_param("results", "15"))
        .and(query_param("sortField", "user_lastname"))
        .and(query_param("sortOrder", "ASC"))
        .and(header("content-type", "application/json"))
        .and(header("x-amz-security-token", "TOK"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"pool_id": "p1", "blue_key": "bk1", "name": "Backyard"},
                {"pool_id": "p2"},
                {"pool_id": "p3", "blue_key": "bk3"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices(&creds).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0], device());
    assert_eq!(devices[1].pool_id, "p3");
}

#[tokio::test]
async fn test_authorization_header_scope() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/pools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    client.list_devices(&creds).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let pools = requests
        .iter()
        .find(|r| r.url.path() == "/prod/pools")
        .unwrap();
    let auth = pools
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();

    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AK/"));
    assert!(auth.contains("/eu-west-1/execute-api/aws4_request"));
    assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
}

#[tokio::test]
async fn test_empty_listing_yields_no_devices_found() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/pools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let devices = client.list_devices(&creds).await.unwrap();
    assert!(devices.is_empty());
    assert!(matches!(select_primary(devices), Err(Error::NoDevicesFound)));
}

#[tokio::test]
async fn test_listing_http_error_is_request_error() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/pools"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client.list_devices(&creds).await.unwrap_err();
    assert!(
        matches!(err, Error::Request { status: 403, ref body } if body == "Forbidden"),
        "got {err:?}"
    );
    assert!(err.is_not_found());
}

// ── Measurements ────────────────────────────────────────────────────

#[tokio::test]
async fn test_last_measurements() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/swimming_pool/p1/blue/bk1/lastMeasurements"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "blue_device_serial": "S1",
            "last_blue_measure_timestamp": "2024-06-01T10:00:00Z",
            "data": [
                {"name": "temperature", "value": 26.4, "timestamp": "2024-06-01T10:00:00Z",
                 "expired": false, "trend": "stable", "ok_min": 20, "ok_max": 30},
                {"name": "ph", "value": 7.2},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .last_measurements(&creds, &device())
        .await
        .unwrap()
        .ensure_ok()
        .unwrap();

    assert_eq!(resp.blue_device_serial.as_deref(), Some("S1"));
    assert_eq!(resp.data.len(), 2);
    assert_eq!(resp.data[0].trend.as_deref(), Some("stable"));
    assert_eq!(resp.data[1].name.as_deref(), Some("ph"));
}

#[tokio::test]
async fn test_degraded_measurements_status() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/swimming_pool/p1/blue/bk1/lastMeasurements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "KO"})))
        .mount(&server)
        .await;

    let resp = client.last_measurements(&creds, &device()).await.unwrap();
    assert!(matches!(
        resp.ensure_ok(),
        Err(Error::DegradedResponse { ref status }) if status == "KO"
    ));
}

#[tokio::test]
async fn test_measurements_invalid_json_is_deserialization_error() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/swimming_pool/p1/blue/bk1/lastMeasurements"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.last_measurements(&creds, &device()).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_measurements_server_error_is_transient() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("GET"))
        .and(path("/prod/swimming_pool/p1/blue/bk1/lastMeasurements"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client.last_measurements(&creds, &device()).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.is_transient());
}

// ── Generic signed requests ─────────────────────────────────────────

#[tokio::test]
async fn test_signed_post_carries_body() {
    let (server, client) = setup().await;
    let creds = login(&server, &client).await;

    Mock::given(method("POST"))
        .and(path("/prod/echo"))
        .and(body_json(json!({"hello": "pool"})))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/prod/echo", server.uri())).unwrap();
    let value = client
        .signed_request(
            reqwest::Method::POST,
            url,
            &creds,
            Some(&json!({"hello": "pool"})),
        )
        .await
        .unwrap();

    assert_eq!(value, json!({"ok": true}));
}
