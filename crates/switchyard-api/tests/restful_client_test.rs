#![allow(clippy::unwrap_used)]
// Integration tests for `RestfulClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchyard_api::{
    ActionCall, Error, Protocol, RestfulClient, RestfulConfig, SouthboundClient, Target,
    TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestfulClient) {
    let server = MockServer::start().await;
    let client = RestfulClient::new(RestfulConfig {
        scheme: "http".into(),
        port: Some(server.address().port()),
        transport: TransportConfig::default(),
    })
    .unwrap();
    (server, client)
}

fn password() -> SecretString {
    SecretString::from("moxa".to_owned())
}

fn target<'a>(server: &MockServer, password: &'a SecretString) -> Target<'a> {
    Target {
        address: server.address().ip(),
        username: "admin",
        password,
    }
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_returns_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "username": "admin", "password": "moxa" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let pw = password();
    let token = client.login(target(&server, &pw)).await.unwrap();
    assert_eq!(token, "tok-1");
    assert_eq!(client.protocol(), Protocol::Restful);
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let pw = password();
    let result = client.login(target(&server, &pw)).await;
    assert!(
        matches!(result, Err(Error::Unauthorized { .. })),
        "expected Unauthorized error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_without_token_field() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let pw = password();
    let result = client.login(target(&server, &pw)).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn test_check_connection_uses_login() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let pw = password();
    client.check_connection(target(&server, &pw)).await.unwrap();
}

// ── Action tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_execute_get_with_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/vlans"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "vlan_id": 1, "name": "default" }
        ])))
        .mount(&server)
        .await;

    let pw = password();
    let params = json!({ "method": "GET", "path": "/api/v1/vlans" });
    let value = client
        .execute(ActionCall {
            target: target(&server, &pw),
            token: Some("tok-1"),
            action: "GetVLAN",
            params: &params,
            payload: None,
        })
        .await
        .unwrap();

    assert_eq!(value[0]["vlan_id"], 1);
}

#[tokio::test]
async fn test_execute_put_sends_payload_and_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/vlans"))
        .and(body_json(json!({ "add": [10, 20] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let pw = password();
    let params = json!({ "method": "PUT", "path": "/api/v1/vlans" });
    let payload = json!({ "add": [10, 20] });
    let value = client
        .execute(ActionCall {
            target: target(&server, &pw),
            token: Some("tok-1"),
            action: "AddVLAN",
            params: &params,
            payload: Some(&payload),
        })
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn test_execute_maps_status_codes() {
    let (server, client) = setup().await;

    for (route, status) in [
        ("/api/v1/unauthorized", 401),
        ("/api/v1/busy", 503),
        ("/api/v1/missing", 404),
        ("/api/v1/invalid", 400),
        ("/api/v1/broken", 500),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;
    }

    let pw = password();
    let call = |route: &'static str| {
        let params = json!({ "method": "GET", "path": route });
        let client = &client;
        let target = target(&server, &pw);
        async move {
            client
                .execute(ActionCall {
                    target,
                    token: Some("tok-1"),
                    action: "Probe",
                    params: &params,
                    payload: None,
                })
                .await
        }
    };

    assert!(call("/api/v1/unauthorized").await.unwrap_err().is_auth_expired());
    assert!(call("/api/v1/busy").await.unwrap_err().is_unavailable());
    assert!(call("/api/v1/missing").await.unwrap_err().is_not_found());
    assert!(matches!(
        call("/api/v1/invalid").await,
        Err(Error::BadRequest { .. })
    ));
    assert!(matches!(
        call("/api/v1/broken").await,
        Err(Error::Http { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_execute_rejects_binding_without_route() {
    let (server, client) = setup().await;

    let pw = password();
    let params = json!({ "oid": "1.3.6.1.2.1.17.7.1.4.3" });
    let result = client
        .execute(ActionCall {
            target: target(&server, &pw),
            token: Some("tok-1"),
            action: "GetVLAN",
            params: &params,
            payload: None,
        })
        .await;

    assert!(matches!(result, Err(Error::UnsupportedAction { .. })));
}
