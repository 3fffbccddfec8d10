//! Director client against a mock director.

use serde_json::json;
use signalfire_core::config::{TargetAuth, TargetConfig};
use signalfire_core::{DirectorClient, DirectorError};
use signalfire_director::HttpDirector;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target(url: String) -> TargetConfig {
    TargetConfig {
        auth: TargetAuth {
            client_id: "admin".into(),
            client_secret: "secret".into(),
        },
        ..TargetConfig::new(url)
    }
}

async fn mount_info(server: &MockServer, auth: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "lab",
            "uuid": "uuid-lab",
            "user_authentication": auth,
        })))
        .mount(server)
        .await;
}

fn deployments_body() -> serde_json::Value {
    json!([
        {
            "name": "api-prod",
            "releases": [{"name": "app", "version": "2.1"}],
            "stemcells": [{"name": "ubuntu", "version": "1.5"}]
        },
        {"name": "empty", "releases": []}
    ])
}

async fn connect(server: &MockServer) -> Result<HttpDirector, DirectorError> {
    let target = target(server.uri());
    tokio::task::spawn_blocking(move || HttpDirector::connect(&target))
        .await
        .expect("join")
}

#[tokio::test(flavor = "multi_thread")]
async fn basic_auth_director_lists_deployments() {
    let server = MockServer::start().await;
    mount_info(&server, json!({"type": "basic"})).await;
    Mock::given(method("GET"))
        .and(path("/deployments"))
        .and(header("Authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deployments_body()))
        .mount(&server)
        .await;

    let director = connect(&server).await.expect("connect");
    assert_eq!(director.name(), "lab");
    assert_eq!(director.uuid(), "uuid-lab");

    let deployments = tokio::task::spawn_blocking(move || director.list_deployments())
        .await
        .expect("join")
        .expect("deployments");
    assert_eq!(deployments.len(), 2);
    assert_eq!(deployments[0].name, "api-prod");
    assert_eq!(deployments[0].releases[0].version, "2.1");
    assert!(deployments[1].releases.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn uaa_director_uses_bearer_token() {
    let server = MockServer::start().await;
    mount_info(
        &server,
        json!({"type": "uaa", "options": {"url": format!("{}/uaa", server.uri())}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/uaa/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "expires_in": 600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deployments"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deployments_body()))
        .mount(&server)
        .await;

    let director = connect(&server).await.expect("connect");
    let deployments = tokio::task::spawn_blocking(move || director.list_deployments())
        .await
        .expect("join")
        .expect("deployments");
    assert_eq!(deployments.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_uaa_credentials_fail_connect() {
    let server = MockServer::start().await;
    mount_info(
        &server,
        json!({"type": "uaa", "options": {"url": format!("{}/uaa", server.uri())}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/uaa/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = connect(&server).await.unwrap_err();
    assert!(matches!(err, DirectorError::Authentication(_)), "got: {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_deployments_is_an_authentication_error() {
    let server = MockServer::start().await;
    mount_info(&server, json!({"type": "basic"})).await;
    Mock::given(method("GET"))
        .and(path("/deployments"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let director = connect(&server).await.expect("connect");
    let err = tokio::task::spawn_blocking(move || director.list_deployments())
        .await
        .expect("join")
        .unwrap_err();
    assert!(matches!(err, DirectorError::Authentication(_)), "got: {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_a_status_error() {
    let server = MockServer::start().await;
    mount_info(&server, json!({"type": "basic"})).await;
    Mock::given(method("GET"))
        .and(path("/deployments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let director = connect(&server).await.expect("connect");
    let err = tokio::task::spawn_blocking(move || director.list_deployments())
        .await
        .expect("join")
        .unwrap_err();
    assert!(
        matches!(err, DirectorError::Status { code: 500, .. }),
        "got: {err}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_info(&server, json!({"type": "basic"})).await;
    Mock::given(method("GET"))
        .and(path("/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let director = connect(&server).await.expect("connect");
    let err = tokio::task::spawn_blocking(move || director.list_deployments())
        .await
        .expect("join")
        .unwrap_err();
    assert!(matches!(err, DirectorError::Decode { .. }), "got: {err}");
}

#[test]
fn unreachable_director_is_a_transport_error() {
    // Port 9 (discard) on loopback is closed on any sane test host.
    let err = HttpDirector::connect(&target("http://127.0.0.1:9".into())).unwrap_err();
    assert!(matches!(err, DirectorError::Transport { .. }), "got: {err}");
}

#[test]
fn unparseable_ca_cert_fails_before_any_request() {
    let target = TargetConfig {
        ca_cert: Some("not a certificate".into()),
        ..target("https://127.0.0.1:9".into())
    };
    let err = HttpDirector::connect(&target).unwrap_err();
    assert!(matches!(err, DirectorError::InvalidTarget(_)), "got: {err}");
}
