use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use winops_agent::AgentServer;
use winops_core::model::ServiceAction;

mod common;
use common::fake_hosts::{fake_host, FakeHost, HOSTNAME};

const SECRET: &str = "router-secret";

fn app() -> (Router, FakeHost) {
    let host = fake_host();
    let router = AgentServer::new(SECRET, host.collaborators.clone()).router();
    (router, host)
}

async fn call(
    router: Router,
    method: Method,
    uri: &str,
    secret: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = secret {
        builder = builder.header("X-API-Key", secret);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn root_reports_version() {
    let (router, _) = app();
    let (status, body) = call(router, Method::GET, "/", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn wrong_or_missing_secret_is_unauthorized() {
    let (router, _) = app();
    for secret in [Some("nope"), None] {
        let (status, body) = call(router.clone(), Method::GET, "/services", secret, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({ "success": false, "message": "Invalid API key", "data": null })
        );
    }
}

#[tokio::test]
async fn system_info_passes_through() {
    let (router, _) = app();
    let (status, body) = call(router, Method::GET, "/system", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hostname"], HOSTNAME);
}

#[tokio::test]
async fn bogus_service_action_is_bad_request() {
    let (router, host) = app();
    let (status, body) = call(
        router,
        Method::POST,
        "/services/svc/action",
        Some(SECRET),
        Some(json!({ "action": "bogus-action" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid action: bogus-action");
    assert!(host.services.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn service_action_reaches_the_host() {
    let (router, host) = app();
    let (status, body) = call(
        router,
        Method::POST,
        "/services/svc/action",
        Some(SECRET),
        Some(json!({ "action": "restart" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service 'svc' restarted successfully");
    assert_eq!(
        *host.services.calls.lock().unwrap(),
        vec![("svc".to_string(), ServiceAction::Restart)]
    );
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (router, _) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/environment")
        .header("X-API-Key", SECRET)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn non_numeric_pid_is_bad_request() {
    let (router, _) = app();
    let (status, body) = call(router, Method::GET, "/processes/abc", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_pid_is_not_found() {
    let (router, _) = app();
    let (status, body) = call(router.clone(), Method::GET, "/processes/7", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Process with PID 7 not found");

    let (status, _) = call(router, Method::DELETE, "/processes/7", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn host_failure_is_internal_error() {
    let (router, _) = app();
    let (status, body) = call(router, Method::DELETE, "/processes/1", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn panicking_host_is_internal_error() {
    let (router, _) = app();
    let (status, body) = call(router, Method::GET, "/processes/666", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found_envelope() {
    let (router, _) = app();
    let (status, body) = call(router, Method::GET, "/nope", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn environment_scope_defaults_to_system() {
    let (router, host) = app();
    let (status, _) = call(
        router.clone(),
        Method::POST,
        "/environment",
        Some(SECRET),
        Some(json!({ "name": "WOT_TEST", "value": "v1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        host.environment
            .vars
            .lock()
            .unwrap()
            .get(&(true, "WOT_TEST".to_string()))
            .cloned(),
        Some("v1".to_string())
    );

    let (status, _) = call(
        router.clone(),
        Method::DELETE,
        "/environment/WOT_TEST?is_system=false",
        Some(SECRET),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "user scope was never set");

    let (status, body) = call(
        router,
        Method::DELETE,
        "/environment/WOT_TEST",
        Some(SECRET),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Environment variable 'WOT_TEST' deleted successfully");
}

#[tokio::test]
async fn invalid_variable_name_is_bad_request() {
    let (router, _) = app();
    let (status, _) = call(
        router,
        Method::POST,
        "/environment",
        Some(SECRET),
        Some(json!({ "name": "", "value": "x", "is_system": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
