//! A minimal in-process stand-in for a winops agent.
//!
//! It speaks the real wire protocol (`X-API-Key` header, `{success, message,
//! data}` bodies) on a loopback port, so registry and remote-manager tests
//! exercise the real HTTP client without needing the agent crate.
//!
//! `/system` reports the agent's `label` as hostname, which lets tests tell
//! which agent answered.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SECRET: &str = "test-secret";

#[derive(Clone)]
struct FakeState {
    label: String,
}

pub struct FakeAgent {
    pub port: u16,
    task: JoinHandle<()>,
}

impl FakeAgent {
    /// Start an agent answering to [`SECRET`] on a free loopback port.
    pub async fn start(label: &str) -> Self {
        let state = FakeState {
            label: label.to_string(),
        };
        let app = Router::new()
            .route("/", get(root))
            .route("/system", get(system))
            .route("/services", get(services))
            .route("/services/:name/action", post(service_action))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { port, task }
    }

    /// Stop answering; later connection tests see "connection refused".
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// A port nothing is listening on.
pub async fn unreachable_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    listener.local_addr().expect("local addr").port()
    // listener dropped here, so the port is closed again
}

fn envelope(status: StatusCode, success: bool, message: &str, data: Value) -> Response {
    (
        status,
        Json(json!({ "success": success, "message": message, "data": data })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        Some(SECRET) => Ok(()),
        _ => Err(envelope(
            StatusCode::UNAUTHORIZED,
            false,
            "Invalid API key",
            Value::Null,
        )),
    }
}

async fn root(headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    envelope(StatusCode::OK, true, "fake agent", Value::Null)
}

async fn system(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    envelope(
        StatusCode::OK,
        true,
        "System information retrieved",
        json!({
            "hostname": state.label,
            "os_name": "FakeOS",
            "os_version": "1.0",
            "system_type": "64-bit",
            "processor": "fake",
            "memory_total": 1024,
            "memory_available": 512,
            "boot_time": 0
        }),
    )
}

async fn services(headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    envelope(
        StatusCode::OK,
        true,
        "Services retrieved",
        json!([{
            "name": "svc",
            "display_name": "Fake Service",
            "status": "running",
            "start_type": "auto",
            "description": null
        }]),
    )
}

async fn service_action(
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let action = body["action"].as_str().unwrap_or_default();
    match action {
        "start" | "stop" | "restart" | "pause" | "resume" => envelope(
            StatusCode::OK,
            true,
            &format!("Service {name} {action} successful"),
            Value::Null,
        ),
        other => envelope(
            StatusCode::BAD_REQUEST,
            false,
            &format!("Invalid action: {other}"),
            Value::Null,
        ),
    }
}
