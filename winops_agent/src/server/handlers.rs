//! Route handlers. Each one runs a single host call on the blocking pool and
//! wraps its result in an envelope; nothing else happens here.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use winops_core::host::HostResult;
use winops_core::model::{EnvironmentVariable, ServiceAction};
use winops_core::Envelope;

use super::error::ApiError;
use super::AgentState;

type ApiResult = Result<Json<Envelope>, ApiError>;

async fn blocking<T, F>(call: F) -> Result<T, ApiError>
where
    F: FnOnce() -> HostResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Internal(format!("Host operation failed: {e}"))),
    }
}

fn with_data<T: Serialize>(message: impl Into<String>, value: T) -> ApiResult {
    let data = serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(Envelope::ok(message, Some(data))))
}

fn done(message: impl Into<String>) -> ApiResult {
    Ok(Json(Envelope::ok(message, None)))
}

pub async fn root() -> ApiResult {
    with_data(
        "winops agent is running",
        json!({ "version": env!("CARGO_PKG_VERSION") }),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}

pub async fn system_info(State(state): State<AgentState>) -> ApiResult {
    let host = state.host.system.clone();
    let info = blocking(move || host.info()).await?;
    with_data("System information retrieved successfully", info)
}

pub async fn list_services(State(state): State<AgentState>) -> ApiResult {
    let host = state.host.services.clone();
    let services = blocking(move || host.list()).await?;
    with_data("Services retrieved successfully", services)
}

pub async fn get_service(
    State(state): State<AgentState>,
    name: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let Path(name) = name?;
    let host = state.host.services.clone();
    let lookup = name.clone();
    let service = blocking(move || host.get(&lookup)).await?;
    with_data(format!("Service '{name}' retrieved successfully"), service)
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    action: String,
}

fn past_tense(action: ServiceAction) -> &'static str {
    match action {
        ServiceAction::Start => "started",
        ServiceAction::Stop => "stopped",
        ServiceAction::Restart => "restarted",
        ServiceAction::Pause => "paused",
        ServiceAction::Resume => "resumed",
    }
}

pub async fn service_action(
    State(state): State<AgentState>,
    name: Result<Path<String>, PathRejection>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult {
    let Path(name) = name?;
    let Json(body) = body?;
    let action: ServiceAction = body
        .action
        .parse()
        .map_err(|e: winops_core::model::InvalidAction| ApiError::BadRequest(e.to_string()))?;

    let host = state.host.services.clone();
    let target = name.clone();
    blocking(move || host.control(&target, action)).await?;
    done(format!(
        "Service '{name}' {} successfully",
        past_tense(action)
    ))
}

pub async fn list_processes(State(state): State<AgentState>) -> ApiResult {
    let host = state.host.processes.clone();
    let processes = blocking(move || host.list()).await?;
    with_data("Processes retrieved successfully", processes)
}

pub async fn get_process(
    State(state): State<AgentState>,
    pid: Result<Path<u32>, PathRejection>,
) -> ApiResult {
    let Path(pid) = pid?;
    let host = state.host.processes.clone();
    let process = blocking(move || host.get(pid)).await?;
    with_data(format!("Process {pid} retrieved successfully"), process)
}

pub async fn terminate_process(
    State(state): State<AgentState>,
    pid: Result<Path<u32>, PathRejection>,
) -> ApiResult {
    let Path(pid) = pid?;
    let host = state.host.processes.clone();
    blocking(move || host.terminate(pid)).await?;
    done(format!("Process {pid} terminated successfully"))
}

pub async fn list_environment(State(state): State<AgentState>) -> ApiResult {
    let host = state.host.environment.clone();
    let vars = blocking(move || host.list()).await?;
    with_data("Environment variables retrieved successfully", vars)
}

/// Upsert; `is_system` defaults to `true` when omitted.
pub async fn set_environment(
    State(state): State<AgentState>,
    body: Result<Json<EnvironmentVariable>, JsonRejection>,
) -> ApiResult {
    let Json(var) = body?;
    let host = state.host.environment.clone();
    let name = var.name.clone();
    blocking(move || host.set(&var.name, &var.value, var.is_system)).await?;
    done(format!("Environment variable '{name}' set successfully"))
}

fn system_scope() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    #[serde(default = "system_scope")]
    is_system: bool,
}

pub async fn delete_environment(
    State(state): State<AgentState>,
    name: Result<Path<String>, PathRejection>,
    scope: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult {
    let Path(name) = name?;
    let Query(scope) = scope?;
    let host = state.host.environment.clone();
    let target = name.clone();
    blocking(move || host.delete(&target, scope.is_system)).await?;
    done(format!("Environment variable '{name}' deleted successfully"))
}
