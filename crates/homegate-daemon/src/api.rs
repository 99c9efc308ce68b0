//! REST API handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use homegate_core::{CommandError, Params};
use homegate_registry::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn bad_request(rejection: JsonRejection) -> Response {
    debug!(error = %rejection, "Rejected request body");
    (StatusCode::BAD_REQUEST, Json(ApiError::new("Invalid request"))).into_response()
}

/// Map registry errors onto HTTP status codes
fn error_response(err: RegistryError) -> Response {
    let (status, message) = match &err {
        RegistryError::DeviceNotFound(_) => (StatusCode::NOT_FOUND, "Device not found".to_string()),
        RegistryError::CharacteristicNotFound { .. } => {
            (StatusCode::NOT_FOUND, "Characteristic not found".to_string())
        }
        RegistryError::AccessoryNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        RegistryError::AlreadyExists(_) | RegistryError::DiscoveryInProgress => {
            (StatusCode::CONFLICT, err.to_string())
        }
        RegistryError::Command(
            CommandError::UnknownCommand(_)
            | CommandError::UnsupportedCommand { .. }
            | CommandError::InvalidParameter { .. },
        ) => (StatusCode::BAD_REQUEST, err.to_string()),
    };
    (status, Json(ApiError::new(message))).into_response()
}

/// List all registered devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

/// Run discovery, rejecting concurrent runs
pub async fn discover_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.registry.discover(&state.discovery).await {
        Ok(discovered) => Json(serde_json::json!({
            "status": "success",
            "discovered": discovered
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Discovery request rejected");
            error_response(e)
        }
    }
}

/// Get a specific device by ID
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&id).await {
        Ok(device) => Json(device).into_response(),
        Err(e) => error_response(e),
    }
}

/// Pairing request body
#[derive(Deserialize)]
pub struct PairRequest {
    #[serde(default)]
    setup_code: String,
    #[serde(default)]
    name: String,
}

/// Pair a device, creating its registry record
pub async fn pair_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<PairRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };

    info!(device = %id, name = %req.name, has_setup_code = !req.setup_code.is_empty(), "Pairing requested");

    match state.registry.pair(&id, &req.name).await {
        Ok(device) => Json(serde_json::json!({
            "status": "success",
            "device": device
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Unpair a device; unknown ids are not an error
pub async fn unpair_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.registry.unpair(&id).await;
    Json(serde_json::json!({"status": "success"}))
}

/// Remove a device; unknown ids are not an error
pub async fn remove_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!(device = %id, "Remove device requested");
    state.registry.remove(&id).await;
    Json(serde_json::json!({
        "status": "success",
        "message": "Device removed"
    }))
}

/// Get all characteristics of a device
pub async fn get_characteristics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.characteristics(&id).await {
        Ok(characteristics) => Json(characteristics).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get one named characteristic
pub async fn get_characteristic(
    State(state): State<Arc<AppState>>,
    Path((id, characteristic)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.registry.characteristic(&id, &characteristic).await {
        Ok(value) => Json(serde_json::json!({
            "characteristic": characteristic,
            "value": value
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Characteristic write body
#[derive(Deserialize)]
pub struct SetCharacteristicRequest {
    #[serde(default)]
    value: Value,
}

/// Set one named characteristic
pub async fn set_characteristic(
    State(state): State<Arc<AppState>>,
    Path((id, characteristic)): Path<(String, String)>,
    body: Result<Json<SetCharacteristicRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };

    match state
        .registry
        .set_characteristic(&id, &characteristic, req.value.clone())
        .await
    {
        Ok(_) => Json(serde_json::json!({
            "status": "success",
            "characteristic": characteristic,
            "value": req.value
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Command request body
#[derive(Deserialize)]
pub struct CommandRequest {
    command: String,
    #[serde(default)]
    params: Params,
}

/// Send an abstract command to a device
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };

    info!(device = %id, command = %req.command, "Command requested");

    match state
        .registry
        .execute_command(&id, &req.command, &req.params)
        .await
    {
        Ok(device) => Json(serde_json::json!({
            "status": "success",
            "device_id": id,
            "command": req.command,
            "device": device
        }))
        .into_response(),
        Err(e) => {
            warn!(device = %id, command = %req.command, error = %e, "Command failed");
            error_response(e)
        }
    }
}

/// List service groups for a device
pub async fn get_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.services(&id).await {
        Ok(services) => Json(services).into_response(),
        Err(e) => error_response(e),
    }
}
