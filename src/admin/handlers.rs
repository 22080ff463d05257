use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::admin::auth::CurrentUser;
use crate::http::{response::ApiError, server::AppState};
use crate::observability::metrics;
use crate::session::{AuthError, IssuedSession};
use crate::settings::Setting;

const INVALID_REQUEST: &str = "Invalid request format";

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSettingRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub about: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub key: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// Unwrap a JSON body, turning any rejection into a uniform 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            tracing::debug!(error = %rejection, "Malformed request body");
            ApiError::bad_request(INVALID_REQUEST)
        })
}

fn require_key(key: &str) -> Result<(), ApiError> {
    if key.trim().is_empty() {
        return Err(ApiError::bad_request("setting key must not be empty"));
    }
    Ok(())
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<IssuedSession> {
    let req = json_body(payload)?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request(INVALID_REQUEST));
    }

    match state.sessions.login(&req.username, &req.password) {
        Ok(issued) => {
            metrics::record_login(true);
            Ok(Json(issued))
        }
        Err(e @ AuthError::InvalidCredentials) => {
            metrics::record_login(false);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Whole cached configuration with its version.
pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.cache.snapshot();
    let settings: BTreeMap<&str, &str> = snapshot
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    Json(json!({
        "settings": settings,
        "version": snapshot.version().as_u64(),
    }))
}

/// Batch upsert. Keys are applied in order and the first failure aborts the
/// rest; keys written before it stay written.
pub async fn update_config(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<BTreeMap<String, String>>, JsonRejection>,
) -> ApiResult<Value> {
    let updates = json_body(payload)?;
    for key in updates.keys() {
        require_key(key)?;
    }

    for (key, value) in &updates {
        state.settings.update_setting(key, value).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Batch config update stopped");
            e
        })?;
        state.cache.set(key.as_str(), value.as_str());
    }

    tracing::info!(user = %user.username, keys = updates.len(), "Configuration updated");
    Ok(Json(json!({
        "message": "Configuration updated successfully",
        "version": state.cache.version().as_u64(),
    })))
}

pub async fn config_initialized(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "initialized": state.cache.is_initialized() }))
}

pub async fn reload_config(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Value> {
    let version = state.reloader.reload_now().await?;
    tracing::info!(user = %user.username, version = %version, "Configuration reloaded on request");
    Ok(Json(json!({
        "message": "Configuration reloaded",
        "version": version.as_u64(),
    })))
}

pub async fn list_settings(State(state): State<AppState>) -> ApiResult<Value> {
    let settings = state.settings.get_all().await?;
    Ok(Json(json!({ "settings": settings })))
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Setting> {
    let setting = state.settings.get_by_key(&key).await?;
    Ok(Json(setting))
}

pub async fn create_setting(
    State(state): State<AppState>,
    payload: Result<Json<CreateSettingRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let req = json_body(payload)?;
    require_key(&req.key)?;

    state
        .settings
        .create_setting(&req.key, &req.value, &req.about)
        .await?;
    state.cache.set(req.key.as_str(), req.value.as_str());

    Ok(Json(json!({ "message": "Setting created successfully" })))
}

pub async fn update_setting(
    State(state): State<AppState>,
    payload: Result<Json<UpdateSettingRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let req = json_body(payload)?;
    require_key(&req.key)?;

    state.cache.update_and_persist(&req.key, &req.value).await?;

    Ok(Json(json!({ "message": "Setting updated successfully" })))
}

/// The cache has no per-key removal, so a reload follows the delete.
pub async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Value> {
    state.settings.delete_setting(&key).await?;

    if let Err(e) = state.cache.reload().await {
        tracing::warn!(key = %key, error = %e, "Setting deleted but cache reload failed");
    }

    Ok(Json(json!({ "message": "Setting deleted successfully" })))
}
