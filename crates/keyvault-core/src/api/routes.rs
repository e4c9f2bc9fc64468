//! Route handlers

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::request::{parse_tier_segment, CreateKeyRequest, UseKeyRequest};
use super::ApiState;
use crate::models::KeyRecord;
use crate::storage::StorageResult;
use crate::store::{KeyStats, KeyStore};

pub const SERVICE_NAME: &str = "Key Management System API";
pub const SERVICE_DESCRIPTION: &str = "REST API for managing license keys";

/// A key as returned by the API
///
/// `id` is the key's position in the collection and is what the
/// `/use` and `/unuse` routes take.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    pub id: usize,
    pub value: String,
    #[serde(rename = "type")]
    pub tier: u8,
    pub type_name: &'static str,
    pub used: bool,
    pub discord_username: String,
}

impl KeyView {
    pub fn new(id: usize, record: KeyRecord) -> Self {
        Self {
            id,
            tier: record.tier.ordinal(),
            type_name: record.tier.name(),
            used: record.used,
            value: record.value,
            discord_username: record.assigned_user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeyList {
    pub keys: Vec<KeyView>,
}

/// `GET /health`
pub async fn health() -> &'static str {
    "API server is running"
}

/// `GET /version`
pub async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": SERVICE_NAME,
        "description": SERVICE_DESCRIPTION,
    }))
}

/// `GET /api/keys`
pub async fn list_keys(State(state): State<ApiState>) -> Json<KeyList> {
    let keys = state
        .store
        .records()
        .into_iter()
        .enumerate()
        .map(|(id, record)| KeyView::new(id, record))
        .collect();
    Json(KeyList { keys })
}

/// `GET /api/keys/type/{tier}`
pub async fn list_keys_by_tier(
    State(state): State<ApiState>,
    Path(segment): Path<String>,
) -> ApiResult<Json<KeyList>> {
    let tier = parse_tier_segment(&segment)?;
    let keys = state
        .store
        .records_by_tier(tier)
        .into_iter()
        .map(|(id, record)| KeyView::new(id, record))
        .collect();
    Ok(Json(KeyList { keys }))
}

/// `POST /api/keys`
pub async fn create_key(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = CreateKeyRequest::from_body(&body)?;

    let record = KeyRecord::new(request.value, request.tier);
    let outcome = write_store(&state, move |store| store.try_add_record(record)).await?;
    if !outcome.is_inserted() {
        return Err(ApiError::Conflict(
            "Key already exists or couldn't be added".to_string(),
        ));
    }

    info!("Added key via API (type {})", request.tier.ordinal());
    Ok((StatusCode::CREATED, success()))
}

/// `PUT /api/keys/{id}/use`
pub async fn use_key(
    State(state): State<ApiState>,
    Path(segment): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let request = UseKeyRequest::from_body(&body)?;
    let id = parse_id(&segment).ok_or_else(|| ApiError::not_found(KEY_NOT_FOUND_OR_USED))?;

    let user = request.discord_username;
    if !write_store(&state, move |store| store.try_mark_at(id, &user)).await? {
        return Err(ApiError::not_found(KEY_NOT_FOUND_OR_USED));
    }

    info!(id, "Key marked as used via API");
    Ok(success())
}

/// `PUT /api/keys/{id}/unuse`
pub async fn unuse_key(
    State(state): State<ApiState>,
    Path(segment): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&segment).ok_or_else(|| ApiError::not_found(KEY_NOT_FOUND_OR_UNUSED))?;

    if !write_store(&state, move |store| store.try_unmark_at(id)).await? {
        return Err(ApiError::not_found(KEY_NOT_FOUND_OR_UNUSED));
    }

    info!(id, "Key marked as unused via API");
    Ok(success())
}

/// `GET /api/stats`
pub async fn stats(State(state): State<ApiState>) -> Json<KeyStats> {
    Json(state.store.stats())
}

const KEY_NOT_FOUND_OR_USED: &str = "Key not found or already used";
const KEY_NOT_FOUND_OR_UNUSED: &str = "Key not found or already unused";

/// Run a persisting store call on the blocking pool
///
/// The write, fsync and rename happen under the store lock.
async fn write_store<T, F>(state: &ApiState, op: F) -> ApiResult<T>
where
    F: FnOnce(&KeyStore) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(result) => Ok(result?),
        Err(e) => {
            warn!(error = %e, "Store write task failed");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

/// Ids are plain non-negative integers; anything else cannot name a key
fn parse_id(segment: &str) -> Option<usize> {
    segment.parse().ok()
}
