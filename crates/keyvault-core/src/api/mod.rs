//! REST API over the key store
//!
//! `/health` and `/version` are open. Everything under `/api` requires the
//! configured key in the `X-API-Key` header.

pub mod auth;
pub mod error;
pub mod request;
pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, put};
use axum::Router;

use crate::store::KeyStore;

pub use auth::API_KEY_HEADER;
pub use error::{ApiError, ApiResult};
pub use routes::KeyView;
pub use server::{ApiConfig, ApiServer};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    store: Arc<KeyStore>,
    api_key: Arc<str>,
}

impl ApiState {
    pub fn new(store: Arc<KeyStore>, api_key: &str) -> Self {
        Self {
            store,
            api_key: Arc::from(api_key),
        }
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// Build the application router
pub fn router(store: Arc<KeyStore>, api_key: &str) -> Router {
    let state = ApiState::new(store, api_key);

    let protected = Router::new()
        .route("/keys", get(routes::list_keys).post(routes::create_key))
        .route("/keys/type/{tier}", get(routes::list_keys_by_tier))
        .route("/keys/{id}/use", put(routes::use_key))
        .route("/keys/{id}/unuse", put(routes::unuse_key))
        .route("/stats", get(routes::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .nest("/api", protected)
        .with_state(state)
}
