//! obed-api Library
//!
//! Corporate-lunch ordering backend: order consistency and aggregation on
//! top of an external hosted table store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod services;
pub mod store;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub services: services::AppServices,
}

/// Uniform success envelope; failures carry the matching
/// `{ok: false, error, error_kind}` shape from [`errors::ErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Full application router over a prepared state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "obed-api up" }))
        .route("/health", get(health))
        .nest("/api/v1", handlers::api_v1_routes())
        .with_state(state)
}
