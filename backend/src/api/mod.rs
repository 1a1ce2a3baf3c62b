//! API module
//!
//! Contains HTTP request handlers for the chat widget and the router that
//! wires them together.

pub mod chat;
pub mod municipality;
pub mod utils;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}

/// Build the API router (without transport middleware)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route(
            "/api/chat",
            post(chat::chat).fallback(chat::method_not_allowed),
        )
        .route("/api/municipality", get(municipality::get_municipality))
        .route(
            "/api/municipality/:slug",
            get(municipality::get_municipality),
        )
        .with_state(state)
}
