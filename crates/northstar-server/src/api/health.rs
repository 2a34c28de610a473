use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    /// Event categories that transformations can be scheduled on
    schedulers: Vec<String>,
}

/// Liveness check
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        schedulers: state.transformations.event_categories(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
