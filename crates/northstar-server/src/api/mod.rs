mod health;
mod notebooks;
mod transformations;

use axum::Router;

use crate::AppState;

/// Create the API router
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(notebooks::router())
        .merge(transformations::router())
}
