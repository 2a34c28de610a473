use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use northstar_core::{Output, Schedule, Transformation};

use crate::caller::Caller;
use crate::error::AppError;
use crate::AppState;

/// List the account's transformations
async fn list_transformations(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<Json<Vec<Transformation>>, AppError> {
    Ok(Json(state.transformations.list(&user.account_id).await?))
}

/// Create an unscheduled transformation
async fn create_transformation(
    State(state): State<AppState>,
    Caller(user): Caller,
    body: Result<Json<Transformation>, JsonRejection>,
) -> Result<Json<Transformation>, AppError> {
    let Json(transformation) = body?;
    Ok(Json(
        state
            .transformations
            .create(&user.account_id, transformation)
            .await?,
    ))
}

/// Get a transformation by ID
async fn get_transformation(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<Transformation>, AppError> {
    Ok(Json(state.transformations.get(&user.account_id, &id).await?))
}

/// Update a transformation. Fails while it is scheduled.
async fn update_transformation(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<Transformation>, JsonRejection>,
) -> Result<Json<Transformation>, AppError> {
    let Json(mut transformation) = body?;
    transformation.id = id;
    Ok(Json(
        state
            .transformations
            .update(&user.account_id, transformation)
            .await?,
    ))
}

/// Delete a transformation. Fails while it is scheduled.
async fn delete_transformation(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.transformations.delete(&user.account_id, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn get_schedule(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(
        state
            .transformations
            .get_schedule(&user.account_id, &id)
            .await?,
    ))
}

async fn create_schedule(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<Schedule>, JsonRejection>,
) -> Result<Json<Schedule>, AppError> {
    let Json(schedule) = body?;
    Ok(Json(
        state
            .transformations
            .create_schedule(&user.account_id, &id, &schedule)
            .await?,
    ))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .transformations
        .delete_schedule(&user.account_id, &id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Outputs of the most recent runs, newest first
async fn get_results(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<Output>>, AppError> {
    Ok(Json(state.transformations.results(&user.account_id, &id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/transformations",
            get(list_transformations).post(create_transformation),
        )
        .route(
            "/api/transformations/{id}",
            get(get_transformation)
                .put(update_transformation)
                .delete(delete_transformation),
        )
        .route(
            "/api/transformations/{id}/schedule",
            get(get_schedule)
                .post(create_schedule)
                .delete(delete_schedule),
        )
        .route("/api/transformations/{id}/results", get(get_results))
}
