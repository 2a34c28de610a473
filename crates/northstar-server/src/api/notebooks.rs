use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use northstar_core::{Notebook, User};

use crate::caller::Caller;
use crate::error::AppError;
use crate::AppState;

/// List the caller's notebooks
async fn list_notebooks(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<Json<Vec<Notebook>>, AppError> {
    Ok(Json(state.notebooks.list(&user).await?))
}

/// Create a notebook owned by the caller
async fn create_notebook(
    State(state): State<AppState>,
    Caller(user): Caller,
    body: Result<Json<Notebook>, JsonRejection>,
) -> Result<Json<Notebook>, AppError> {
    let Json(notebook) = body?;
    Ok(Json(state.notebooks.create(&user, notebook).await?))
}

/// Get a notebook by ID
async fn get_notebook(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<Notebook>, AppError> {
    Ok(Json(state.notebooks.get(&user, &id).await?))
}

/// Update a notebook
async fn update_notebook(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<Notebook>, JsonRejection>,
) -> Result<Json<Notebook>, AppError> {
    let Json(mut notebook) = body?;
    notebook.id = id;
    Ok(Json(state.notebooks.update(&user, notebook).await?))
}

/// Delete a notebook
async fn delete_notebook(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.notebooks.delete(&user, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Users with access to a notebook
async fn get_users(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.notebooks.get_users(&user, &id).await?))
}

/// Replace the notebook's user list, returning the result
async fn update_users(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<Vec<User>>, JsonRejection>,
) -> Result<Json<Vec<User>>, AppError> {
    let Json(users) = body?;
    state.notebooks.update_users(&user, &id, &users).await?;
    Ok(Json(state.notebooks.get_users(&user, &id).await?))
}

/// Identity the notebook's cells execute as
async fn get_execution_information(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.notebooks.get_execution_information(&user, &id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notebooks", get(list_notebooks).post(create_notebook))
        .route(
            "/api/notebooks/{id}",
            get(get_notebook)
                .put(update_notebook)
                .delete(delete_notebook),
        )
        .route(
            "/api/notebooks/{id}/users",
            get(get_users).put(update_users),
        )
        .route(
            "/api/notebooks/{id}/execution",
            get(get_execution_information),
        )
}
