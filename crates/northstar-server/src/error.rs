use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use northstar_core::NorthstarError;
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] NorthstarError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(err) => match err {
                NorthstarError::PermissionDenied(_) | NorthstarError::Forbidden(_) => {
                    StatusCode::FORBIDDEN
                }
                NorthstarError::Conflict(_) => StatusCode::CONFLICT,
                NorthstarError::NotFound(_) => StatusCode::NOT_FOUND,
                NorthstarError::BadRequest(_) => StatusCode::BAD_REQUEST,
                NorthstarError::External(_) => StatusCode::BAD_GATEWAY,
                NorthstarError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Service(NorthstarError::Internal(msg)) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Service(NorthstarError::External(msg)) => {
                tracing::error!("External service error: {}", msg);
                "External service error".to_string()
            }
            AppError::Service(
                NorthstarError::PermissionDenied(msg)
                | NorthstarError::Forbidden(msg)
                | NorthstarError::Conflict(msg)
                | NorthstarError::NotFound(msg)
                | NorthstarError::BadRequest(msg),
            ) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Body(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection);
                rejection.body_text()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
