use axum::{extract::FromRequestParts, http::request::Parts};
use northstar_core::User;

use crate::error::AppError;

pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated user, taken from the identity headers set by the
/// gateway in front of this service
#[derive(Debug, Clone)]
pub struct Caller(pub User);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let account_id = header(ACCOUNT_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing account id".to_string()))?;
        let user_id = header(USER_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing user id".to_string()))?;

        Ok(Caller(User::new(account_id, user_id)))
    }
}
