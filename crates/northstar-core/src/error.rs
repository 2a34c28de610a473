use thiserror::Error;

/// Errors returned by the notebook and transformation services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NorthstarError {
    /// The caller's permission does not include the required capability
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The request is understood but not allowed (e.g. assigning a new owner)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with the current state of the resource
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A downstream store or service failed
    #[error("External service error: {0}")]
    External(String),

    /// A data-integrity violation. The message is for logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NorthstarError {
    pub fn external(context: &str, err: impl std::fmt::Display) -> Self {
        NorthstarError::External(format!("{} returned error: {}", context, err))
    }
}

/// Errors returned by store implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A conditional write found a different version than expected
    #[error("{kind} {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        kind: &'static str,
        id: String,
        expected: i64,
        actual: i64,
    },

    /// Connection, query or serialization failure in the backend
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<StoreError> for NorthstarError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => NorthstarError::NotFound(err.to_string()),
            StoreError::VersionConflict { .. } => NorthstarError::Conflict(err.to_string()),
            StoreError::Backend(msg) => NorthstarError::External(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, NorthstarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let err: NorthstarError = StoreError::not_found("snippet", "s1").into();
        assert_eq!(err, NorthstarError::NotFound("snippet s1 not found".to_string()));

        let err: NorthstarError = StoreError::VersionConflict {
            kind: "snippet",
            id: "s1".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, NorthstarError::Conflict(_)));

        let err: NorthstarError = StoreError::Backend("connection reset".to_string()).into();
        assert_eq!(err, NorthstarError::External("connection reset".to_string()));
    }
}
