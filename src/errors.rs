use crate::services::blob::BlobError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io};
use thiserror::Error;

/// Errors surfaced by the adapter to its host.
///
/// Collaborator failures are flattened into [`AdapterError::Adapter`] so that
/// no blob-service error type leaks past the adapter boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage adapter error: {0}")]
    Adapter(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<BlobError> for AdapterError {
    fn from(err: BlobError) -> Self {
        AdapterError::Adapter(err.message)
    }
}

impl From<io::Error> for AdapterError {
    fn from(err: io::Error) -> Self {
        AdapterError::Adapter(err.to_string())
    }
}

/// A lightweight wrapper for errors that flow through the HTTP pipeline.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Machine readable code, e.g. `STATIC_FILE_NOT_FOUND`.
    pub code: Option<&'static str>,
    /// Identifies the resource the error refers to (the object key for 404s).
    pub property: Option<String>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            code: None,
            property: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found on a static file.
    pub fn not_found(msg: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            code: Some("STATIC_FILE_NOT_FOUND"),
            property: Some(key.into()),
        }
    }

    /// Map a blob-service failure for `key` onto the host's error kinds.
    pub fn from_blob(err: BlobError, key: &str) -> Self {
        match err.code {
            400 => Self::new(StatusCode::BAD_REQUEST, err.message),
            401 => Self::new(StatusCode::UNAUTHORIZED, err.message),
            403 => Self::new(StatusCode::FORBIDDEN, err.message),
            404 => Self::not_found(err.message, key),
            _ => Self::internal(err.message),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16(),
            "code": self.code,
            "property": self.property,
        }));

        (self.status, body).into_response()
    }
}

impl From<AdapterError> for AppError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::InvalidInput(msg) => AppError::new(StatusCode::BAD_REQUEST, msg),
            other => AppError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_blob_status_codes() {
        let cases = [
            (400, StatusCode::BAD_REQUEST),
            (401, StatusCode::UNAUTHORIZED),
            (403, StatusCode::FORBIDDEN),
            (404, StatusCode::NOT_FOUND),
            (409, StatusCode::INTERNAL_SERVER_ERROR),
            (503, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let err = AppError::from_blob(BlobError::new(code, "boom"), "images/a.png");
            assert_eq!(err.status, status, "code {code}");
        }
    }

    #[test]
    fn not_found_carries_key() {
        let err = AppError::from_blob(BlobError::not_found("images/a.png"), "images/a.png");
        assert_eq!(err.code, Some("STATIC_FILE_NOT_FOUND"));
        assert_eq!(err.property.as_deref(), Some("images/a.png"));
    }

    #[test]
    fn blob_errors_become_adapter_errors() {
        let err: AdapterError = BlobError::new(500, "backend exploded").into();
        assert!(matches!(err, AdapterError::Adapter(ref msg) if msg == "backend exploded"));
    }
}
