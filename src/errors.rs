use crate::services::{publisher::PublishError, snippet_store::StoreError};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Message returned when a publish fails for a server-side reason.
pub const PUBLISH_FAILED: &str = "Failed to publish snippet";

/// Message returned for unknown snippet ids.
pub const SNIPPET_NOT_FOUND: &str = "Snippet not found";

/// A lightweight wrapper for request errors that keeps the message local.
///
/// Messages are what the client sees; storage details are logged and never
/// leak into the body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 409 Conflict
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
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
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::MissingFields => AppError::bad_request("Missing required fields"),
            PublishError::InvalidId(reason) => {
                AppError::bad_request(format!("Invalid snippet id: {reason}"))
            }
            PublishError::Conflict(_) => AppError::conflict("Snippet id already exists"),
            PublishError::Storage(err) => {
                tracing::error!(error = %err, "publish failed");
                AppError::internal(PUBLISH_FAILED)
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "snippet store failure");
        AppError::internal("Storage unavailable")
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_) => {
                AppError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
            }
            // Oversized or unreadable bodies keep axum's status (413 etc.).
            other => AppError::new(other.status(), other.body_text()),
        }
    }
}
