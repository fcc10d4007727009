use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Message shared by the "bad path" and "no such wishlist" responses.
pub const INCORRECT_PATH_PARAMETER: &str = "incorrect path parameter";
pub const INVALID_JSON_BODY: &str = "invalid json body";
pub const NOT_OWNER_MESSAGE: &str = "you can't remove product from wishlist of another user";
pub const FOREIGN_BOOKING_MESSAGE: &str = "item is booked by another user";

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "key": "not_found",
    "message": "incorrect path parameter",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Forbidden")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Stable machine-readable error key
    #[schema(example = "not_found")]
    pub key: String,
    /// Human-readable error description
    #[schema(example = "incorrect path parameter")]
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

/// Errors raised by the wishlist service and its storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("wishlist not found")]
    NotFound,

    #[error("wishlist item not found")]
    ItemNotFound,

    #[error("item booking not available")]
    BookingNotAvailable,

    #[error("item already booked")]
    AlreadyBooked,

    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// True for the domain "does not exist" sentinels.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::ItemNotFound)
    }

    /// True for the booking state machine rejections.
    pub fn is_booking_conflict(&self) -> bool {
        matches!(self, Self::BookingNotAvailable | Self::AlreadyBooked)
    }

    /// True when the stored record forbids the caller's change.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Transport-level error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    BadData,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadData => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_key(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadData => "bad_data",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_key())
    }
}

/// API Error type for HTTP responses.
///
/// `cause` is logged but never serialized.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub key: String,
    pub message: String,
    #[source]
    pub cause: Option<ServiceError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            key: kind.default_key().to_string(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_cause(mut self, cause: ServiceError) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "authentication required")
    }

    pub fn bad_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadData, message)
    }

    pub fn invalid_json() -> Self {
        Self::bad_data(INVALID_JSON_BODY)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// The one NotFound shape used for malformed ids and missing records alike.
    pub fn incorrect_path() -> Self {
        Self::not_found(INCORRECT_PATH_PARAMETER)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn conflict(key: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message).with_key(key)
    }

    pub fn internal(message: impl Into<String>, cause: ServiceError) -> Self {
        Self::new(ErrorKind::Internal, message).with_cause(cause)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound | ServiceError::ItemNotFound => Self::incorrect_path(),
            ServiceError::BookingNotAvailable => {
                Self::conflict("booking_not_available", err.to_string())
            }
            ServiceError::AlreadyBooked => Self::conflict("already_booked", err.to_string()),
            ServiceError::PermissionDenied(message) => Self::forbidden(message),
            ServiceError::ValidationError(ref msg) => Self::bad_data(msg.clone()),
            other => Self::internal("Internal server error", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = current_request_id();

        match (&self.kind, &self.cause) {
            (ErrorKind::Internal, Some(cause)) => error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %cause,
                "{}", self.message
            ),
            (ErrorKind::Internal, None) => error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                "{}", self.message
            ),
            (_, Some(cause)) => warn!(
                request_id = request_id.as_deref().unwrap_or("-"),
                kind = %self.kind,
                error = %cause,
                "{}", self.message
            ),
            _ => {}
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            key: self.key,
            message: self.message,
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
