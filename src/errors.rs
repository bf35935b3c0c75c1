use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Validation error on quality_rating: must be between 1.0 and 5.0",
    "field": "quality_rating",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Offending field for validation and uniqueness failures
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "po_number")]
    pub field: Option<String>,
    /// Request identifier echoed from `x-request-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error on {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Duplicate key on {field}: {message}")]
    DuplicateKey { field: String, message: String },

    #[error("Consistency error: {0}")]
    ConsistencyError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = err.field_errors().keys().copied().collect();
        fields.sort_unstable();
        ServiceError::ValidationError {
            field: fields.join(","),
            message: err.to_string(),
        }
    }
}

/// Field named by a serde rejection message, e.g. `status` in
/// "...target type: status: unknown variant `shipped`...".
fn rejected_field(detail: &str) -> Option<String> {
    if let Some((_, rest)) = detail.split_once("missing field `") {
        return rest.split('`').next().map(str::to_string);
    }
    let (_, cause) = detail.split_once(": ")?;
    let (path, _) = cause.split_once(": ")?;
    if path.is_empty() || path.contains(char::is_whitespace) {
        None
    } else {
        Some(path.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        let field = rejected_field(&detail).unwrap_or_else(|| "body".to_string());
        Self::validation(field, detail)
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        let detail = rejection.body_text();
        let field = rejected_field(&detail).unwrap_or_else(|| "query".to_string());
        Self::validation(field, detail)
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation("id", rejection.body_text())
    }
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Reclassifies a unique-constraint violation reported by the database as
    /// `DuplicateKey` on `field`. Any other error passes through unchanged.
    pub fn from_unique_violation(err: DbErr, field: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                Self::duplicate(field, format!("{} already exists ({})", field, detail))
            }
            _ => Self::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::DuplicateKey { .. } => StatusCode::CONFLICT,
            Self::DatabaseError(_) | Self::ConsistencyError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message suitable for HTTP responses. Internal failures get a generic text.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::ConsistencyError(_) => {
                "Write rolled back: vendor metrics could not be persisted".to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } | Self::DuplicateKey { field, .. } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            field: self.field().map(str::to_string),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// API error type returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
        }
    }
}
