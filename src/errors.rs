use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Wire shape for every failure path.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    /// Human-readable error description
    pub error: String,
    /// Stable machine-readable kind: "validation", "not_found", "conflict",
    /// "auth", "store", "internal"
    pub error_kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Access-gate rejection. The inner detail is logged, never sent to the
    /// client; callers must not be able to tell a bad token from a missing
    /// employee.
    #[error("access denied: {0}")]
    Auth(String),

    /// Transport or upstream record-store failure. Status is absent for
    /// network-level errors; the body is preserved verbatim for diagnostics.
    #[error("record store error (status {status:?}): {body}")]
    Store { status: Option<u16>, body: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Upstream returned a record this service cannot interpret. Treated as a
    /// store failure per the taxonomy (malformed response body).
    pub fn malformed(entity: &str, id: &str, detail: impl Into<String>) -> Self {
        ServiceError::Store {
            status: None,
            body: format!("malformed {} record {}: {}", entity, id, detail.into()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Auth(_) => "auth",
            ServiceError::Store { .. } => "store",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Store {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            // Opaque on purpose: identical response whether the org/employee
            // exists or the token is wrong.
            ServiceError::Auth(detail) => {
                tracing::warn!(detail = %detail, "access denied");
                (StatusCode::FORBIDDEN, "forbidden".to_string())
            }
            ServiceError::Store { status, body } => {
                tracing::error!(status = ?status, body = %body, "record store failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream record store failure".to_string(),
                )
            }
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            ok: false,
            error: message,
            error_kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
