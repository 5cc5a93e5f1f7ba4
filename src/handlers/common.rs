use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ApiResponse;

/// Header carrying the self-service access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::new(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::new(data))).into_response()
}

/// The supplied access token, or empty when absent. The gate rejects empty
/// tokens itself, so absence needs no special handling here.
pub fn access_token(headers: &HeaderMap) -> String {
    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string()
}
