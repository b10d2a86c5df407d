use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use tracing::debug;
use validator::Validate;

use crate::{
    errors::{validation_messages, ServiceError},
    ApiResponse,
};

/// Parses a path segment as a positive order id.
pub fn parse_order_id(raw: &str) -> Result<i32, ServiceError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ServiceError::BadRequest("Invalid order id.".to_string()))
}

/// Unwraps a JSON body, reporting malformed payloads as 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected request body");
        ServiceError::BadRequest(format!("Invalid request payload: {}", rejection.body_text()))
    })
}

/// Runs field validation, producing the 400 response body on failure.
pub fn validate_request<T: Validate, R>(
    request: &T,
) -> Result<(), (StatusCode, Json<ApiResponse<R>>)> {
    request.validate().map_err(|errors| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(validation_messages(&errors))),
        )
    })
}
