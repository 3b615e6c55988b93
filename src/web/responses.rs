use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use super::uploads::UploadError;

/// JSON body of every failed API call: `{"message": "..."}`.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub message: String,
}

/// Error half of the API handlers' `Result`.
pub type ApiError = (StatusCode, Json<ApiMessage>);

pub fn json_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ApiMessage {
            message: message.into(),
        }),
    )
}

/// Malformed or disallowed multipart input is always the client's fault.
pub fn upload_rejected(err: &UploadError) -> ApiError {
    json_error(StatusCode::BAD_REQUEST, err.message())
}
