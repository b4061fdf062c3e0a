//! JSON response envelope.
//!
//! Every handler answers with `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code", "message", "details"?}}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

/// The envelope written for every response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Wrap `data` in a success envelope with the given status.
pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let body = ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    };
    (status, Json(body)).into_response()
}

/// Write the failure envelope for any error.
///
/// An [`AppError`] contributes its code, message, details and status verbatim.
/// Any other error is logged and reported as a bare internal error.
pub fn failure(err: &(dyn std::error::Error + 'static)) -> Response {
    let (status, body) = if let Some(app) = err.downcast_ref::<AppError>() {
        (
            app.status(),
            ApiErrorBody {
                code: app.code().as_str().to_owned(),
                message: app.message().to_owned(),
                details: app.details().to_vec(),
            },
        )
    } else {
        tracing::error!(error = %err, "Unclassified error reached the response writer");
        (
            ErrorCode::Internal.status(),
            ApiErrorBody {
                code: ErrorCode::Internal.as_str().to_owned(),
                message: "internal server error".to_owned(),
                details: Vec::new(),
            },
        )
    };

    let envelope: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(body),
    };
    (status, Json(envelope)).into_response()
}
