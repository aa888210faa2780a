//! Mapping of core errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use ward_core::WardError;

/// JSON error body returned by every failing endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    /// Unmet preconditions, present for 412 responses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmet: Vec<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    unmet: Vec<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            unmet: Vec::new(),
        }
    }
}

impl From<WardError> for ApiError {
    fn from(err: WardError) -> Self {
        let status = match &err {
            WardError::NotFound { .. } => StatusCode::NOT_FOUND,
            WardError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WardError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            WardError::InvalidState { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {:?}", err);
            return Self {
                status,
                message: "Internal error".into(),
                unmet: Vec::new(),
            };
        }

        let unmet = match &err {
            WardError::PreconditionFailed { unmet, .. } => unmet.clone(),
            _ => Vec::new(),
        };
        Self {
            status,
            message: err.to_string(),
            unmet,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorRes {
            error: self.message,
            unmet: self.unmet,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
