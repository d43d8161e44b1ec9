use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::services::TranscriptionError;

use super::openai_types::{ErrorDetail, ErrorResponse};

const INVALID_REQUEST: &str = "invalid_request_error";
const API_ERROR: &str = "api_error";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<TranscriptionError> for ApiError {
    fn from(error: TranscriptionError) -> Self {
        if error.is_client_fault() {
            tracing::warn!(error = %error, "Rejected transcription request");
            Self::bad_request(error.to_string())
        } else {
            tracing::error!(error = %error, "Transcription request failed");
            Self::internal(error.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = if self.status.is_client_error() {
            INVALID_REQUEST
        } else {
            API_ERROR
        };
        (
            self.status,
            Json(ErrorResponse {
                error: ErrorDetail {
                    message: self.message,
                    r#type: kind.to_string(),
                },
            }),
        )
            .into_response()
    }
}
