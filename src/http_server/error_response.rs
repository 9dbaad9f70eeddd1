use crate::BusinessError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

/// Seconds a client should wait before retrying a 503
const RETRY_AFTER_SECS: &str = "1";

/// HTTP error response structure for JSON API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
    /// HTTP status code as integer for client parsing
    pub error_code: u16,
    /// Unique request ID for debugging and tracing
    pub request_id: String,
    /// Whether repeating the same request later may succeed
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(message: String, status_code: StatusCode, retryable: bool) -> Self {
        Self::with_request_id(message, status_code, retryable, Uuid::new_v4().to_string())
    }

    pub fn with_request_id(
        message: String,
        status_code: StatusCode,
        retryable: bool,
        request_id: String,
    ) -> Self {
        Self {
            message,
            error_code: status_code.as_u16(),
            request_id,
            retryable,
        }
    }
}

impl BusinessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BusinessError::PoolExhausted(_)
            | BusinessError::ConnectionLost(_)
            | BusinessError::Unavailable(_)
            | BusinessError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            BusinessError::NotFound(_) => StatusCode::NOT_FOUND,
            BusinessError::BadRequest(_) | BusinessError::Validation(_) => StatusCode::BAD_REQUEST,
            BusinessError::Io(_)
            | BusinessError::Serde(_)
            | BusinessError::Database(_)
            | BusinessError::Configuration(_)
            | BusinessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();
        let request_id = Uuid::new_v4().to_string();

        let message = match &self {
            BusinessError::BadRequest(msg) | BusinessError::Validation(msg) => msg.clone(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                // Details stay in the log; clients only get the request id
                error!(request_id = %request_id, "Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => {
                if retryable {
                    warn!(request_id = %request_id, "Request refused: {}", self);
                }
                self.to_string()
            }
        };

        let body = ErrorResponse::with_request_id(message, status, retryable, request_id);
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
