use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ToolChatError;

/// Error response for the HTTP layer.
///
/// Serialises as `{ "success": false, "error": "<message>", "kind": "<kind>" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
    pub kind: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                success: false,
                error: message.into(),
                kind: kind.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ToolChatError> for ApiError {
    fn from(err: ToolChatError) -> Self {
        let status = match &err {
            ToolChatError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ToolChatError::DuplicateTool(_) => StatusCode::CONFLICT,
            ToolChatError::InvalidArguments { .. } | ToolChatError::ConfigError(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(ToolChatError::DuplicateTool("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ToolChatError::ConfigError("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        let err = ApiError::from(ToolChatError::ExternalProcess("exit 1".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.kind, "external_process_error");
    }
}
