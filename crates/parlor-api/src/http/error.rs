//! Application error type mapping to HTTP status codes and the envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use parlor_types::error::{CatalogError, TurnError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Catalog(CatalogError),
    Turn(TurnError),
    Validation(String),
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        AppError::Catalog(e)
    }
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        AppError::Turn(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Catalog(CatalogError::UnknownAgent(_)) => StatusCode::NOT_FOUND,
            AppError::Turn(TurnError::Template(_)) => StatusCode::BAD_REQUEST,
            AppError::Turn(TurnError::Transport(_)) => StatusCode::BAD_GATEWAY,
            AppError::Turn(TurnError::ToolLoopOverflow { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Turn(TurnError::Cancelled) => StatusCode::REQUEST_TIMEOUT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> String {
        match self {
            AppError::Catalog(CatalogError::UnknownAgent(_)) => "AGENT_NOT_FOUND".to_string(),
            AppError::Turn(e) => e.category().to_ascii_uppercase(),
            AppError::Validation(_) => "VALIDATION_ERROR".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::Catalog(e) => e.to_string(),
            AppError::Turn(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.code(), "{}", self.message());
        } else {
            tracing::debug!(code = %self.code(), "{}", self.message());
        }
        (status, ApiResponse::error(&self.code(), self.message())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::error::TemplateError;
    use parlor_types::llm::LlmError;

    #[test]
    fn turn_errors_map_to_statuses() {
        let cases = [
            (
                AppError::from(TurnError::from(TemplateError::MissingPlaceholder("voice".into()))),
                StatusCode::BAD_REQUEST,
                "TEMPLATE_ERROR",
            ),
            (
                AppError::from(TurnError::from(LlmError::AuthenticationFailed)),
                StatusCode::BAD_GATEWAY,
                "TRANSPORT_ERROR",
            ),
            (
                AppError::from(TurnError::ToolLoopOverflow { limit: 5 }),
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOOL_LOOP_OVERFLOW",
            ),
            (AppError::from(TurnError::Cancelled), StatusCode::REQUEST_TIMEOUT, "CANCELLED"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn unknown_agent_is_not_found() {
        let err = AppError::from(CatalogError::UnknownAgent("weather".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "AGENT_NOT_FOUND");
    }
}
