use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::service::AnalysisError;
use crate::llm_client::LlmError;
use crate::prompt_store::PromptError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// This is the only place service failures are turned into HTTP statuses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    BadGateway {
        message: String,
        details: Option<String>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Prompt(e) => e.into(),
            AnalysisError::Generation(e) => e.into(),
        }
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::NotFound(_) => AppError::NotFound(err.to_string()),
            PromptError::OutOfBounds(_) | PromptError::EmptyName => {
                AppError::Validation(err.to_string())
            }
            PromptError::Io { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match &err {
            LlmError::Http(_) | LlmError::Api { .. } => AppError::BadGateway {
                message: "Generation backend request failed.".to_string(),
                details: Some(err.to_string()),
            },
            LlmError::Malformed(detail) => AppError::BadGateway {
                message: "Invalid JSON response from generation API.".to_string(),
                details: Some(detail.clone()),
            },
            LlmError::Audit(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::BadGateway { message, details } => {
                tracing::error!("Upstream error: {message} ({details:?})");
                let body = match details {
                    Some(details) => json!({ "error": message, "details": details }),
                    None => json!({ "error": message }),
                };
                (StatusCode::BAD_GATEWAY, body)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_errors_map_to_client_statuses() {
        let not_found: AppError = PromptError::NotFound("missing.txt".to_string()).into();
        assert!(matches!(not_found, AppError::NotFound(ref m) if m.contains("missing.txt")));

        let escape: AppError = PromptError::OutOfBounds("../x".to_string()).into();
        assert!(matches!(escape, AppError::Validation(_)));
    }

    #[test]
    fn test_backend_errors_map_to_bad_gateway_with_details() {
        let err: AppError = LlmError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        match err {
            AppError::BadGateway { details, .. } => {
                assert!(details.unwrap().contains("boom"));
            }
            other => panic!("expected BadGateway, got {other:?}"),
        }

        let malformed: AppError = LlmError::Malformed("eof".to_string()).into();
        assert!(matches!(malformed, AppError::BadGateway { .. }));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::BadGateway {
                    message: "x".into(),
                    details: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
