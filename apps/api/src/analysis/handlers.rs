//! Axum route handlers for the Analysis API.

use axum::{extract::State, Json};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::analysis::models::{AnalyzeRequest, AnalyzeResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /analyze
///
/// Composes the message for the model from a template and the user's text, and runs
/// generation when a backend is configured. A missing or unparseable body is treated
/// as an empty object.
pub async fn handle_analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let payload: Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::Object(Map::new()));

    let request =
        parse_request(&payload).inspect_err(|e| warn!("Rejected analyze request: {e}"))?;

    info!(
        "Analyze request: prompt_name={:?}, system_prompt_name={:?}, text_len={}",
        request.prompt_name,
        request.system_prompt_name,
        request.text.len()
    );

    let response = state.analysis.analyze(request).await?;

    Ok(Json(response))
}

fn parse_request(payload: &Value) -> Result<AnalyzeRequest, AppError> {
    let text = match payload.get("text") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            return Err(AppError::Validation("Field 'text' is required.".to_string()))
        }
        Some(_) => {
            return Err(AppError::Validation(
                "Field 'text' must be a string.".to_string(),
            ))
        }
    };

    Ok(AnalyzeRequest {
        text,
        prompt_name: optional_string(payload, "prompt_name")?,
        system_prompt_name: optional_string(payload, "system_prompt_name")?,
    })
}

fn optional_string(payload: &Value, field: &str) -> Result<Option<String>, AppError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AppError::Validation(format!(
            "Field '{field}' must be a string."
        ))),
    }
}
