use serde::Serialize;

use crate::llm_client::GenerationResult;

/// A validated analyze request. Empty or missing template names mean "use the default".
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeRequest {
    pub text: String,
    pub prompt_name: Option<String>,
    pub system_prompt_name: Option<String>,
}

/// The record returned to the caller. `generation` is omitted in preview-only mode.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub prompt_name: String,
    pub system_prompt_name: String,
    pub prompt: String,
    pub input_text: String,
    pub message_for_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationResult>,
}
