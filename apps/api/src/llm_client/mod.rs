//! LLM Client — the single point of entry for generation backend calls.
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint, always non-streaming, and
//! records every successful call in the audit log before handing the result back.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BackendConfig;

pub mod audit;
pub mod options;

use audit::{AuditError, AuditLog};
use options::GenerationOptions;

const GENERATE_PATH: &str = "/api/generate";

/// Backend reply, passed through verbatim. Only JSON-object-ness is checked.
pub type GenerationResult = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid JSON response from generation API: {0}")]
    Malformed(String),

    #[error("Failed to write generation audit log: {0}")]
    Audit(#[from] AuditError),
}

/// Something that can turn a system prompt and a composed prompt into a generation.
///
/// The analysis service holds an `Option<Arc<dyn Generator>>`; `None` means preview-only.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        prompt: &str,
        prompt_name: Option<&str>,
        input_text: Option<&str>,
    ) -> Result<GenerationResult, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a GenerationOptions>,
}

/// Non-streaming client for Ollama's generate endpoint, with CSV audit logging.
#[derive(Debug)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    options: GenerationOptions,
    audit: AuditLog,
}

impl OllamaClient {
    pub fn new(config: &BackendConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{GENERATE_PATH}", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            options: config.options.clone(),
            audit: AuditLog::new(&config.csv_path),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn audit_path(&self) -> &std::path::Path {
        self.audit.path()
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        system_prompt: &str,
        prompt: &str,
        prompt_name: Option<&str>,
        input_text: Option<&str>,
    ) -> Result<GenerationResult, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            system: system_prompt,
            prompt,
            stream: false,
            options: self.options.as_payload(),
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Calling generation backend");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generation backend returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let result = parse_result(&body)?;

        let eval_count = result.get("eval_count").cloned().unwrap_or_default();
        let done_reason = result.get("done_reason").cloned().unwrap_or_default();
        debug!("Generation succeeded: eval_count={eval_count}, done_reason={done_reason}");

        self.audit.append(&result, prompt_name, input_text).await?;

        Ok(result)
    }
}

fn parse_result(body: &str) -> Result<GenerationResult, LlmError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LlmError::Malformed("expected a JSON object".to_string())),
        Err(e) => Err(LlmError::Malformed(e.to_string())),
    }
}
