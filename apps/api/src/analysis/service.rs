//! Analysis service — composes the message for the model and optionally generates.
//!
//! Flow: resolve template names → load system + primary templates → compose →
//!       generate (when a backend is configured) → assemble the response record.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::analysis::models::{AnalyzeRequest, AnalyzeResponse};
use crate::llm_client::{Generator, LlmError};
use crate::prompt_store::{PromptError, PromptStore};

/// Marks where the raw user text goes inside a primary template.
pub const USER_TEXT_PLACEHOLDER: &str = "${USER_TEXT}";

/// Template names used when a request does not name its own.
#[derive(Debug, Clone)]
pub struct PromptDefaults {
    pub prompt_name: String,
    pub system_prompt_name: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Generation(#[from] LlmError),
}

pub struct AnalysisService {
    prompts: PromptStore,
    defaults: PromptDefaults,
    generator: Option<Arc<dyn Generator>>,
}

impl AnalysisService {
    pub fn new(
        prompts: PromptStore,
        defaults: PromptDefaults,
        generator: Option<Arc<dyn Generator>>,
    ) -> Self {
        Self {
            prompts,
            defaults,
            generator,
        }
    }

    pub fn default_prompt_name(&self) -> &str {
        &self.defaults.prompt_name
    }

    pub fn is_preview_only(&self) -> bool {
        self.generator.is_none()
    }

    /// Runs the analysis pipeline for one request. Failures propagate unchanged.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalysisError> {
        let prompt_name = effective_name(request.prompt_name, &self.defaults.prompt_name);
        let system_prompt_name =
            effective_name(request.system_prompt_name, &self.defaults.system_prompt_name);

        let system_prompt = self.prompts.load(&system_prompt_name).await?;
        let prompt = self.prompts.load(&prompt_name).await?;

        let message_for_model = compose_message(&prompt, &request.text);

        let generation = match &self.generator {
            Some(generator) => {
                let result = generator
                    .generate(
                        &system_prompt,
                        &message_for_model,
                        Some(prompt_name.as_str()),
                        Some(request.text.as_str()),
                    )
                    .await?;
                info!("Generation completed for prompt '{prompt_name}'");
                Some(result)
            }
            None => None,
        };

        Ok(AnalyzeResponse {
            prompt_name,
            system_prompt_name,
            prompt,
            input_text: request.text,
            message_for_model,
            generation,
        })
    }
}

fn effective_name(requested: Option<String>, default: &str) -> String {
    requested
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Fills the placeholder when the template has one; otherwise appends the text as a
/// chat turn. Never both.
pub fn compose_message(template: &str, text: &str) -> String {
    if template.contains(USER_TEXT_PLACEHOLDER) {
        template.replace(USER_TEXT_PLACEHOLDER, text)
    } else {
        format!("{template}\n\nUser: {text}\nAssistant:")
    }
}
