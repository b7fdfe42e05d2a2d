use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::options::GenerationOptions;

const DEFAULT_PROMPT: &str = "knowledge_graph_prompt.txt";
const DEFAULT_SYSTEM_PROMPT: &str = "system_prompt.txt";
const DEFAULT_CSV_PATH: &str = "logs/generations.csv";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Application configuration loaded from environment variables.
/// Read once at startup and handed to the services that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub prompt_dir: PathBuf,
    pub default_prompt: String,
    pub default_system_prompt: String,
    /// `None` runs the service in template-preview-only mode.
    pub backend: Option<BackendConfig>,
}

/// Connection details for the Ollama-compatible generation backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub model: String,
    pub csv_path: PathBuf,
    pub timeout: Duration,
    pub options: GenerationOptions,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            prompt_dir: PathBuf::from(env_or("PROMPT_DIR", "prompt")),
            default_prompt: env_or("DEFAULT_PROMPT", DEFAULT_PROMPT),
            default_system_prompt: env_or("DEFAULT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            backend: BackendConfig::from_env()?,
        })
    }
}

impl BackendConfig {
    /// Returns `Ok(None)` when `OLLAMA_API_URL` is unset or blank.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(url) = optional_env("OLLAMA_API_URL") else {
            return Ok(None);
        };
        let Some(model) = optional_env("OLLAMA_MODEL") else {
            bail!("OLLAMA_MODEL must be set when OLLAMA_API_URL is configured");
        };

        let timeout_secs = match optional_env("OLLAMA_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("OLLAMA_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Some(BackendConfig {
            url,
            model,
            csv_path: PathBuf::from(env_or("OLLAMA_CSV_PATH", DEFAULT_CSV_PATH)),
            timeout: Duration::from_secs(timeout_secs),
            options: GenerationOptions {
                seed: parsed_env("OLLAMA_SEED"),
                temperature: parsed_env("OLLAMA_TEMPERATURE"),
                top_k: parsed_env("OLLAMA_TOP_K"),
                top_p: parsed_env("OLLAMA_TOP_P"),
                min_p: parsed_env("OLLAMA_MIN_P"),
                stop: optional_env("OLLAMA_STOP"),
                num_ctx: parsed_env("OLLAMA_NUM_CTX"),
                num_predict: parsed_env("OLLAMA_NUM_PREDICT"),
            },
        }))
    }
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Unset and empty values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Tuning parameters fall back to the backend default when they do not parse.
fn parsed_env<T: FromStr>(key: &str) -> Option<T> {
    optional_env(key).and_then(|v| v.trim().parse().ok())
}
