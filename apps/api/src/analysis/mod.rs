// Prompt analysis: request parsing, template composition and optional generation.
// Backend calls go through llm_client; template reads go through prompt_store.

pub mod handlers;
pub mod models;
pub mod service;
