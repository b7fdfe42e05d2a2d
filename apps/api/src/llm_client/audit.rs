//! Append-only CSV audit log of generation calls.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::GenerationResult;

/// Fixed column order. Never reorder: existing log files depend on it.
pub const COLUMNS: [&str; 17] = [
    "prompt_name",
    "input_text",
    "model",
    "created_at",
    "response",
    "thinking",
    "done",
    "done_reason",
    "total_duration",
    "load_duration",
    "prompt_eval_count",
    "prompt_eval_duration",
    "eval_count",
    "eval_duration",
    "logprobs",
    "rdf_valid",
    "rdf_note",
];

/// Result fields copied verbatim into the row, between `input_text` and `logprobs`.
const RESULT_FIELDS: [&str; 12] = [
    "model",
    "created_at",
    "response",
    "thinking",
    "done",
    "done_reason",
    "total_duration",
    "load_duration",
    "prompt_eval_count",
    "prompt_eval_duration",
    "eval_count",
    "eval_duration",
];

pub const NOT_RDF_NOTE: &str = "Response not recognized as RDF/Turtle.";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit log encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("audit log encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loose RDF/Turtle sniff: an `@prefix` declaration plus a statement terminator or
/// clause separator somewhere in the text. Not a validator.
pub fn is_likely_turtle(text: &str) -> bool {
    text.contains("@prefix") && (text.contains(';') || text.contains('.'))
}

/// Process-wide handle on the audit CSV file.
///
/// Appends are serialized through a mutex; the header is emitted only by the writer
/// that wins the exclusive create, in the same write as its first row.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row for `result`. I/O failures are returned, never swallowed.
    pub async fn append(
        &self,
        result: &GenerationResult,
        prompt_name: Option<&str>,
        input_text: Option<&str>,
    ) -> Result<(), AuditError> {
        let row = build_row(result, prompt_name, input_text)?;

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (mut file, write_header) = match OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => (file, true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                (OpenOptions::new().append(true).open(&self.path).await?, false)
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = encode(write_header, &row)?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        Ok(())
    }
}

fn build_row(
    result: &GenerationResult,
    prompt_name: Option<&str>,
    input_text: Option<&str>,
) -> Result<Vec<String>, AuditError> {
    let rdf_valid = result
        .get("response")
        .and_then(Value::as_str)
        .is_some_and(is_likely_turtle);
    let rdf_note = if rdf_valid { "" } else { NOT_RDF_NOTE };

    let mut row = Vec::with_capacity(COLUMNS.len());
    row.push(prompt_name.unwrap_or_default().to_string());
    row.push(input_text.unwrap_or_default().to_string());
    row.extend(RESULT_FIELDS.iter().map(|field| cell(result.get(*field))));
    row.push(serde_json::to_string(
        result.get("logprobs").unwrap_or(&Value::Null),
    )?);
    row.push(rdf_valid.to_string());
    row.push(rdf_note.to_string());

    Ok(row)
}

/// Flattens a JSON value into a single CSV cell.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn encode(write_header: bool, row: &[String]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if write_header {
        writer.write_record(COLUMNS)?;
    }
    writer.write_record(row)?;
    writer
        .into_inner()
        .map_err(|e| AuditError::Io(e.into_error()))
}
