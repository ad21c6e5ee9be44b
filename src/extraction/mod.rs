//! Structured note extraction backed by a function-calling model.
//!
//! The extractor mirrors the embedding adapter by issuing HTTP requests
//! directly to the model runtime. The model is forced to answer through the
//! `formatNotes` function at zero temperature; its argument payload is then
//! isolated and decoded into typed note records. Models routinely wrap the
//! notes array in prose or an enclosing object, so the decoder keeps only the
//! substring between the first `[` and the last `]` before parsing.

pub mod prompts;

use crate::config::Config;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while deriving notes from a paper.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Model backend was unreachable or returned an error response.
    #[error("Model backend request failed: {0}")]
    Backend(String),
    /// Response carried no structured function-call payload.
    #[error("Model response carried no structured function-call payload")]
    NoStructuredResponse,
    /// Function-call payload did not isolate or parse into note records.
    #[error("Malformed function-call payload: {0}")]
    MalformedPayload(String),
}

/// A single analytical note derived from a paper.
///
/// `text` is never empty on a successfully extracted note; `page_numbers`
/// may legitimately be empty when the model offers no attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperNote {
    /// The note itself.
    pub text: String,
    /// 1-indexed pages the note draws from.
    #[serde(default)]
    pub page_numbers: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    name: String,
    arguments: Value,
}

/// Derives structured notes from paper text via the model backend.
pub struct NoteExtractor {
    http: Client,
    base_url: String,
    model: String,
}

impl NoteExtractor {
    /// Construct an extractor from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, ExtractionError> {
        let http = Client::builder()
            .user_agent("papernotes/0.2")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|error| ExtractionError::Backend(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.ollama_url.clone(),
            model: config.notes_model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    /// Extract notes covering the supplied paper text.
    ///
    /// Failures are not retried here; the caller decides whether to rerun the
    /// pipeline.
    pub async fn extract(&self, paper: &str) -> Result<Vec<PaperNote>, ExtractionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompts::build_note_prompt(paper) }
            ],
            "stream": false,
            "options": {
                // Zero temperature keeps extraction deterministic.
                "temperature": 0.0,
            },
            "tools": [
                { "type": "function", "function": prompts::notes_tool_schema() }
            ],
            "tool_choice": {
                "type": "function",
                "function": { "name": prompts::FORMAT_NOTES_FUNCTION }
            },
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ExtractionError::Backend(format!(
                    "failed to reach model backend at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Backend(format!(
                "model backend returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            ExtractionError::Backend(format!("failed to decode model response: {error}"))
        })?;

        let call = body
            .message
            .map(|message| message.tool_calls)
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(ExtractionError::NoStructuredResponse)?;
        tracing::debug!(function = %call.function.name, "Received structured function call");

        let notes = parse_notes(&render_arguments(call.function.arguments))?;
        tracing::info!(notes = notes.len(), "Extracted notes from paper");
        Ok(notes)
    }
}

/// Render the function arguments as a string regardless of wire shape.
///
/// Some backends return the arguments as a JSON string, others as an
/// already-parsed object; both feed the same isolation step.
fn render_arguments(arguments: Value) -> String {
    match arguments {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Isolate the notes array from surrounding noise and decode it.
pub(crate) fn parse_notes(arguments: &str) -> Result<Vec<PaperNote>, ExtractionError> {
    let start = arguments.find('[').ok_or_else(|| {
        ExtractionError::MalformedPayload("no '[' found in function arguments".into())
    })?;
    let end = arguments
        .rfind(']')
        .filter(|&end| end >= start)
        .ok_or_else(|| {
            ExtractionError::MalformedPayload("no closing ']' found in function arguments".into())
        })?;

    let isolated = &arguments[start..=end];
    let notes: Vec<PaperNote> = serde_json::from_str(isolated)
        .map_err(|error| ExtractionError::MalformedPayload(error.to_string()))?;

    if let Some(position) = notes.iter().position(|note| note.text.trim().is_empty()) {
        return Err(ExtractionError::MalformedPayload(format!(
            "note at index {position} has empty text"
        )));
    }

    Ok(notes)
}
