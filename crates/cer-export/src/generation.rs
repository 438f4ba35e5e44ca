//! Report generation service boundary.
//!
//! The exporter never calls the service itself; the CLI asks a
//! [`GenerationClient`] for markdown and feeds the result into an export.
//! Failures are surfaced as the service reported them, with no retry.

use std::time::Duration;

use cer_config::GenerationConfig;
use serde::{Deserialize, Serialize};
use ureq::Agent;

/// Error from the generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// Service answered with an error status; carries its response text.
    #[error("generation service error: {0}")]
    Upstream(String),

    /// Service answered without any generated text.
    #[error("generation service returned no text")]
    EmptyResponse,
}

/// Turns a prompt into generated markdown.
pub trait GenerationClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// [`GenerationClient`] for the Gemini `generateContent` API.
pub struct GeminiClient {
    agent: Agent,
    api_url: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiClient {
    /// Create a client from the `[generation]` settings.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationSettings {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        }
    }
}

impl GenerationClient for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::info!(model = %self.model, prompt_len = prompt.len(), "Requesting generation");

        let response = self
            .agent
            .post(&self.endpoint_url())
            .header("x-goog-api-key", &self.api_key)
            .send_json(self.request_body(prompt))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(GenerationError::Upstream(format!(
                "HTTP {status}: {}",
                error_body.trim()
            )));
        }

        let response: GenerateResponse = body.read_json()?;
        let text = response.text().ok_or(GenerationError::EmptyResponse)?;
        tracing::info!(len = text.len(), "Generation complete");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    max_output_tokens: u32,
    temperature: f32,
}

/// `generateContent` response.
///
/// Only the generated text is read; serde ignores the other fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}
