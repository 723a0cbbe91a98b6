//! Inference-service boundary.
//!
//! The core talks to the inference service through the [`InferenceClient`]
//! trait: a request carries the reviewer identity, the assembled prompt, and
//! the reply schema; the response is raw structured text, parsed and
//! validated separately (see [`crate::schema`]). Rate-limit negotiation and
//! retry policy live in the injected wrapper (see [`crate::circuit`]), never
//! here.

use clinex_core::error::{AgentCallResult, AgentError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// One reviewer call to the inference service.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest {
    /// Reviewer identity issuing the call
    pub agent_name: String,
    /// Assembled prompt: task instructions + item data + category context
    pub prompt: String,
    /// JSON schema the response must conform to
    pub response_schema: serde_json::Value,
}

/// Boundary to the external inference service.
///
/// Implementations are side-effect-free round trips; concurrent calls never
/// share mutable state.
pub trait InferenceClient: Send + Sync {
    /// Issue one generation call and return the raw response text.
    fn generate(&self, request: InferenceRequest) -> BoxFuture<'_, AgentCallResult<String>>;
}

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// HTTP client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for the default model.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    async fn generate_inner(&self, request: InferenceRequest) -> AgentCallResult<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 2048,
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema,
            },
        };

        let url = format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AgentError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Transport(format!(
                "inference service error ({status}): {detail}"
            )));
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Transport(format!("undecodable envelope: {e}")))?;

        envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AgentError::Transport("empty candidate set".to_string()))
    }
}

impl InferenceClient for GeminiClient {
    fn generate(&self, request: InferenceRequest) -> BoxFuture<'_, AgentCallResult<String>> {
        Box::pin(self.generate_inner(request))
    }
}
