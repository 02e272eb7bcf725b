//! OpenAI-compatible chat-completions client for LLM-assisted pair
//! resolution (§4.7). Uses structured JSON-schema output so the response
//! is parsed without free-text scraping.

use async_trait::async_trait;
use regiodedupe_core::llm::{LlmPairContext, LlmResolution, LlmResolverPort};
use regiodedupe_domain::{AiConfig, DedupeError, LlmVerdict, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You decide whether two German regional event listings describe the \
same real-world event. Consider title wording, venue/city, and date overlap; publishers often \
word the same event differently and list slightly different dates for multi-day events. Respond \
only with the requested JSON.";

pub struct LlmHttpClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
    temperature: f64,
    max_output_tokens: u32,
}

impl LlmHttpClient {
    /// Build a client from the engine's AI configuration.
    ///
    /// # Errors
    /// Returns [`DedupeError::Config`] if AI is enabled but no `api_key`
    /// was supplied.
    pub fn new(config: &AiConfig, http_client: HttpClient) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DedupeError::Config("ai.api_key is required when ai.enabled is true".to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            api_url: DEFAULT_API_URL.to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Test-only helper to point the client at a local mock server.
    #[cfg(test)]
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_prompt(context: &LlmPairContext) -> String {
        format!(
            "Event A:\n  title: {}\n  description: {}\n  dates: {}\n\nEvent B:\n  title: {}\n  description: {}\n  dates: {}\n\ncity: {}\n\nAre these the same event?",
            context.title_a,
            context.description_a.as_deref().unwrap_or("(none)"),
            context.dates_a.join(", "),
            context.title_b,
            context.description_b.as_deref().unwrap_or("(none)"),
            context.dates_b.join(", "),
            context.city.as_deref().unwrap_or("(unknown)"),
        )
    }

    async fn call_api(&self, prompt: String) -> Result<LlmResolution> {
        let request_payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user".to_string(), content: prompt },
            ],
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchema {
                    name: "event_pair_resolution".to_string(),
                    schema: json!({
                        "type": "object",
                        "properties": {
                            "decision": {"type": "string", "enum": ["same", "different"]},
                            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                            "reasoning": {"type": "string"}
                        },
                        "required": ["decision", "confidence", "reasoning"],
                        "additionalProperties": false
                    }),
                    strict: true,
                },
            },
        };

        let request_builder = self
            .http_client
            .request(Method::POST, &self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_payload);

        let response = self.http_client.send(request_builder).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DedupeError::Unavailable(format!("LLM API returned {status}: {body}")));
        }

        let chat_response: ChatCompletionResponse =
            response.json().await.map_err(|e| DedupeError::Unavailable(format!("failed to parse LLM response: {e}")))?;

        let choice = chat_response.choices.first().ok_or_else(|| DedupeError::Unavailable("LLM response contained no choices".to_string()))?;

        let parsed: ResolutionPayload = serde_json::from_str(&choice.message.content).map_err(|e| {
            DedupeError::Unavailable(format!("failed to parse LLM structured output: {e}. content: {}", choice.message.content))
        })?;

        let decision = match parsed.decision.as_str() {
            "same" => Some(LlmVerdict::Same),
            "different" => Some(LlmVerdict::Different),
            other => {
                warn!(decision = other, "llm returned unexpected decision literal");
                None
            }
        };

        Ok(LlmResolution {
            decision,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            reasoning: parsed.reasoning,
            tokens_in: chat_response.usage.prompt_tokens,
            tokens_out: chat_response.usage.completion_tokens,
        })
    }
}

#[async_trait]
impl LlmResolverPort for LlmHttpClient {
    async fn resolve_pair(&self, context: &LlmPairContext) -> Result<LlmResolution> {
        debug!(title_a = %context.title_a, title_b = %context.title_b, "resolving ambiguous pair via LLM");
        let prompt = Self::build_prompt(context);
        let resolution = self.call_api(prompt).await?;
        info!(decision = ?resolution.decision, confidence = resolution.confidence, "llm resolution complete");
        Ok(resolution)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchema,
}

#[derive(Debug, Serialize)]
struct JsonSchema {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResolutionPayload {
    decision: String,
    confidence: f64,
    reasoning: String,
}
