use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::Settings;
use crate::llm::client::{resolve_model, CompletionRequest, LlmProvider};

const DEFAULT_GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub(crate) const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Client for OpenAI-compatible chat completion endpoints (Groq, OpenAI).
pub struct OpenAiCompatibleClient {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
}

impl OpenAiCompatibleClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.llm.api_key.trim().to_string();
        if api_key.is_empty() {
            anyhow::bail!(
                "LLM API key is missing. Set llm.api_key in config or TAKEAWAYS_LLM_API_KEY."
            );
        }

        let is_openai = settings.llm.provider.eq_ignore_ascii_case("openai");

        let model = resolve_model(settings);

        let endpoint = if settings.llm.endpoint.trim().is_empty() {
            if is_openai {
                DEFAULT_OPENAI_ENDPOINT
            } else {
                DEFAULT_GROQ_ENDPOINT
            }
            .to_string()
        } else {
            settings.llm.endpoint.trim().to_string()
        };

        Ok(Self {
            http: Client::builder()
                .timeout(settings.llm_timeout())
                .build()
                .context("Failed to build LLM HTTP client")?,
            api_key,
            model,
            endpoint,
            temperature: settings.llm.temperature,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read LLM response body")?;

        if !status.is_success() {
            anyhow::bail!("LLM request failed: {} - {}", status, text);
        }

        Ok(reply_text(&text))
    }
}

/// Pull the reply out of a chat completion body.
///
/// Prefers the chat shape, then the legacy completion shape, and falls back
/// to the body itself so the recovery parser still gets a look at it.
fn reply_text(body: &str) -> String {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    ["/choices/0/message/content", "/choices/0/text"]
        .iter()
        .find_map(|pointer| payload.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}
