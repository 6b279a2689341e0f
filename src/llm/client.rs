use anyhow::Result;
use async_trait::async_trait;

use crate::config::Settings;
use crate::llm::gemini::{GeminiClient, DEFAULT_GEMINI_MODEL};
use crate::llm::openai::{OpenAiCompatibleClient, DEFAULT_GROQ_MODEL, DEFAULT_OPENAI_MODEL};

/// Completion request payload.
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send one prompt and return the raw reply text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

/// An LLM provider, or the reason none could be configured.
pub enum LlmBackend {
    Configured(Box<dyn LlmProvider>),
    Unconfigured { reason: String },
}

impl LlmBackend {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

/// Model to use: `llm.model` when set, otherwise the provider's default.
pub fn resolve_model(settings: &Settings) -> String {
    let model = settings.llm.model.trim();
    if !model.is_empty() {
        return model.to_string();
    }

    match settings.llm.provider.to_lowercase().as_str() {
        "openai" => DEFAULT_OPENAI_MODEL,
        "gemini" => DEFAULT_GEMINI_MODEL,
        _ => DEFAULT_GROQ_MODEL,
    }
    .to_string()
}

/// Build the LLM backend from runtime settings.
///
/// A missing API key yields [`LlmBackend::Unconfigured`]; an unknown provider
/// name is a configuration error.
pub fn build_backend(settings: &Settings) -> Result<LlmBackend> {
    let provider = settings.llm.provider.to_lowercase();
    if !matches!(provider.as_str(), "groq" | "openai" | "gemini") {
        anyhow::bail!(
            "Unsupported llm.provider '{}'. Supported providers: groq, openai, gemini",
            settings.llm.provider
        );
    }

    if settings.llm.api_key.trim().is_empty() {
        return Ok(LlmBackend::Unconfigured {
            reason: format!(
                "no API key for provider '{}'. Set llm.api_key in config or TAKEAWAYS_LLM_API_KEY.",
                provider
            ),
        });
    }

    let backend: Box<dyn LlmProvider> = match provider.as_str() {
        "gemini" => Box::new(GeminiClient::from_settings(settings)?),
        _ => Box::new(OpenAiCompatibleClient::from_settings(settings)?),
    };

    Ok(LlmBackend::Configured(backend))
}
