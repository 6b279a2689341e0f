//! Transcript to structured result pipeline
//!
//! Builds the prompt, makes a single LLM call and runs the recovery parser.
//! LLM problems never surface as errors: they degrade to an empty result
//! with an [`LlmFailure`] attached for the response envelope.

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::extraction::models::ExtractionResult;
use crate::extraction::recovery::parse_actions_and_summary;
use crate::llm::{
    build_backend, build_extraction_prompt, resolve_model, CompletionRequest, LlmBackend,
    EXTRACTION_SYSTEM_MESSAGE,
};

/// Why no model output was available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmFailure {
    #[error("llm_unconfigured: {0}")]
    Unconfigured(String),

    #[error("llm_error: {0}")]
    Request(String),
}

/// Result of running one transcript through the pipeline
#[derive(Debug, Clone)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub llm_failure: Option<LlmFailure>,
}

impl Extraction {
    fn degraded(failure: LlmFailure) -> Self {
        Self {
            result: ExtractionResult::default(),
            llm_failure: Some(failure),
        }
    }
}

/// Runs transcripts through the configured LLM backend
pub struct Extractor {
    backend: LlmBackend,
    fallback_model: String,
}

impl Extractor {
    /// Create an extractor; `fallback_model` is reported when no provider is configured.
    pub fn new(backend: LlmBackend, fallback_model: impl Into<String>) -> Self {
        Self {
            backend,
            fallback_model: fallback_model.into(),
        }
    }

    /// Build an extractor from runtime settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = build_backend(settings)?;
        if let LlmBackend::Unconfigured { reason } = &backend {
            warn!("LLM backend is not configured: {}", reason);
        }
        Ok(Self::new(backend, resolve_model(settings)))
    }

    /// Model identifier reported in responses
    pub fn model(&self) -> &str {
        match &self.backend {
            LlmBackend::Configured(provider) => provider.model(),
            LlmBackend::Unconfigured { .. } => &self.fallback_model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    /// Extract action items and a summary from a meeting transcript.
    pub async fn extract(&self, transcript: &str) -> Extraction {
        let provider = match &self.backend {
            LlmBackend::Configured(provider) => provider,
            LlmBackend::Unconfigured { reason } => {
                return Extraction::degraded(LlmFailure::Unconfigured(reason.clone()));
            }
        };

        let prompt = build_extraction_prompt(transcript);
        let raw = match provider
            .complete(CompletionRequest {
                system: EXTRACTION_SYSTEM_MESSAGE,
                prompt: &prompt,
            })
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("LLM call failed: {:#}", e);
                return Extraction::degraded(LlmFailure::Request(format!("{:#}", e)));
            }
        };

        let result = parse_actions_and_summary(&raw);
        match &result.error {
            Some(e) => warn!("Model output could not be recovered: {}", e),
            None => info!(
                "Extracted {} action items ({} bytes of model output)",
                result.actions.len(),
                raw.len()
            ),
        }

        Extraction {
            result,
            llm_failure: None,
        }
    }
}
