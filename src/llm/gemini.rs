use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::llm::client::{resolve_model, CompletionRequest, LlmProvider};

const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.llm.api_key.trim().to_string();
        if api_key.is_empty() {
            anyhow::bail!(
                "Gemini API key is missing. Set llm.api_key in config or TAKEAWAYS_LLM_API_KEY."
            );
        }

        let model = resolve_model(settings);

        let endpoint = if settings.llm.endpoint.trim().is_empty() {
            DEFAULT_GEMINI_ENDPOINT.to_string()
        } else {
            settings
                .llm
                .endpoint
                .trim()
                .trim_end_matches('/')
                .to_string()
        };

        Ok(Self {
            http: Client::builder()
                .timeout(settings.llm_timeout())
                .build()
                .context("Failed to build Gemini HTTP client")?,
            api_key,
            model,
            endpoint,
            temperature: settings.llm.temperature,
        })
    }

    fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let body = GeminiGenerateContentRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart {
                    text: request.system.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: request.prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Gemini request failed")?;

        let response = response
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("Gemini returned an error status")?;

        let payload: GeminiGenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let reply = payload
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(str::to_string)
            .context("Gemini response did not contain any text")?;

        Ok(reply)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_fields() {
        let body = GeminiGenerateContentRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart {
                    text: "sys".to_string(),
                }],
            },
            contents: vec![],
            generation_config: GeminiGenerationConfig { temperature: 0.0 },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("systemInstruction").is_some());
        assert!(value.get("generationConfig").is_some());
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let mut settings = Settings::default();
        settings.llm.api_key = "key".to_string();
        settings.llm.model = "gemini-test".to_string();
        settings.llm.endpoint = "http://localhost:9000/v1/".to_string();

        let client = GeminiClient::from_settings(&settings).unwrap();
        assert_eq!(
            client.request_url(),
            "http://localhost:9000/v1/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn direct_construction_requires_api_key() {
        let mut settings = Settings::default();
        settings.llm.provider = "gemini".to_string();
        settings.llm.api_key = "   ".to_string();

        let err = match GeminiClient::from_settings(&settings) {
            Ok(_) => panic!("expected a missing key error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("Gemini API key is missing"));
    }

    #[tokio::test]
    async fn request_errors_do_not_expose_api_key() {
        let mut settings = Settings::default();
        settings.llm.provider = "gemini".to_string();
        settings.llm.api_key = "SECRET-GEMINI-KEY".to_string();
        settings.llm.endpoint = "http://127.0.0.1:1".to_string();

        let client = GeminiClient::from_settings(&settings).unwrap();
        assert!(!client.request_url().contains("SECRET-GEMINI-KEY"));

        let err = client
            .complete(CompletionRequest {
                system: "sys",
                prompt: "hello",
            })
            .await
            .expect_err("nothing listens on port 1");
        let rendered = format!("{:#}", err);
        assert!(rendered.starts_with("Gemini request failed"));
        assert!(!rendered.contains("SECRET-GEMINI-KEY"), "{}", rendered);
    }
}
