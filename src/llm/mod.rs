//! LLM module for takeaways
//!
//! Provider abstraction, prompt construction and the HTTP clients for
//! Groq/OpenAI-compatible endpoints and Gemini.

mod client;
mod gemini;
mod openai;
mod prompts;

pub use client::{build_backend, resolve_model, CompletionRequest, LlmBackend, LlmProvider};
pub use gemini::GeminiClient;
pub use openai::OpenAiCompatibleClient;
pub use prompts::{build_extraction_prompt, EXTRACTION_SYSTEM_MESSAGE};
