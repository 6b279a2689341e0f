//! Request and response envelopes for processed meetings

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extraction::{ActionItem, Extraction};

/// Body of `POST /process`
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    /// Transcribed meeting text
    pub prompt: String,

    #[serde(default)]
    pub note_id: Option<Value>,

    /// Client-side timestamp, informational only
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub user_id: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub model: String,

    /// RFC3339 UTC with a `Z` suffix
    pub processed_at: String,

    pub source: String,

    /// LLM diagnostic, set when the model could not be called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,

    /// Stored meeting id, set when the meeting was persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Success envelope returned for every processed meeting
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedResponse {
    pub status: &'static str,
    pub meeting_id: Value,
    pub user_id: Value,
    pub actions: Vec<ActionItem>,
    pub summary: String,
    pub metadata: ResponseMetadata,
}

impl ProcessedResponse {
    /// Wrap an extraction. Caller ids are echoed back unchanged.
    pub fn new(
        extraction: Extraction,
        model: &str,
        source: &str,
        meeting_id: Option<Value>,
        user_id: Option<Value>,
    ) -> Self {
        let Extraction {
            result,
            llm_failure,
        } = extraction;

        Self {
            status: "success",
            meeting_id: meeting_id.unwrap_or(Value::Null),
            user_id: user_id.unwrap_or(Value::Null),
            actions: result.actions,
            summary: result.summary,
            metadata: ResponseMetadata {
                model: model.to_string(),
                processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                source: source.to_string(),
                note: llm_failure.map(|f| f.to_string()),
                parse_error: result.error.map(|e| e.to_string()),
                record_id: None,
            },
        }
    }
}

/// Render a caller-supplied id for storage; `null` means absent.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
