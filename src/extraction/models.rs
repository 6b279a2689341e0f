//! Data models for extracted meeting output

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Priority of an action item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Parse a priority label, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// A normalized action item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    /// What needs to be done
    pub task: String,

    /// Person responsible
    pub owner: Option<String>,

    /// Deadline as stated in the meeting (free-form)
    pub deadline: Option<String>,

    /// Priority, `Medium` unless the model said otherwise
    pub priority: Priority,

    /// Model certainty (0.0 - 1.0)
    pub confidence: Option<f64>,
}

impl ActionItem {
    /// Create an action item with only a task set
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            owner: None,
            deadline: None,
            priority: Priority::default(),
            confidence: None,
        }
    }
}

/// Why the raw model output could not be turned into a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryFailure {
    /// No candidate substring decoded as JSON
    #[error("json_parse_error: {0}")]
    JsonParse(String),

    /// JSON decoded, but the top level was not an object
    #[error("unexpected_top_level")]
    UnexpectedTopLevel,
}

/// Outcome of running the recovery parser over one model reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub actions: Vec<ActionItem>,
    pub summary: String,
    pub error: Option<RecoveryFailure>,
}

impl ExtractionResult {
    /// Empty result carrying a recovery failure
    pub fn failed(error: RecoveryFailure) -> Self {
        Self {
            actions: Vec::new(),
            summary: String::new(),
            error: Some(error),
        }
    }

    /// Diagnostic tag; empty when a payload object was decoded.
    pub fn error_tag(&self) -> String {
        self.error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}
