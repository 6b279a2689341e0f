//! Data models for storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extraction::{ActionItem, Priority};

/// A processed meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    /// Unique identifier (UUID)
    pub id: String,

    /// Caller-supplied note identifier
    pub external_id: Option<String>,

    /// Caller-supplied user identifier
    pub user_id: Option<String>,

    /// Transcribed meeting text
    pub note_text: String,

    /// Summary returned by the model
    pub summary: String,

    /// Model that processed the meeting
    pub model: String,

    /// Parse error or LLM note recorded during processing
    pub diagnostic: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Create a new meeting record for the given notes
    pub fn new(note_text: String, summary: String, model: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: None,
            user_id: None,
            note_text,
            summary,
            model,
            diagnostic: None,
            created_at: Utc::now(),
        }
    }

    /// Short form of the id for display
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }
}

/// An action item as stored with its meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredActionItem {
    /// Unique identifier
    pub id: i64,

    /// Meeting this item belongs to
    pub meeting_id: String,

    /// Position in the extracted list
    pub position: i64,

    pub task: String,
    pub owner: Option<String>,
    pub deadline: Option<String>,
    pub priority: Priority,
    pub confidence: Option<f64>,

    /// Whether the item has been done
    pub completed: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl StoredActionItem {
    /// The normalized action item without storage metadata
    pub fn to_action_item(&self) -> ActionItem {
        ActionItem {
            task: self.task.clone(),
            owner: self.owner.clone(),
            deadline: self.deadline.clone(),
            priority: self.priority,
            confidence: self.confidence,
        }
    }
}

/// A meeting together with its action items
#[derive(Debug, Clone, Serialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub action_items: Vec<StoredActionItem>,
}
