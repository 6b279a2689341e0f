//! Repository pattern wrapper for database operations
//!
//! Provides a higher-level interface for common database operations.

use anyhow::Result;

use crate::config::Settings;
use crate::extraction::Extraction;
use crate::storage::{Database, DatabaseStats, Meeting, MeetingDetail, StoredActionItem};

/// Caller-supplied context stored with a processed meeting
#[derive(Debug, Clone, Default)]
pub struct MeetingContext {
    pub external_id: Option<String>,
    pub user_id: Option<String>,
}

/// Repository for managing meetings and action items
pub struct Repository {
    db: Database,
}

impl Repository {
    /// Create a new repository
    pub fn new(settings: &Settings) -> Result<Self> {
        let db = Database::open(settings)?;
        Ok(Self { db })
    }

    /// Wrap an already open database
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Store a processed meeting and its extracted action items
    pub fn record_extraction(
        &self,
        note_text: &str,
        context: MeetingContext,
        model: &str,
        extraction: &Extraction,
    ) -> Result<Meeting> {
        let mut meeting = Meeting::new(
            note_text.to_string(),
            extraction.result.summary.clone(),
            model.to_string(),
        );
        meeting.external_id = context.external_id;
        meeting.user_id = context.user_id;
        meeting.diagnostic = match (&extraction.llm_failure, &extraction.result.error) {
            (Some(failure), _) => Some(failure.to_string()),
            (None, Some(error)) => Some(error.to_string()),
            (None, None) => None,
        };

        self.db.insert_meeting(&meeting, &extraction.result.actions)?;
        Ok(meeting)
    }

    /// Recent meetings, optionally for one user
    pub fn history(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Meeting>> {
        self.db.list_meetings(limit, user_id)
    }

    /// Find a meeting by ID or ID prefix
    pub fn find_meeting(&self, id: &str) -> Result<Option<Meeting>> {
        match self.db.get_meeting(id)? {
            Some(meeting) => Ok(Some(meeting)),
            None => self.db.find_meeting_by_prefix(id),
        }
    }

    /// A meeting with its action items
    pub fn meeting_detail(&self, id: &str) -> Result<Option<MeetingDetail>> {
        let Some(meeting) = self.find_meeting(id)? else {
            return Ok(None);
        };

        let action_items = self.db.get_action_items(&meeting.id)?;
        Ok(Some(MeetingDetail {
            meeting,
            action_items,
        }))
    }

    /// Action items across meetings
    pub fn action_items(
        &self,
        include_completed: bool,
        limit: usize,
    ) -> Result<Vec<(StoredActionItem, Meeting)>> {
        self.db.list_action_items(include_completed, limit)
    }

    /// Set the completion flag of an action item, returning the updated item
    pub fn complete_action(&self, id: i64, completed: bool) -> Result<Option<StoredActionItem>> {
        if !self.db.set_action_completed(id, completed)? {
            return Ok(None);
        }
        self.db.get_action_item(id)
    }

    /// Search meeting notes and summaries
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Meeting>> {
        self.db.search_meetings(query, limit)
    }

    /// Delete a meeting
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.db.delete_meeting(id)
    }

    /// Database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ActionItem, ExtractionResult, LlmFailure, RecoveryFailure};

    fn repository() -> Repository {
        Repository::from_database(Database::open_memory().unwrap())
    }

    #[test]
    fn record_extraction_stores_actions_and_context() {
        let repo = repository();
        let extraction = Extraction {
            result: ExtractionResult {
                actions: vec![ActionItem::new("Draft agenda")],
                summary: "Agenda next".to_string(),
                error: None,
            },
            llm_failure: None,
        };

        let meeting = repo
            .record_extraction(
                "notes",
                MeetingContext {
                    external_id: Some("note-7".to_string()),
                    user_id: Some("u1".to_string()),
                },
                "llama-3.1-8b-instant",
                &extraction,
            )
            .unwrap();

        let detail = repo.meeting_detail(meeting.short_id()).unwrap().unwrap();
        assert_eq!(detail.meeting.id, meeting.id);
        assert_eq!(detail.meeting.external_id.as_deref(), Some("note-7"));
        assert_eq!(detail.meeting.summary, "Agenda next");
        assert_eq!(detail.meeting.diagnostic, None);
        assert_eq!(detail.action_items.len(), 1);
        assert_eq!(repo.history(Some("u1"), 10).unwrap().len(), 1);
    }

    #[test]
    fn diagnostic_prefers_llm_failure_over_parse_error() {
        let repo = repository();

        let llm_failed = Extraction {
            result: ExtractionResult::default(),
            llm_failure: Some(LlmFailure::Request("timeout".to_string())),
        };
        let meeting = repo
            .record_extraction("a", MeetingContext::default(), "m", &llm_failed)
            .unwrap();
        assert_eq!(meeting.diagnostic.as_deref(), Some("llm_error: timeout"));

        let parse_failed = Extraction {
            result: ExtractionResult::failed(RecoveryFailure::UnexpectedTopLevel),
            llm_failure: None,
        };
        let meeting = repo
            .record_extraction("b", MeetingContext::default(), "m", &parse_failed)
            .unwrap();
        assert_eq!(meeting.diagnostic.as_deref(), Some("unexpected_top_level"));
    }

    #[test]
    fn complete_action_returns_none_for_unknown_item() {
        let repo = repository();
        assert!(repo.complete_action(42, true).unwrap().is_none());
    }
}
