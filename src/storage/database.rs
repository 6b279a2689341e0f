//! SQLite database management with FTS5 support

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use crate::config::Settings;
use crate::extraction::{ActionItem, Priority};
use crate::storage::models::{Meeting, StoredActionItem};

/// Database wrapper for takeaways
pub struct Database {
    conn: Connection,
}

const CURRENT_SCHEMA_VERSION: i64 = 1;

const MEETING_COLUMNS: &str =
    "m.id, m.external_id, m.user_id, m.note_text, m.summary, m.model, m.diagnostic, m.created_at";

const ACTION_COLUMNS: &str =
    "a.id, a.meeting_id, a.position, a.task, a.owner, a.deadline, a.priority, a.confidence, a.completed, a.created_at";

impl Database {
    /// Open or create the database
    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = settings.database_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open_path(&db_path)
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let current_version = self.schema_version()?;
        if current_version > CURRENT_SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is newer than supported version {}",
                current_version,
                CURRENT_SCHEMA_VERSION
            );
        }

        if current_version < 1 {
            self.migrate_to_v1()?;
            self.set_schema_version(1)?;
        }

        Ok(())
    }

    /// Current schema version tracked in PRAGMA user_version.
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?)
    }

    fn set_schema_version(&self, version: i64) -> Result<()> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {};", version))?;
        Ok(())
    }

    fn migrate_to_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meetings (
                id TEXT PRIMARY KEY,
                external_id TEXT,
                user_id TEXT,
                note_text TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                model TEXT NOT NULL DEFAULT '',
                diagnostic TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_meetings_created_at
                ON meetings(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_meetings_user_id
                ON meetings(user_id);
            "#,
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS action_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                task TEXT NOT NULL,
                owner TEXT,
                deadline TEXT,
                priority TEXT NOT NULL DEFAULT 'Medium',
                confidence REAL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (meeting_id) REFERENCES meetings(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_action_items_meeting_id
                ON action_items(meeting_id, position);
            CREATE INDEX IF NOT EXISTS idx_action_items_completed
                ON action_items(completed);
            "#,
        )?;

        // Full-text index over notes and summaries
        self.conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS meeting_fts USING fts5(
                note_text,
                summary,
                content='meetings',
                content_rowid='rowid',
                tokenize='porter unicode61'
            );

            CREATE TRIGGER IF NOT EXISTS meetings_ai AFTER INSERT ON meetings BEGIN
                INSERT INTO meeting_fts(rowid, note_text, summary)
                VALUES (new.rowid, new.note_text, new.summary);
            END;

            CREATE TRIGGER IF NOT EXISTS meetings_ad AFTER DELETE ON meetings BEGIN
                INSERT INTO meeting_fts(meeting_fts, rowid, note_text, summary)
                VALUES ('delete', old.rowid, old.note_text, old.summary);
            END;

            CREATE TRIGGER IF NOT EXISTS meetings_au AFTER UPDATE ON meetings BEGIN
                INSERT INTO meeting_fts(meeting_fts, rowid, note_text, summary)
                VALUES ('delete', old.rowid, old.note_text, old.summary);
                INSERT INTO meeting_fts(rowid, note_text, summary)
                VALUES (new.rowid, new.note_text, new.summary);
            END;
            "#,
        )?;

        // Index rows that predate the FTS table
        self.conn
            .execute_batch("INSERT INTO meeting_fts(meeting_fts) VALUES ('rebuild');")?;

        Ok(())
    }

    /// Insert a meeting and its action items in one transaction
    pub fn insert_meeting(&self, meeting: &Meeting, actions: &[ActionItem]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO meetings (id, external_id, user_id, note_text, summary, model, diagnostic, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                meeting.id,
                meeting.external_id,
                meeting.user_id,
                meeting.note_text,
                meeting.summary,
                meeting.model,
                meeting.diagnostic,
                meeting.created_at.timestamp(),
            ],
        )?;

        for (position, action) in actions.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO action_items (meeting_id, position, task, owner, deadline, priority, confidence, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    meeting.id,
                    position as i64,
                    action.task,
                    action.owner,
                    action.deadline,
                    action.priority.as_str(),
                    action.confidence,
                    meeting.created_at.timestamp(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get a meeting by ID
    pub fn get_meeting(&self, id: &str) -> Result<Option<Meeting>> {
        let meeting = self
            .conn
            .query_row(
                &format!("SELECT {} FROM meetings m WHERE m.id = ?1", MEETING_COLUMNS),
                params![id],
                |row| Self::row_to_meeting(row, 0),
            )
            .optional()?;

        Ok(meeting)
    }

    /// Find a meeting by ID prefix
    pub fn find_meeting_by_prefix(&self, prefix: &str) -> Result<Option<Meeting>> {
        let pattern = format!("{}%", prefix);

        let meeting = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM meetings m WHERE m.id LIKE ?1 ORDER BY m.created_at DESC LIMIT 1",
                    MEETING_COLUMNS
                ),
                params![pattern],
                |row| Self::row_to_meeting(row, 0),
            )
            .optional()?;

        Ok(meeting)
    }

    /// List meetings ordered by creation date, optionally for one user
    pub fn list_meetings(&self, limit: usize, user_id: Option<&str>) -> Result<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}
             FROM meetings m
             WHERE ?1 IS NULL OR m.user_id = ?1
             ORDER BY m.created_at DESC, m.rowid DESC
             LIMIT ?2",
            MEETING_COLUMNS
        ))?;

        let meetings = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Self::row_to_meeting(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(meetings)
    }

    /// Full-text search across meeting notes and summaries
    pub fn search_meetings(&self, query: &str, limit: usize) -> Result<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM meeting_fts f
            JOIN meetings m ON f.rowid = m.rowid
            WHERE meeting_fts MATCH ?1
            ORDER BY rank
            LIMIT ?2
            "#,
            MEETING_COLUMNS
        ))?;

        let meetings = stmt
            .query_map(params![query, limit as i64], |row| {
                Self::row_to_meeting(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(meetings)
    }

    /// Delete a meeting and its action items
    pub fn delete_meeting(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM meetings WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Get the action items of a meeting in extraction order
    pub fn get_action_items(&self, meeting_id: &str) -> Result<Vec<StoredActionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}
             FROM action_items a
             WHERE a.meeting_id = ?1
             ORDER BY a.position",
            ACTION_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![meeting_id], |row| Self::row_to_action(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Get a single action item
    pub fn get_action_item(&self, id: i64) -> Result<Option<StoredActionItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {} FROM action_items a WHERE a.id = ?1", ACTION_COLUMNS),
                params![id],
                |row| Self::row_to_action(row, 0),
            )
            .optional()?;

        Ok(item)
    }

    /// List action items across meetings, newest meetings first
    pub fn list_action_items(
        &self,
        include_completed: bool,
        limit: usize,
    ) -> Result<Vec<(StoredActionItem, Meeting)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, {}
             FROM action_items a
             JOIN meetings m ON a.meeting_id = m.id
             WHERE ?1 OR a.completed = 0
             ORDER BY m.created_at DESC, m.rowid DESC, a.position
             LIMIT ?2",
            ACTION_COLUMNS, MEETING_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![include_completed, limit as i64], |row| {
                Ok((Self::row_to_action(row, 0)?, Self::row_to_meeting(row, 10)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Mark an action item as completed (or not). Returns false if no such item.
    pub fn set_action_completed(&self, id: i64, completed: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE action_items SET completed = ?2 WHERE id = ?1",
            params![id, completed],
        )?;
        Ok(updated > 0)
    }

    fn row_to_meeting(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Meeting> {
        let created_timestamp: i64 = row.get(offset + 7)?;

        Ok(Meeting {
            id: row.get(offset)?,
            external_id: row.get(offset + 1)?,
            user_id: row.get(offset + 2)?,
            note_text: row.get(offset + 3)?,
            summary: row.get(offset + 4)?,
            model: row.get(offset + 5)?,
            diagnostic: row.get(offset + 6)?,
            created_at: from_timestamp(created_timestamp),
        })
    }

    fn row_to_action(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<StoredActionItem> {
        let priority: String = row.get(offset + 6)?;
        let created_timestamp: i64 = row.get(offset + 9)?;

        Ok(StoredActionItem {
            id: row.get(offset)?,
            meeting_id: row.get(offset + 1)?,
            position: row.get(offset + 2)?,
            task: row.get(offset + 3)?,
            owner: row.get(offset + 4)?,
            deadline: row.get(offset + 5)?,
            priority: Priority::parse(&priority).unwrap_or_default(),
            confidence: row.get(offset + 7)?,
            completed: row.get(offset + 8)?,
            created_at: from_timestamp(created_timestamp),
        })
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let total_meetings: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM meetings", [], |row| row.get(0))?;

        let total_actions: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM action_items", [], |row| row.get(0))?;

        let open_actions: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM action_items WHERE completed = 0",
            [],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            total_meetings: total_meetings as usize,
            total_actions: total_actions as usize,
            open_actions: open_actions as usize,
        })
    }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_meetings: usize,
    pub total_actions: usize,
    pub open_actions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::tempdir;

    fn sample_meeting(notes: &str) -> Meeting {
        Meeting::new(notes.to_string(), "summary".to_string(), "test-model".to_string())
    }

    #[test]
    fn test_create_database() {
        let db = Database::open_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_meetings, 0);
        assert_eq!(stats.open_actions, 0);
    }

    #[test]
    fn test_insert_meeting_with_actions() {
        let db = Database::open_memory().unwrap();

        let meeting = sample_meeting("Sam sends the deck");
        let mut deck = ActionItem::new("Send the deck");
        deck.owner = Some("Sam".to_string());
        deck.priority = Priority::High;
        deck.confidence = Some(0.8);
        db.insert_meeting(&meeting, &[deck.clone(), ActionItem::new("Book room")])
            .unwrap();

        let retrieved = db.get_meeting(&meeting.id).unwrap().unwrap();
        assert_eq!(retrieved.note_text, "Sam sends the deck");

        let items = db.get_action_items(&meeting.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_action_item(), deck);
        assert_eq!(items[1].task, "Book room");
        assert!(!items[1].completed);
    }

    #[test]
    fn test_complete_action_item() {
        let db = Database::open_memory().unwrap();
        let meeting = sample_meeting("notes");
        db.insert_meeting(&meeting, &[ActionItem::new("Do it")]).unwrap();

        let id = db.get_action_items(&meeting.id).unwrap()[0].id;
        assert!(db.set_action_completed(id, true).unwrap());
        assert!(db.get_action_item(id).unwrap().unwrap().completed);
        assert!(!db.set_action_completed(id + 100, true).unwrap());

        let open = db.list_action_items(false, 10).unwrap();
        assert!(open.is_empty());
        let all = db.list_action_items(true, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1.id, meeting.id);
    }

    #[test]
    fn test_search_meetings() {
        let db = Database::open_memory().unwrap();
        db.insert_meeting(&sample_meeting("Budget review with finance"), &[])
            .unwrap();
        db.insert_meeting(&sample_meeting("Hiring plan"), &[]).unwrap();

        let results = db.search_meetings("budget", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].note_text.contains("Budget"));
    }

    #[test]
    fn test_list_meetings_filters_by_user() {
        let db = Database::open_memory().unwrap();
        let mut mine = sample_meeting("mine");
        mine.user_id = Some("u1".to_string());
        let mut theirs = sample_meeting("theirs");
        theirs.user_id = Some("u2".to_string());
        db.insert_meeting(&mine, &[]).unwrap();
        db.insert_meeting(&theirs, &[]).unwrap();

        assert_eq!(db.list_meetings(10, None).unwrap().len(), 2);
        let filtered = db.list_meetings(10, Some("u1")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, mine.id);
    }

    #[test]
    fn test_new_database_sets_schema_version() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_opening_legacy_database_runs_migration() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("legacy.db");

        // Meetings table created before version tracking and the FTS index.
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE meetings (
                id TEXT PRIMARY KEY,
                external_id TEXT,
                user_id TEXT,
                note_text TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                model TEXT NOT NULL DEFAULT '',
                diagnostic TEXT,
                created_at INTEGER NOT NULL
            );

            INSERT INTO meetings (id, note_text, summary, created_at)
            VALUES ('legacy-1', 'legacy searchable notes', '', 0);
            "#,
        )
        .unwrap();
        drop(conn);

        let db = Database::open_path(&db_path).unwrap();
        assert_eq!(db.schema_version().unwrap(), 1);

        let results = db.search_meetings("searchable", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "legacy-1");
    }
}
