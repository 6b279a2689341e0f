//! Storage module for takeaways
//!
//! Persists processed meetings and their action items in SQLite, with FTS5
//! for full-text search over notes and summaries.

mod database;
mod models;
mod repository;

pub use database::{Database, DatabaseStats};
pub use models::{Meeting, MeetingDetail, StoredActionItem};
pub use repository::{MeetingContext, Repository};
