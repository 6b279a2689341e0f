//! Route handlers

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::server::envelope::{id_string, ProcessRequest, ProcessedResponse};
use crate::server::{ApiError, AppState};
use crate::storage::{Meeting, MeetingContext, MeetingDetail, Repository, StoredActionItem};

const PREVIEW_CHARS: usize = 100;
const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": crate::APP_NAME,
        "version": crate::VERSION,
        "mode": state.mode(),
        "status": "running",
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mode": state.mode(),
        "version": crate::VERSION,
    }))
}

/// POST /process
///
/// LLM and parse failures still answer 200; the envelope metadata carries
/// the diagnostic instead.
pub async fn process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessedResponse>, ApiError> {
    let Json(request) = payload?;
    if let Some(timestamp) = &request.timestamp {
        debug!("Client timestamp: {}", timestamp);
    }

    let extraction = state.extractor.extract(&request.prompt).await;
    let context = MeetingContext {
        external_id: request.note_id.as_ref().and_then(id_string),
        user_id: request.user_id.as_ref().and_then(id_string),
    };

    let record = state.repository.as_ref().map(|repository| -> anyhow::Result<Meeting> {
        let repo = repository
            .lock()
            .map_err(|_| anyhow!("repository lock poisoned"))?;
        repo.record_extraction(&request.prompt, context, state.extractor.model(), &extraction)
    });

    let mut response = ProcessedResponse::new(
        extraction,
        state.extractor.model(),
        &state.source,
        request.note_id,
        request.user_id,
    );

    match record {
        Some(Ok(meeting)) => {
            info!("Stored meeting {}", meeting.short_id());
            response.metadata.record_id = Some(meeting.id);
        }
        Some(Err(e)) => warn!("Failed to store meeting: {:#}", e),
        None => {}
    }

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

/// One row of the meeting history
#[derive(Debug, Serialize)]
pub struct MeetingSummary {
    pub id: String,
    pub note_id: Option<String>,
    pub user_id: Option<String>,
    pub preview: String,
    pub summary: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl From<Meeting> for MeetingSummary {
    fn from(meeting: Meeting) -> Self {
        Self {
            preview: preview(&meeting.note_text),
            id: meeting.id,
            note_id: meeting.external_id,
            user_id: meeting.user_id,
            summary: meeting.summary,
            model: meeting.model,
            created_at: meeting.created_at,
        }
    }
}

/// GET /meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let meetings = {
        let repo = lock(state.repository()?)?;
        repo.history(query.user_id.as_deref(), limit)?
    };

    let meetings: Vec<MeetingSummary> = meetings.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "count": meetings.len(),
        "meetings": meetings,
    })))
}

/// GET /meetings/:id
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MeetingDetail>, ApiError> {
    let repo = lock(state.repository()?)?;
    repo.meeting_detail(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Meeting".to_string()))
}

/// POST /actions/:id/complete
pub async fn complete_action(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StoredActionItem>, ApiError> {
    let repo = lock(state.repository()?)?;
    repo.complete_action(id, true)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Action item".to_string()))
}

fn lock(repository: &Arc<Mutex<Repository>>) -> Result<MutexGuard<'_, Repository>, ApiError> {
    repository
        .lock()
        .map_err(|_| ApiError::Internal(anyhow!("repository lock poisoned")))
}

/// First characters of the note text, with `...` when cut.
fn preview(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
