//! CLI command implementations

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use std::io::Read;
use std::path::PathBuf;

use crate::cli::args::{ConfigCommand, ExportFormat};
use crate::config::Settings;
use crate::extraction::{parse_actions_and_summary, select_candidate, ActionItem, Extractor};
use crate::llm::{build_extraction_prompt, resolve_model};
use crate::server::ProcessedResponse;
use crate::storage::{MeetingContext, MeetingDetail, Repository, StoredActionItem};

/// Extract action items from meeting notes
pub async fn extract_notes(
    settings: &Settings,
    file: Option<PathBuf>,
    context: MeetingContext,
    save: bool,
    json: bool,
) -> Result<()> {
    let notes = read_input(file)?;
    if notes.trim().is_empty() {
        warn!("No meeting notes provided; extracting from an empty transcript");
    }

    let extractor = Extractor::from_settings(settings)?;
    let extraction = extractor.extract(&notes).await;

    let record = if save && settings.general.persist {
        let repo = Repository::new(settings)?;
        Some(repo.record_extraction(&notes, context.clone(), extractor.model(), &extraction)?)
    } else {
        None
    };

    let mut response = ProcessedResponse::new(
        extraction,
        extractor.model(),
        &settings.server.source_name,
        context.external_id.map(Value::String),
        context.user_id.map(Value::String),
    );
    response.metadata.record_id = record.map(|meeting| meeting.id);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if let Some(note) = &response.metadata.note {
        eprintln!("warning: {}", note);
    }
    if let Some(error) = &response.metadata.parse_error {
        eprintln!("warning: could not parse model output ({})", error);
    }

    print_result(&response.summary, &response.actions);

    if let Some(id) = &response.metadata.record_id {
        println!();
        println!("Saved as {}", &id[..8.min(id.len())]);
    }

    Ok(())
}

/// Run the recovery parser over raw model output
pub fn parse_output(file: Option<PathBuf>, json: bool) -> Result<()> {
    let raw = read_input(file)?;
    let candidate = select_candidate(&raw);
    let result = parse_actions_and_summary(&raw);

    if json {
        let value = json!({
            "actions": result.actions,
            "summary": result.summary,
            "error": result.error_tag(),
            "candidate": format!("{:?}", candidate.source),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Candidate: {:?}", candidate.source);
    if let Some(error) = &result.error {
        println!("Error: {}", error);
    }
    println!();
    print_result(&result.summary, &result.actions);

    Ok(())
}

/// Print the exact prompt sent for some notes
pub fn show_prompt(file: Option<PathBuf>) -> Result<()> {
    let notes = read_input(file)?;
    print!("{}", build_extraction_prompt(&notes));
    Ok(())
}

/// List processed meetings
pub fn list_meetings(
    settings: &Settings,
    limit: usize,
    user: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let repo = Repository::new(settings)?;

    let meetings = match search {
        Some(query) => repo.search(&query, limit)?,
        None => repo.history(user.as_deref(), limit)?,
    };

    if meetings.is_empty() {
        println!("No meetings found");
        return Ok(());
    }

    println!("{:<10} {:<12} {:<12} {:<40}", "ID", "Date", "User", "Summary");
    println!("{}", "-".repeat(76));

    for meeting in meetings {
        println!(
            "{:<10} {:<12} {:<12} {:<40}",
            meeting.short_id(),
            meeting.created_at.format("%Y-%m-%d"),
            truncate(meeting.user_id.as_deref().unwrap_or("-"), 12),
            truncate(&meeting.summary, 40)
        );
    }

    Ok(())
}

/// View a meeting with its action items
pub fn view_meeting(settings: &Settings, id: &str) -> Result<()> {
    let repo = Repository::new(settings)?;
    let detail = repo.meeting_detail(id)?.context("Meeting not found")?;
    let meeting = &detail.meeting;

    println!("ID: {}", meeting.id);
    println!("Date: {}", meeting.created_at.format("%Y-%m-%d %H:%M"));
    println!("Model: {}", meeting.model);
    if let Some(note_id) = &meeting.external_id {
        println!("Note: {}", note_id);
    }
    if let Some(user_id) = &meeting.user_id {
        println!("User: {}", user_id);
    }
    if let Some(diagnostic) = &meeting.diagnostic {
        println!("Diagnostic: {}", diagnostic);
    }

    println!();
    println!("Summary:");
    if meeting.summary.is_empty() {
        println!("(none)");
    } else {
        println!("{}", meeting.summary);
    }

    println!();
    println!("Action items:");
    if detail.action_items.is_empty() {
        println!("  (none)");
    }
    for item in &detail.action_items {
        println!("  {}", format_stored_item(item));
    }

    println!();
    println!("Notes:");
    println!("{}", meeting.note_text);

    Ok(())
}

/// Search meeting notes and summaries
pub fn search_meetings(settings: &Settings, query: &str) -> Result<()> {
    let repo = Repository::new(settings)?;
    let results = repo.search(query, 20)?;

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} results for: {}", results.len(), query);
    println!();

    for meeting in results {
        println!(
            "== {} ({}) ==",
            meeting.short_id(),
            meeting.created_at.format("%Y-%m-%d")
        );
        if !meeting.summary.is_empty() {
            println!("  {}", meeting.summary);
        }
        println!("  {}", truncate(&meeting.note_text.replace('\n', " "), 100));
    }

    Ok(())
}

/// List action items across meetings
pub fn list_actions(settings: &Settings, include_completed: bool, limit: usize) -> Result<()> {
    let repo = Repository::new(settings)?;
    let items = repo.action_items(include_completed, limit)?;

    if items.is_empty() {
        println!("No action items found");
        return Ok(());
    }

    println!(
        "{:<6} {:<4} {:<8} {:<14} {:<14} {:<10} {}",
        "ID", "Done", "Priority", "Owner", "Deadline", "Meeting", "Task"
    );
    println!("{}", "-".repeat(90));

    for (item, meeting) in items {
        println!(
            "{:<6} {:<4} {:<8} {:<14} {:<14} {:<10} {}",
            item.id,
            if item.completed { "x" } else { "" },
            item.priority.as_str(),
            truncate(item.owner.as_deref().unwrap_or("-"), 14),
            truncate(item.deadline.as_deref().unwrap_or("-"), 14),
            meeting.short_id(),
            item.task
        );
    }

    Ok(())
}

/// Mark an action item as done (or open again)
pub fn mark_action(settings: &Settings, id: i64, undo: bool) -> Result<()> {
    let repo = Repository::new(settings)?;
    let item = repo
        .complete_action(id, !undo)?
        .with_context(|| format!("Action item {} not found", id))?;

    let state = if item.completed { "done" } else { "open" };
    println!("Action item {} marked {}: {}", item.id, state, item.task);

    Ok(())
}

/// Delete a meeting and its action items
pub fn delete_meeting(settings: &Settings, id: &str) -> Result<()> {
    let repo = Repository::new(settings)?;
    let meeting = repo.find_meeting(id)?.context("Meeting not found")?;

    repo.delete(&meeting.id)?;
    println!("Deleted meeting {}", meeting.short_id());

    Ok(())
}

/// Export a meeting to a file
pub fn export_meeting(
    settings: &Settings,
    id: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let repo = Repository::new(settings)?;
    let detail = repo.meeting_detail(id)?.context("Meeting not found")?;

    let content = match format {
        ExportFormat::Txt => export_as_txt(&detail),
        ExportFormat::Json => serde_json::to_string_pretty(&detail)? + "\n",
        ExportFormat::Md => export_as_markdown(&detail),
    };

    if let Some(path) = output {
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported to: {}", path.display());
    } else {
        print!("{}", content);
    }

    Ok(())
}

/// Handle config subcommands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(&redacted(settings))?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Serialize)]
struct DoctorReport {
    provider: String,
    model: String,
    mode: &'static str,
    checks: Vec<DoctorCheck>,
    notes: Vec<String>,
}

/// Run diagnostic checks to help troubleshoot local setup issues.
pub fn run_doctor(settings: &Settings, json: bool) -> Result<()> {
    let report = collect_doctor_report(settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("takeaways doctor");
    println!("provider: {} ({})", report.provider, report.model);
    println!("mode: {}", report.mode);
    println!();

    for check in &report.checks {
        println!("{:<10} {:<8} {}", check.name, check.status, check.detail);
    }

    if !report.notes.is_empty() {
        println!();
        for note in &report.notes {
            println!("{}", note);
        }
    }

    Ok(())
}

fn collect_doctor_report(settings: &Settings) -> DoctorReport {
    let mut checks = Vec::new();
    let mut notes = Vec::new();

    let config_check = match Settings::config_path() {
        Ok(path) if path.exists() => ("ok", path.display().to_string()),
        Ok(path) => ("default", format!("{} (not created)", path.display())),
        Err(e) => ("error", e.to_string()),
    };
    checks.push(DoctorCheck {
        name: "config",
        status: config_check.0,
        detail: config_check.1,
    });

    let (llm_status, llm_detail) = match Extractor::from_settings(settings) {
        Ok(extractor) if extractor.is_configured() => ("ok", "API key present".to_string()),
        Ok(_) => {
            notes.push(
                "hint: set llm.api_key or TAKEAWAYS_LLM_API_KEY to enable extraction.".to_string(),
            );
            ("missing", "no API key; extraction returns empty results".to_string())
        }
        Err(e) => ("error", format!("{:#}", e)),
    };
    checks.push(DoctorCheck {
        name: "llm",
        status: llm_status,
        detail: llm_detail,
    });

    if settings.general.persist {
        let path = settings.database_path();
        let (status, detail) = match Repository::new(settings).and_then(|repo| repo.stats()) {
            Ok(stats) => (
                "ok",
                format!(
                    "{} ({} meetings, {} open actions)",
                    path.display(),
                    stats.total_meetings,
                    stats.open_actions
                ),
            ),
            Err(e) => ("error", format!("{}: {:#}", path.display(), e)),
        };
        checks.push(DoctorCheck {
            name: "database",
            status,
            detail,
        });
    } else {
        checks.push(DoctorCheck {
            name: "database",
            status: "disabled",
            detail: "general.persist = false".to_string(),
        });
    }

    let auth_status = if settings.api_token().is_some() {
        ("ok", "bearer token configured".to_string())
    } else {
        notes.push("warning: no server.api_token; the HTTP API is unauthenticated.".to_string());
        ("open", "no bearer token".to_string())
    };
    checks.push(DoctorCheck {
        name: "auth",
        status: auth_status.0,
        detail: auth_status.1,
    });

    DoctorReport {
        provider: settings.llm.provider.clone(),
        model: resolve_model(settings),
        mode: if settings.general.persist {
            "DATABASE"
        } else {
            "LLM_ONLY"
        },
        checks,
        notes,
    }
}

// Helper functions

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn redacted(settings: &Settings) -> Settings {
    let mut settings = settings.clone();
    for secret in [&mut settings.llm.api_key, &mut settings.server.api_token] {
        if !secret.is_empty() {
            *secret = "********".to_string();
        }
    }
    settings
}

fn print_result(summary: &str, actions: &[ActionItem]) {
    println!("Summary:");
    println!("{}", if summary.is_empty() { "(none)" } else { summary });
    println!();

    if actions.is_empty() {
        println!("No action items");
        return;
    }

    println!("Action items:");
    for (i, action) in actions.iter().enumerate() {
        println!("  {}. {}", i + 1, format_action(action));
    }
}

fn format_action(action: &ActionItem) -> String {
    let mut line = format!("[{}] {}", action.priority.as_str(), action.task);
    if let Some(owner) = &action.owner {
        line.push_str(&format!(" (owner: {})", owner));
    }
    if let Some(deadline) = &action.deadline {
        line.push_str(&format!(" (due: {})", deadline));
    }
    if let Some(confidence) = action.confidence {
        line.push_str(&format!(" ({:.0}%)", confidence * 100.0));
    }
    line
}

fn format_stored_item(item: &StoredActionItem) -> String {
    format!(
        "#{} [{}] {}",
        item.id,
        if item.completed { "x" } else { " " },
        format_action(&item.to_action_item())
    )
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn export_as_txt(detail: &MeetingDetail) -> String {
    let meeting = &detail.meeting;
    let mut output = String::new();
    output.push_str(&format!("Meeting: {}\n", meeting.id));
    output.push_str(&format!(
        "Date: {}\n",
        meeting.created_at.format("%Y-%m-%d %H:%M")
    ));
    output.push_str(&format!("Summary: {}\n", meeting.summary));
    output.push_str("\nAction items:\n");
    for item in &detail.action_items {
        output.push_str(&format!("- {}\n", format_stored_item(item)));
    }
    output.push_str("\n---\n\n");
    output.push_str(&meeting.note_text);
    if !meeting.note_text.ends_with('\n') {
        output.push('\n');
    }
    output
}

fn export_as_markdown(detail: &MeetingDetail) -> String {
    let meeting = &detail.meeting;
    let mut output = String::new();
    output.push_str(&format!(
        "# Meeting {}\n\n",
        meeting.created_at.format("%Y-%m-%d %H:%M")
    ));
    output.push_str("## Summary\n\n");
    output.push_str(if meeting.summary.is_empty() {
        "_No summary._"
    } else {
        meeting.summary.as_str()
    });
    output.push_str("\n\n## Action items\n\n");

    if detail.action_items.is_empty() {
        output.push_str("_None._\n");
    }
    for item in &detail.action_items {
        let mut line = format!(
            "- [{}] **{}** ({})",
            if item.completed { "x" } else { " " },
            item.task,
            item.priority.as_str()
        );
        if let Some(owner) = &item.owner {
            line.push_str(&format!(", owner: {}", owner));
        }
        if let Some(deadline) = &item.deadline {
            line.push_str(&format!(", due: {}", deadline));
        }
        output.push_str(&line);
        output.push('\n');
    }

    output.push_str("\n## Notes\n\n");
    output.push_str(&meeting.note_text);
    if !meeting.note_text.ends_with('\n') {
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Priority;
    use crate::storage::Meeting;
    use chrono::Utc;

    fn detail() -> MeetingDetail {
        let meeting = Meeting::new(
            "Alice will send the deck.".to_string(),
            "Deck review".to_string(),
            "llama-3.1-8b-instant".to_string(),
        );
        let item = StoredActionItem {
            id: 1,
            meeting_id: meeting.id.clone(),
            position: 0,
            task: "Send the deck".to_string(),
            owner: Some("Alice".to_string()),
            deadline: Some("Friday".to_string()),
            priority: Priority::High,
            confidence: Some(0.8),
            completed: false,
            created_at: Utc::now(),
        };
        MeetingDetail {
            meeting,
            action_items: vec![item],
        }
    }

    #[test]
    fn markdown_export_lists_actions() {
        let md = export_as_markdown(&detail());
        assert!(md.contains("## Summary\n\nDeck review"));
        assert!(md.contains("- [ ] **Send the deck** (High), owner: Alice, due: Friday"));
        assert!(md.ends_with("Alice will send the deck.\n"));
    }

    #[test]
    fn txt_export_includes_notes() {
        let txt = export_as_txt(&detail());
        assert!(txt.contains("Summary: Deck review"));
        assert!(txt.contains("[High] Send the deck (owner: Alice) (due: Friday) (80%)"));
    }

    #[test]
    fn redacted_hides_secrets() {
        let mut settings = Settings::default();
        settings.llm.api_key = "sk-secret".to_string();
        let shown = redacted(&settings);
        assert_eq!(shown.llm.api_key, "********");
        assert!(shown.server.api_token.is_empty());
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
