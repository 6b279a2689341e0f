//! Mapping of loosely shaped model JSON onto the fixed action item schema

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::extraction::models::{ActionItem, Priority};

/// Keys tried, in order, for each action item field.
pub const TASK_ALIASES: &[&str] = &["task", "action"];
pub const OWNER_ALIASES: &[&str] = &["owner", "assignee"];
pub const DEADLINE_ALIASES: &[&str] = &["deadline", "due"];
pub const PRIORITY_ALIASES: &[&str] = &["priority"];

/// Why a `confidence` value could not be read as a number
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfidenceError {
    #[error("confidence is not numeric: {0}")]
    NotNumeric(String),

    #[error("confidence is not a finite number")]
    NotFinite,
}

/// Render a JSON value as text, if it carries any.
///
/// Strings are taken as-is when non-empty and numbers use their JSON form.
/// Everything else (null, booleans, arrays, objects) has no text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolve the first alias that is present with a non-empty text value.
pub fn resolve_text(entry: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| entry.get(*key))
        .find_map(as_text)
}

/// Coerce a `confidence` value into `[0.0, 1.0]`.
///
/// Accepts JSON numbers and numeric strings. Finite values outside the range
/// are clamped.
pub fn coerce_confidence(value: &Value) -> Result<f64, ConfidenceError> {
    let raw = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ConfidenceError::NotNumeric(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfidenceError::NotNumeric(s.clone()))?,
        other => return Err(ConfidenceError::NotNumeric(other.to_string())),
    };

    if !raw.is_finite() {
        return Err(ConfidenceError::NotFinite);
    }

    Ok(raw.clamp(0.0, 1.0))
}

/// Build a normalized action item from one raw entry.
pub fn normalize_action(entry: &Map<String, Value>) -> ActionItem {
    let confidence = match entry.get("confidence") {
        None | Some(Value::Null) => None,
        Some(value) => match coerce_confidence(value) {
            Ok(confidence) => Some(confidence),
            Err(e) => {
                debug!("Dropping confidence: {}", e);
                None
            }
        },
    };

    ActionItem {
        task: resolve_text(entry, TASK_ALIASES).unwrap_or_default(),
        owner: resolve_text(entry, OWNER_ALIASES),
        deadline: resolve_text(entry, DEADLINE_ALIASES),
        priority: resolve_text(entry, PRIORITY_ALIASES)
            .and_then(|p| Priority::parse(&p))
            .unwrap_or_default(),
        confidence,
    }
}

/// Normalize a decoded payload object into `(actions, summary)`.
pub fn normalize_payload(payload: &Map<String, Value>) -> (Vec<ActionItem>, String) {
    let summary = payload
        .get("summary")
        .and_then(as_text)
        .unwrap_or_default();

    let actions = match payload.get("actions") {
        Some(Value::Array(entries)) => {
            let actions: Vec<ActionItem> = entries
                .iter()
                .filter_map(Value::as_object)
                .map(normalize_action)
                .collect();

            let dropped = entries.len() - actions.len();
            if dropped > 0 {
                debug!("Dropped {} malformed action entries", dropped);
            }
            actions
        }
        _ => Vec::new(),
    };

    (actions, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn resolve_text_prefers_first_alias() {
        let entry = object(json!({"task": "Write docs", "action": "Ignored"}));
        assert_eq!(
            resolve_text(&entry, TASK_ALIASES),
            Some("Write docs".to_string())
        );
    }

    #[test]
    fn resolve_text_falls_through_empty_and_null() {
        let entry = object(json!({"owner": "", "assignee": "Priya"}));
        assert_eq!(
            resolve_text(&entry, OWNER_ALIASES),
            Some("Priya".to_string())
        );

        let entry = object(json!({"deadline": null, "due": "Friday"}));
        assert_eq!(
            resolve_text(&entry, DEADLINE_ALIASES),
            Some("Friday".to_string())
        );

        let entry = object(json!({"owner": null}));
        assert_eq!(resolve_text(&entry, OWNER_ALIASES), None);
    }

    #[test]
    fn resolve_text_skips_structured_values() {
        let entry = object(json!({"task": ["a", "b"], "action": "Plan sprint"}));
        assert_eq!(
            resolve_text(&entry, TASK_ALIASES),
            Some("Plan sprint".to_string())
        );
    }

    #[test]
    fn confidence_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_confidence(&json!(0.75)), Ok(0.75));
        assert_eq!(coerce_confidence(&json!(1)), Ok(1.0));
        assert_eq!(coerce_confidence(&json!(" 0.4 ")), Ok(0.4));
    }

    #[test]
    fn confidence_is_clamped_to_unit_range() {
        assert_eq!(coerce_confidence(&json!(85)), Ok(1.0));
        assert_eq!(coerce_confidence(&json!(-0.2)), Ok(0.0));
    }

    #[test]
    fn confidence_rejects_non_numeric_values() {
        assert!(matches!(
            coerce_confidence(&json!("high")),
            Err(ConfidenceError::NotNumeric(_))
        ));
        assert!(matches!(
            coerce_confidence(&json!(true)),
            Err(ConfidenceError::NotNumeric(_))
        ));
        assert_eq!(coerce_confidence(&json!("NaN")), Err(ConfidenceError::NotFinite));
        assert_eq!(coerce_confidence(&json!("inf")), Err(ConfidenceError::NotFinite));
    }

    #[test]
    fn non_numeric_confidence_becomes_null() {
        let item = normalize_action(&object(json!({
            "task": "Book venue",
            "confidence": "very sure"
        })));
        assert_eq!(item.task, "Book venue");
        assert_eq!(item.confidence, None);
    }

    #[test]
    fn priority_defaults_when_missing_empty_or_unknown() {
        let missing = normalize_action(&object(json!({"task": "a"})));
        let empty = normalize_action(&object(json!({"task": "a", "priority": ""})));
        let unknown = normalize_action(&object(json!({"task": "a", "priority": "ASAP"})));
        let high = normalize_action(&object(json!({"task": "a", "priority": "high"})));

        assert_eq!(missing.priority, Priority::Medium);
        assert_eq!(empty.priority, Priority::Medium);
        assert_eq!(unknown.priority, Priority::Medium);
        assert_eq!(high.priority, Priority::High);
    }

    #[test]
    fn payload_with_non_array_actions_yields_no_actions() {
        let (actions, summary) =
            normalize_payload(&object(json!({"actions": {"task": "x"}, "summary": "s"})));
        assert!(actions.is_empty());
        assert_eq!(summary, "s");
    }

    #[test]
    fn non_text_summary_becomes_empty() {
        let (_, summary) = normalize_payload(&object(json!({"summary": ["a"]})));
        assert_eq!(summary, "");

        let (_, summary) = normalize_payload(&object(json!({"summary": null})));
        assert_eq!(summary, "");
    }
}
