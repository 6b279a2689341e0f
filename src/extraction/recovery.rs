//! Recovery of a JSON payload from raw model output
//!
//! Models are asked for bare JSON but routinely wrap it in prose or markdown
//! fences. Candidate selection tries, in order: the whole text, the widest
//! `{...}` span, the widest `[...]` span, and finally the text unchanged.

use serde_json::{Map, Value};
use tracing::debug;

use crate::extraction::models::{ExtractionResult, RecoveryFailure};
use crate::extraction::normalize::normalize_payload;

/// Where a candidate payload was found in the raw output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// The whole text decoded as JSON
    Direct,
    /// Widest `{...}` span
    ObjectSpan,
    /// Widest `[...]` span
    ArraySpan,
    /// Nothing better found, text used unchanged
    Verbatim,
}

/// Substring most likely to hold the JSON payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub text: &'a str,
    pub source: CandidateSource,
}

/// Span from the first `open` to the last `close` after it.
fn outermost_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Pick the candidate payload from raw model output.
pub fn select_candidate(raw: &str) -> Candidate<'_> {
    if serde_json::from_str::<Value>(raw).is_ok() {
        return Candidate {
            text: raw,
            source: CandidateSource::Direct,
        };
    }

    if let Some(span) = outermost_span(raw, '{', '}') {
        return Candidate {
            text: span,
            source: CandidateSource::ObjectSpan,
        };
    }

    if let Some(span) = outermost_span(raw, '[', ']') {
        return Candidate {
            text: span,
            source: CandidateSource::ArraySpan,
        };
    }

    Candidate {
        text: raw,
        source: CandidateSource::Verbatim,
    }
}

/// Decode raw model output into the payload object.
pub fn recover_payload(raw: &str) -> Result<Map<String, Value>, RecoveryFailure> {
    let candidate = select_candidate(raw);
    debug!(
        "Payload candidate from {:?} ({} of {} bytes)",
        candidate.source,
        candidate.text.len(),
        raw.len()
    );

    match serde_json::from_str::<Value>(candidate.text) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(RecoveryFailure::UnexpectedTopLevel),
        Err(e) => Err(RecoveryFailure::JsonParse(e.to_string())),
    }
}

/// Parse raw model output into normalized actions and a summary.
///
/// Never fails: recovery problems are reported through
/// [`ExtractionResult::error`] with empty actions and summary.
pub fn parse_actions_and_summary(raw: &str) -> ExtractionResult {
    match recover_payload(raw) {
        Ok(payload) => {
            let (actions, summary) = normalize_payload(&payload);
            ExtractionResult {
                actions,
                summary,
                error: None,
            }
        }
        Err(e) => {
            debug!("Recovery failed: {}", e);
            ExtractionResult::failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_json_is_used_as_is() {
        let raw = r#"  {"actions": [], "summary": "x"}  "#;
        let candidate = select_candidate(raw);
        assert_eq!(candidate.source, CandidateSource::Direct);
        assert_eq!(candidate.text, raw);
    }

    #[test]
    fn object_span_is_widest_match() {
        let raw = "Sure! {\"a\": {\"b\": 1}} and {\"c\": 2} done";
        let candidate = select_candidate(raw);
        assert_eq!(candidate.source, CandidateSource::ObjectSpan);
        assert_eq!(candidate.text, "{\"a\": {\"b\": 1}} and {\"c\": 2}");
    }

    #[test]
    fn object_span_preferred_over_array_span() {
        let raw = "list [1, 2] then {\"summary\": \"s\"}";
        let candidate = select_candidate(raw);
        assert_eq!(candidate.source, CandidateSource::ObjectSpan);
        assert_eq!(candidate.text, "{\"summary\": \"s\"}");
    }

    #[test]
    fn array_span_used_when_no_object_span() {
        let raw = "values: [1, 2, 3] end";
        let candidate = select_candidate(raw);
        assert_eq!(candidate.source, CandidateSource::ArraySpan);
        assert_eq!(candidate.text, "[1, 2, 3]");
    }

    #[test]
    fn closing_brace_before_opening_is_not_a_span() {
        let raw = "} nothing here {";
        let candidate = select_candidate(raw);
        assert_eq!(candidate.source, CandidateSource::Verbatim);
        assert_eq!(candidate.text, raw);
    }

    #[test]
    fn markdown_fenced_reply_is_recovered() {
        let raw = "```json\n{\"actions\": [{\"task\": \"Email client\"}], \"summary\": \"One task\"}\n```";
        let result = parse_actions_and_summary(raw);
        assert_eq!(result.error, None);
        assert_eq!(result.summary, "One task");
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].task, "Email client");
    }

    #[test]
    fn array_span_reports_unexpected_top_level() {
        let result = parse_actions_and_summary("Here you go: [{\"task\": \"x\"}]");
        assert_eq!(result.error, Some(RecoveryFailure::UnexpectedTopLevel));
        assert!(result.actions.is_empty());
    }

    #[test]
    fn broken_object_span_reports_decoder_message() {
        let result = parse_actions_and_summary("prefix {\"actions\": [} suffix");
        assert!(result.actions.is_empty());
        assert_eq!(result.summary, "");
        assert!(result.error_tag().starts_with("json_parse_error: "));
    }

    #[test]
    fn scalar_json_is_unexpected_top_level() {
        let result = parse_actions_and_summary("42");
        assert_eq!(result.error_tag(), "unexpected_top_level");
    }
}
