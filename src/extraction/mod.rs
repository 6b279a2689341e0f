//! Extraction module for takeaways
//!
//! Recovers structured action items and a summary from whatever text the
//! model returned, and drives the transcript-to-result pipeline.

mod models;
pub mod normalize;
mod pipeline;
pub mod recovery;

pub use models::{ActionItem, ExtractionResult, Priority, RecoveryFailure};
pub use pipeline::{Extraction, Extractor, LlmFailure};
pub use recovery::{parse_actions_and_summary, recover_payload, select_candidate, CandidateSource};
