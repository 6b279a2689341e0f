//! takeaways - Turn transcribed meeting notes into structured action items
//!
//! The model is asked for strict JSON, but whatever it returns is recovered
//! into a stable schema of action items plus a summary.

pub mod cli;
pub mod config;
pub mod extraction;
pub mod llm;
pub mod server;
pub mod storage;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "takeaways";
