//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// takeaways - Turn meeting notes into action items with an LLM
#[derive(Parser, Debug)]
#[command(name = "takeaways")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract action items and a summary from meeting notes
    Extract {
        /// File with the meeting notes (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Caller note identifier to attach
        #[arg(long)]
        note_id: Option<String>,

        /// Caller user identifier to attach
        #[arg(long)]
        user_id: Option<String>,

        /// Do not store the result
        #[arg(long)]
        no_save: bool,

        /// Print the JSON response envelope
        #[arg(long)]
        json: bool,
    },

    /// Run the recovery parser over saved model output
    Parse {
        /// File with raw model output (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the prompt that would be sent for some notes
    Prompt {
        /// File with the meeting notes (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// List processed meetings
    List {
        /// Maximum number of meetings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Only meetings for this user
        #[arg(short, long)]
        user: Option<String>,

        /// Search term to filter meetings
        #[arg(short, long)]
        search: Option<String>,
    },

    /// View a meeting with its action items
    View {
        /// Meeting ID or partial ID
        id: String,
    },

    /// Search through meeting notes and summaries
    Search {
        /// Search query (supports full-text search)
        query: String,
    },

    /// List action items across meetings
    Actions {
        /// Include completed items
        #[arg(short, long)]
        all: bool,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Mark an action item as done
    Done {
        /// Action item ID
        id: i64,

        /// Mark the item as open again
        #[arg(long)]
        undo: bool,
    },

    /// Delete a meeting and its action items
    Delete {
        /// Meeting ID or partial ID
        id: String,
    },

    /// Export a meeting to a file
    Export {
        /// Meeting ID or partial ID
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Txt)]
        format: ExportFormat,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration and storage
    Doctor {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Txt,
    Json,
    Md,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_flags_parse() {
        let cli = Cli::try_parse_from([
            "takeaways",
            "extract",
            "notes.txt",
            "--note-id",
            "n1",
            "--no-save",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                file,
                note_id,
                no_save,
                json,
                ..
            } => {
                assert_eq!(file, Some(PathBuf::from("notes.txt")));
                assert_eq!(note_id.as_deref(), Some("n1"));
                assert!(no_save);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn export_format_defaults_to_txt() {
        let cli = Cli::try_parse_from(["takeaways", "export", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::Txt,
                ..
            }
        ));
    }
}
