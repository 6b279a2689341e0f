//! takeaways - Meeting notes to action items
//!
//! Entry point for the takeaways CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use takeaways::cli::commands;
use takeaways::cli::{Cli, Commands};
use takeaways::config::Settings;
use takeaways::storage::MeetingContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Completions { shell } => {
            takeaways::cli::completions::print(shell);
        }
        Commands::Parse { file, json } => {
            commands::parse_output(file, json)?;
        }
        Commands::Prompt { file } => {
            commands::show_prompt(file)?;
        }
        command => {
            // Load configuration only for runtime commands.
            let settings = Settings::load()?;

            match command {
                Commands::Extract {
                    file,
                    note_id,
                    user_id,
                    no_save,
                    json,
                } => {
                    let context = MeetingContext {
                        external_id: note_id,
                        user_id,
                    };
                    commands::extract_notes(&settings, file, context, !no_save, json).await?;
                }
                Commands::Serve { bind } => {
                    takeaways::server::run(&settings, bind).await?;
                }
                Commands::List {
                    limit,
                    user,
                    search,
                } => {
                    commands::list_meetings(&settings, limit, user, search)?;
                }
                Commands::View { id } => {
                    commands::view_meeting(&settings, &id)?;
                }
                Commands::Search { query } => {
                    commands::search_meetings(&settings, &query)?;
                }
                Commands::Actions { all, limit } => {
                    commands::list_actions(&settings, all, limit)?;
                }
                Commands::Done { id, undo } => {
                    commands::mark_action(&settings, id, undo)?;
                }
                Commands::Delete { id } => {
                    commands::delete_meeting(&settings, &id)?;
                }
                Commands::Export { id, format, output } => {
                    commands::export_meeting(&settings, &id, format, output)?;
                }
                Commands::Doctor { json } => {
                    commands::run_doctor(&settings, json)?;
                }
                Commands::Config(config_cmd) => {
                    commands::config_command(&settings, config_cmd)?;
                }
                Commands::Completions { .. } | Commands::Parse { .. } | Commands::Prompt { .. } => {
                    unreachable!()
                }
            }
        }
    }

    Ok(())
}
