//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod report;
mod research;
mod run;

pub use report::ReportCommands;
pub use research::ResearchCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Research jobs on the server
    Research {
        #[command(subcommand)]
        command: ResearchCommands,
    },
    /// PDF reports of the last successful job
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Run a research job locally, without a server
    Run {
        /// Research topic (prompted for when omitted)
        #[arg(long)]
        topic: Option<String>,

        /// Recipient email address (prompted for when omitted)
        #[arg(long)]
        email: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Research { command } => research::handle_research_command(command, config).await,
        Commands::Report { command } => report::handle_report_command(command, config).await,
        Commands::Run { topic, email } => run::run_locally(topic, email).await,
    }
}
