//! Report command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mars_core::domain::report::ReportType;
use mars_runner::service::report_file_name;
use std::path::PathBuf;

use crate::config::Config;

/// Report subcommands
#[derive(Subcommand)]
pub enum ReportCommands {
    /// Download a PDF report
    Download {
        /// Report type: comprehensive, executive, market or technical
        report_type: String,

        /// Output file (defaults to the server-suggested name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle report commands
pub async fn handle_report_command(command: ReportCommands, config: &Config) -> Result<()> {
    match command {
        ReportCommands::Download {
            report_type,
            output,
        } => {
            let report_type: ReportType = report_type
                .parse()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            let report = config.client().download_report(report_type).await?;

            let path = output.unwrap_or_else(|| {
                PathBuf::from(
                    report
                        .file_name
                        .clone()
                        .unwrap_or_else(|| report_file_name(report_type, "research")),
                )
            });
            tokio::fs::write(&path, &report.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!(
                "{} Saved {} ({} bytes) to {}",
                "✓".green(),
                report_type.title(),
                report.bytes.len(),
                path.display().to_string().cyan()
            );
            Ok(())
        }
    }
}
