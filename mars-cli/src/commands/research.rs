//! Research command handlers
//!
//! Start jobs on the server and follow their progress.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use mars_core::domain::job::JobOutcome;
use mars_core::dto::research::StatusResponse;
use std::time::Duration;

use crate::config::Config;

/// Research subcommands
#[derive(Subcommand)]
pub enum ResearchCommands {
    /// Start a research job
    Start {
        /// Research topic
        #[arg(long)]
        topic: String,

        /// Recipient of the report email
        #[arg(long)]
        email: String,

        /// Follow progress until the job finishes
        #[arg(short, long)]
        wait: bool,
    },
    /// Show the current job status
    Status {
        /// Print the raw JSON snapshot
        #[arg(long)]
        json: bool,
    },
    /// Follow the running job until it finishes
    Wait {
        /// Seconds between status polls
        #[arg(short, long, default_value_t = 2)]
        interval: u64,
    },
}

/// Handle research commands
pub async fn handle_research_command(command: ResearchCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ResearchCommands::Start { topic, email, wait } => {
            let response = client.start_research(&topic, &email).await?;
            println!("{} {}", "✓".green(), response.message);
            if wait {
                follow(&client, Duration::from_secs(2)).await?;
            }
            Ok(())
        }
        ResearchCommands::Status { json } => {
            let status = client.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
            Ok(())
        }
        ResearchCommands::Wait { interval } => {
            follow(&client, Duration::from_secs(interval.max(1))).await
        }
    }
}

/// Print every status change until the job is idle
async fn follow(client: &mars_client::MarsClient, interval: Duration) -> Result<()> {
    let mut last = String::new();
    let status = client
        .wait_until_idle(interval, None, |status| {
            if status.status != last {
                println!("  {} {}", "▸".cyan(), status.status);
                last = status.status.clone();
            }
        })
        .await?;

    println!();
    print_outcome(&status);
    Ok(())
}

fn print_status(status: &StatusResponse) {
    println!("{}", "Research Status:".bold());
    println!(
        "  Running:  {}",
        if status.is_running {
            "yes".green()
        } else {
            "no".dimmed()
        }
    );
    println!("  Status:   {}", status.status);
    if let Some(job_id) = status.job_id {
        println!("  Job:      {}", job_id.to_string().dimmed());
    }
    if let Some(stage) = status.current_stage {
        println!(
            "  Stage:    {} ({}/10)",
            stage.title().cyan(),
            stage.position()
        );
    }
    if let Some(started) = status.started_at {
        println!("  Started:  {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(finished) = status.finished_at {
        println!("  Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
        if let Some(started) = status.started_at {
            let seconds = finished.signed_duration_since(started).num_seconds();
            println!("  Duration: {}s", seconds);
        }
    }
    if let Some(outcome) = &status.last_outcome {
        println!();
        print_outcome_line(outcome);
    }
}

fn print_outcome(status: &StatusResponse) {
    match &status.last_outcome {
        Some(outcome) => print_outcome_line(outcome),
        None => println!("{}", status.status),
    }
}

fn print_outcome_line(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Succeeded => println!("{} {}", "✓".green(), "Last job succeeded".green()),
        JobOutcome::Failed {
            stage,
            kind,
            message,
        } => {
            let stage = stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "{} {} ({} failure in {}): {}",
                "✗".red(),
                "Last job failed".red(),
                kind,
                stage,
                message
            );
        }
    }
}
