//! Local run command
//!
//! Executes a research job in-process with the collaborators selected by the
//! environment, printing each stage as it starts.

use anyhow::{Context, Result, bail};
use colored::*;
use mars_core::domain::job::JobOutcome;
use mars_core::domain::research::{ResearchRequest, StageName};
use mars_runner::{Admission, Config, JobRunner, JobState, ResearchPipeline};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the whole pipeline locally
pub async fn run_locally(topic: Option<String>, email: Option<String>) -> Result<()> {
    println!("{}", "MARS - Multi-Agent Research System".bold());
    println!("{}", "═".repeat(50).dimmed());

    let request = {
        let stdin = std::io::stdin();
        read_request(topic, email, &mut stdin.lock())?
    };

    let config = Config::from_env().context("Failed to load runner configuration")?;
    config.validate().context("Invalid runner configuration")?;

    let pipeline = ResearchPipeline::from_config(&config)?;
    let runner = JobRunner::new(Arc::new(JobState::new()), Arc::new(pipeline));

    println!(
        "Researching {} for {}",
        request.topic.cyan(),
        request.recipient_email.cyan()
    );
    let handle = match runner.submit(request) {
        Admission::Accepted(handle) => handle,
        Admission::Rejected => bail!("a research job is already running"),
    };
    println!();

    let mut last_stage: Option<StageName> = None;
    while runner.state().is_active() {
        if let Some(stage) = runner.state().current_stage() {
            if last_stage != Some(stage) {
                println!(
                    "  {} [{}/{}] {}",
                    "▸".cyan(),
                    stage.position(),
                    StageName::ALL.len(),
                    stage.status_message()
                );
                last_stage = Some(stage);
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let outcome = handle.wait().await;
    println!();

    match outcome {
        JobOutcome::Succeeded => {
            println!("{} {}", "✓".green(), runner.state().status_message().green());
            if let Some(result) = runner.result() {
                for report in result.reports() {
                    println!(
                        "    {} {}",
                        report.report_type.title(),
                        report.path.display().to_string().dimmed()
                    );
                }
            }
            Ok(())
        }
        JobOutcome::Failed { .. } => {
            bail!("{}", runner.state().status_message())
        }
    }
}

/// Collects and validates the request before any collaborator is built
fn read_request<R: BufRead>(
    topic: Option<String>,
    email: Option<String>,
    input: &mut R,
) -> Result<ResearchRequest> {
    let topic = argument_or_prompt(topic, "Research topic", input)?;
    let email = argument_or_prompt(email, "Recipient email", input)?;
    Ok(ResearchRequest::validated(&topic, &email)?)
}

/// Use the argument if given, otherwise ask on the terminal
fn argument_or_prompt<R: BufRead>(
    value: Option<String>,
    label: &str,
    input: &mut R,
) -> Result<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value.trim().to_string());
    }

    print!("{}: ", label.bold());
    std::io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        bail!("{} is required", label);
    }
    Ok(line.to_string())
}
