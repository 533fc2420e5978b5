//! MARS CLI
//!
//! Command-line interface for the MARS research service.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mars")]
#[command(about = "MARS - Multi-Agent Research System CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "MARS_SERVER_URL", default_value = "http://localhost:5000")]
    server_url: String,

    /// API token sent with every request
    #[arg(long, env = "MARS_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
        token: cli.token,
    };
    tracing::debug!("Using server {}", config.server_url);

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_research_start() {
        let cli = Cli::try_parse_from([
            "mars",
            "--server-url",
            "http://example:5000",
            "research",
            "start",
            "--topic",
            "Quantum Batteries",
            "--email",
            "a@b.com",
            "--wait",
        ])
        .unwrap();
        assert_eq!(cli.server_url, "http://example:5000");
        assert!(matches!(cli.command, Commands::Research { .. }));
    }

    #[test]
    fn test_run_arguments_are_optional() {
        let cli = Cli::try_parse_from(["mars", "run"]).unwrap();
        match cli.command {
            Commands::Run { topic, email } => {
                assert!(topic.is_none());
                assert!(email.is_none());
            }
            _ => panic!("expected run command"),
        }
    }
}
