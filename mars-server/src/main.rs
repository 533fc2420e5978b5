use anyhow::Context;
use mars_runner::{JobRunner, JobState, ResearchPipeline};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;
pub mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mars_server=debug,mars_runner=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MARS research server...");

    let config = config::Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Reports: {}, outbox: {}, stage timeout: {:?}",
        config.runner.output_dir.display(),
        config.runner.outbox_dir.display(),
        config.runner.stage_timeout
    );

    let pipeline = ResearchPipeline::from_config(&config.runner)?;
    let runner = JobRunner::new(Arc::new(JobState::new()), Arc::new(pipeline));
    let state = Arc::new(state::AppState::new(runner));

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
