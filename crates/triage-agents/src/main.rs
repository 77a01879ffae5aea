use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracker::LinearClient;
use triage_agents::{transcript, AssistantsEngine, Orchestrator, TriageConfig};

/// Triage a support transcript into Linear.
#[derive(Debug, Parser)]
#[command(name = "triage-agents", version, about)]
struct Cli {
    /// Transcript file to process (`-` reads stdin). Defaults to a built-in sample call.
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// TOML file overriding non-secret settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = TriageConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(
        model = %config.settings.model,
        linear = %config.settings.linear_url,
        comparison_field = ?config.settings.comparison_field,
        "Triage starting"
    );

    let transcript =
        transcript::load(cli.transcript.as_deref()).context("Failed to read transcript")?;

    let tracker = LinearClient::connect(config.tracker_config())
        .await
        .context("Failed to resolve Linear team")?;
    let engine =
        AssistantsEngine::new(config.engine_config()).context("Failed to build engine client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(engine),
        Arc::new(tracker),
        config.settings.comparison_field,
    );
    let outcome = orchestrator.process(&transcript).await;
    println!("{}", outcome.status_line());

    Ok(())
}
