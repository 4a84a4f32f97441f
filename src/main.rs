use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use itinerai::sources::http_client;
use itinerai::{Adapters, ItineraryRequest, Orchestrator, PlannerConfig, PlannerError, logging};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "itinerai")]
#[command(version, about = "AI assisted multi-city travel planning")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a trip
    Plan {
        /// Trip file: JSON (`.json`) or the `City1: Paris 2026-02-16` text format
        #[arg(short, long)]
        request: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn read_request(path: &Path) -> Result<ItineraryRequest> {
    let text = std::fs::read_to_string(path)
        .map_err(PlannerError::from)
        .with_context(|| format!("Failed to read trip file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let request = if is_json {
        ItineraryRequest::from_json(&text)?
    } else {
        text.parse::<ItineraryRequest>()?
    };
    Ok(request)
}

async fn plan(config: &PlannerConfig, request_path: &Path, format: OutputFormat) -> Result<()> {
    let request = read_request(request_path)?;
    let policy = config.call_policy();

    let client = http_client(policy.call_timeout)?;
    let adapters = Adapters::google(client, &config.google_credentials()?, &config.groq_settings()?);
    let orchestrator = Orchestrator::new(adapters, policy);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    info!(cities = request.cities.len(), "Trip loaded from {}", request_path.display());
    let itinerary = orchestrator
        .plan(&request, &cancel)
        .await
        .map_err(PlannerError::from)?;

    match format {
        OutputFormat::Text => println!("{itinerary}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&itinerary).context("Failed to serialize itinerary")?
        ),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = PlannerConfig::load_from_path(cli.config)?;
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Plan { request, format } => plan(&config, &request, format).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = err
                .downcast_ref::<PlannerError>()
                .map_or_else(|| format!("{err:#}"), PlannerError::user_message);
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}
