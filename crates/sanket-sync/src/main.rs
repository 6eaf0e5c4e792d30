//! CLI entry point for the sanket-sync dashboard engine.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use sanket_core::types::DashboardState;
use sanket_core::SyncConfig;
use sanket_sync::{ApiClient, CycleOutcome, SyncEngine};

#[derive(Parser)]
#[command(name = "sanket-sync")]
#[command(about = "Dashboard sync and alert reconciliation for the Sanket swarm")]
struct Cli {
    /// Run a single poll cycle, print the dashboard as JSON, and exit.
    #[arg(long)]
    once: bool,

    /// Poll continuously until interrupted.
    #[arg(long)]
    daemon: bool,

    /// Run one manual deep analysis and print the outcome as JSON.
    #[arg(long)]
    analyze: bool,

    /// Override the backend base URL.
    #[arg(long)]
    api_base: Option<String>,

    /// Config file prefix (default: sanket).
    #[arg(short, long, default_value = "sanket")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = SyncConfig::load(&cli.config)?;
    if let Some(base) = cli.api_base {
        config.api_base = base;
        config.validate()?;
    }

    let client = ApiClient::new(&config)?;
    tracing::info!(api_base = %client.api_base(), "Backend client ready");
    let engine = SyncEngine::new(client, &config);

    if cli.once {
        match engine.poll_once().await {
            CycleOutcome::Applied { .. } => print_json(&engine.snapshot())?,
            CycleOutcome::Failed { endpoint } => {
                anyhow::bail!("Poll cycle failed fetching {endpoint}")
            }
            other => anyhow::bail!("Poll cycle not applied: {other:?}"),
        }
    } else if cli.analyze {
        let outcome = engine.run_analysis().await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if cli.daemon {
        run_daemon(engine, &config).await?;
    } else {
        anyhow::bail!("Specify --once (single cycle), --analyze (deep analysis) or --daemon (continuous polling)");
    }

    Ok(())
}

async fn run_daemon(engine: SyncEngine<ApiClient>, config: &SyncConfig) -> anyhow::Result<()> {
    let mut updates = engine.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            tracing::info!(
                villages = state.stats.active_villages,
                pending_alerts = state.pending_alert_count(),
                outbreak_probability = state.quantum.outbreak_probability,
                "Dashboard updated"
            );
        }
    });

    let poller = engine.start_polling(config.poll_interval());
    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, stopping poller");

    poller.shutdown().await;
    watcher.abort();
    Ok(())
}

fn print_json(state: &Arc<DashboardState>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(state.as_ref())?);
    Ok(())
}
