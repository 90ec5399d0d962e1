use alloy_primitives::B256;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insured_bridge_relayer::chains::{PreparedCall, RecordingSubmitter, StaticGasEstimator};
use insured_bridge_relayer::{
    CrossDomainFinalizer, InMemoryLedger, LedgerSnapshot, Relayer, RelayerConfig, RelayerMetrics, RelayerService,
    RelayerSettings, SweepReport,
};

#[derive(Parser)]
#[command(name = "relayer")]
#[command(about = "Insured bridge relayer: relays deposits, disputes invalid relays and settles finished ones")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/relayer.toml")]
    pub config: PathBuf,

    /// Log level, overrides the configured one
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every sweep once against a ledger snapshot and print the reports
    Simulate {
        /// JSON ledger snapshot
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Run the sweeps periodically against a ledger snapshot until Ctrl-C
    Start {
        /// JSON ledger snapshot
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Finalize relayable L2 -> L1 canonical bridge messages from a ledger snapshot
    Finalize {
        /// JSON ledger snapshot
        #[arg(long)]
        snapshot: PathBuf,
        /// L2 transaction hash to finalize, repeatable. Defaults to every message in the snapshot.
        #[arg(long = "message")]
        messages: Vec<B256>,
    },
    /// Validate the configuration and print a summary
    CheckConfig,
}

#[derive(Serialize)]
struct SimulationOutput<'a> {
    reports: &'a [SweepReport],
    submitted: Vec<PreparedCall>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = RelayerConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.global.log_level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("insured_bridge_relayer={0},relayer={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration from: {}", cli.config.display());
    config.validate()?;

    match cli.command {
        Commands::Simulate { snapshot } => simulate(&config, &snapshot).await?,
        Commands::Start { snapshot } => start_relayer(&config, &snapshot).await?,
        Commands::Finalize { snapshot, messages } => finalize(&config, &snapshot, messages).await?,
        Commands::CheckConfig => show_config(&config)?,
    }

    Ok(())
}

async fn load_ledger(config: &RelayerConfig, snapshot_path: &Path) -> anyhow::Result<Arc<InMemoryLedger>> {
    let content = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("failed to read snapshot {}", snapshot_path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&content)?;
    if snapshot.origin_chain_id != config.relayer.origin_chain_id {
        anyhow::bail!(
            "snapshot origin chain {} does not match configured origin chain {}",
            snapshot.origin_chain_id,
            config.relayer.origin_chain_id
        );
    }

    Ok(Arc::new(InMemoryLedger::from_snapshot(snapshot).await))
}

async fn build_relayer(
    config: &RelayerConfig,
    snapshot_path: &Path,
) -> anyhow::Result<(Relayer, Arc<RecordingSubmitter>)> {
    let ledger = load_ledger(config, snapshot_path).await?;
    let submitter = Arc::new(RecordingSubmitter::new());
    let gas_estimator = Arc::new(StaticGasEstimator::new(config.relayer.gas_price.into()));
    let metrics = Arc::new(RelayerMetrics::new()?);

    let relayer = Relayer::new(
        ledger.clone(),
        ledger,
        submitter.clone(),
        gas_estimator,
        RelayerSettings::from(config),
        metrics,
    );
    Ok((relayer, submitter))
}

async fn simulate(config: &RelayerConfig, snapshot_path: &Path) -> anyhow::Result<()> {
    let (relayer, submitter) = build_relayer(config, snapshot_path).await?;

    let reports = relayer.run_sweeps().await?;
    let output = SimulationOutput { reports: &reports, submitted: submitter.submitted().await };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if config.metrics.enabled {
        println!("{}", relayer.metrics().gather_text()?);
    }
    Ok(())
}

async fn finalize(config: &RelayerConfig, snapshot_path: &Path, messages: Vec<B256>) -> anyhow::Result<()> {
    let ledger = load_ledger(config, snapshot_path).await?;
    let messages = if messages.is_empty() { ledger.bridge_messages().await } else { messages };
    info!(count = messages.len(), "Finalizing canonical bridge messages");

    let submitter = Arc::new(RecordingSubmitter::new());
    let finalizer = CrossDomainFinalizer::new(
        ledger,
        submitter.clone(),
        Arc::new(StaticGasEstimator::new(config.relayer.gas_price.into())),
        config.relayer.account,
        Arc::new(RelayerMetrics::new()?),
    );

    let report = finalizer.finalize(&messages).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&submitter.submitted().await)?);
    Ok(())
}

async fn start_relayer(config: &RelayerConfig, snapshot_path: &Path) -> anyhow::Result<()> {
    let (relayer, _submitter) = build_relayer(config, snapshot_path).await?;
    let (mut service, shutdown) = RelayerService::new(Arc::new(relayer), config.sweep_interval()?);

    let handle = tokio::spawn(async move { service.run().await });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down relayer...");
    // The service may already have stopped on a fatal error
    let _ = shutdown.send(true);

    let ticks = handle.await??;
    info!(ticks, "Relayer stopped");
    Ok(())
}

fn show_config(config: &RelayerConfig) -> anyhow::Result<()> {
    let relayer = &config.relayer;
    println!("Configuration is valid");
    println!("  account:               {}", relayer.account);
    println!("  origin chain:          {}", relayer.origin_chain_id);
    println!("  whitelisted chain IDs: {:?}", relayer.whitelisted_chain_ids);
    println!("  L2 lookback window:    {} blocks", relayer.l2_lookback_window);
    println!("  sweep interval:        {}", humantime::format_duration(config.sweep_interval()?));
    for deployment in &relayer.deployments {
        println!(
            "  {} deployed at {} (origin block {})",
            deployment.l1_token, deployment.timestamp, deployment.block_number
        );
    }
    Ok(())
}
