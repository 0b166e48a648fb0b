//! Vault Sentinel CLI
//!
//! Command-line interface for running the monitoring service.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vault_sentinel::{Config, Result};

#[derive(Parser)]
#[command(name = "vault-sentinel")]
#[command(about = "Automated monitoring and risk management for a yield-bearing vault")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler with all three monitoring jobs
    Monitor {
        /// Also run one full cycle immediately on startup
        #[arg(long)]
        run_on_start: bool,
    },

    /// Run a single comprehensive monitoring cycle and exit
    Cycle,

    /// Run a single quick price check and exit
    Check,

    /// Build an unsigned user transaction (printed as JSON, never submitted)
    BuildTx {
        /// Transaction kind (approve, deposit, withdraw)
        #[arg(short, long)]
        kind: String,

        /// Amount in human-readable units (asset amount, or shares for withdraw)
        #[arg(short, long)]
        amount: String,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config
    let config = if let Some(config_path) = cli.config {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| vault_sentinel::Error::Config(e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| vault_sentinel::Error::Config(e.to_string()))?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Monitor { run_on_start } => {
            run_monitor(config, run_on_start).await?;
        }
        Commands::Cycle => {
            let service = build_service(config)?;
            let report = service.run_full_cycle().await?;
            println!("{}", report.to_text());
        }
        Commands::Check => {
            let service = build_service(config)?;
            let report = service.run_quick_check().await?;
            println!("{}", report.to_text());
        }
        Commands::BuildTx { kind, amount } => {
            run_build_tx(config, kind, amount)?;
        }
        Commands::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config)
                    .map_err(vault_sentinel::Error::Json)?
            );
        }
    }

    Ok(())
}

/// Wire the chain client, decision strategy, and report sink into a service.
fn build_service(config: Config) -> Result<Arc<vault_sentinel::MonitoringService>> {
    use vault_sentinel::report::LogReportSink;
    use vault_sentinel::strategy::RuleTableStrategy;
    use vault_sentinel::wallet::OperatorWallet;
    use vault_sentinel::{ChainClient, RpcConfig, OPERATOR_KEY_ENV};

    let rpc = RpcConfig::from_env(config.contracts.chain_id);

    // Try to load the operator wallet; fall back to read-only monitoring.
    let chain = match OperatorWallet::from_env(OPERATOR_KEY_ENV) {
        Ok(wallet) => {
            tracing::info!(address = %wallet.address_string(), "Loaded operator wallet");
            ChainClient::connect_with_operator(&config.contracts, &rpc, &wallet)?
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "No operator wallet - running read-only (corrective writes disabled)"
            );
            ChainClient::connect(&config.contracts, &rpc)?
        }
    };

    let strategy = Arc::new(RuleTableStrategy::new(
        config.risk.clone(),
        config.contracts.aave_strategy.clone(),
    ));

    let service = vault_sentinel::MonitoringService::new(
        config,
        Arc::new(chain),
        strategy,
        Arc::new(LogReportSink),
    );
    Ok(Arc::new(service))
}

async fn run_monitor(config: Config, run_on_start: bool) -> Result<()> {
    tracing::info!(
        full_cycle = %config.schedule.full_cycle,
        quick_check = %config.schedule.quick_check,
        yield_generation = %config.schedule.yield_generation,
        "Starting monitoring service"
    );

    let service = build_service(config)?;
    let scheduler = service.build_scheduler()?;
    scheduler.start();

    if run_on_start {
        // Comprehensive check on startup; a failure here is already
        // reported and must not stop the scheduler.
        if let Err(e) = service.run_full_cycle().await {
            tracing::error!(error = %e, "startup cycle failed");
        }
    }

    tracing::info!("Monitoring scheduler running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| vault_sentinel::Error::Config(format!("signal handler failed: {}", e)))?;

    tracing::info!("Shutting down monitoring system");
    scheduler.stop();

    Ok(())
}

fn run_build_tx(config: Config, kind: String, amount: String) -> Result<()> {
    use vault_sentinel::chain::parse_units;
    use vault_sentinel::{ChainClient, RpcConfig};

    let rpc = RpcConfig::from_env(config.contracts.chain_id);
    let chain = ChainClient::connect(&config.contracts, &rpc)?;
    let parsed = parse_units(&amount)?;

    let tx = match kind.to_lowercase().as_str() {
        "approve" => chain.build_approve_transaction(parsed),
        "deposit" => chain.build_deposit_transaction(parsed),
        "withdraw" => chain.build_withdraw_transaction(parsed),
        other => {
            return Err(vault_sentinel::Error::InvalidArgument(format!(
                "Unknown transaction kind: {}. Use 'approve', 'deposit', or 'withdraw'",
                other
            )));
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&tx).map_err(vault_sentinel::Error::Json)?
    );
    Ok(())
}
