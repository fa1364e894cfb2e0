use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use vault_rebalancer::utils::init_from_config;
use vault_rebalancer::{Config, CycleDriver, DriverConfig, HttpCsvSignal, RestExchangeClient};

#[derive(Debug, Parser)]
#[command(name = "vault-rebalancer", about = "Keeps a derivatives vault at its target exposure")]
struct Args {
    /// TOML config file (defaults to $CONFIG_FILE, then config/vault.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    init_from_config(&config.logging)?;

    info!("╔════════════════════════════════════════════════╗");
    info!("║   Vault Rebalancer - LIVE MODE                 ║");
    info!("╚════════════════════════════════════════════════╝");
    info!(
        "✓ Configuration loaded: {} on vault {} (leverage x{})",
        config.general.instrument, config.general.vault_id, config.rebalance.leverage_multiplier
    );

    let timeout = config.timing.request_timeout();

    let exchange = RestExchangeClient::new(config.exchange.api_endpoint.clone(), timeout)?;
    let signal = HttpCsvSignal::new(config.signal.endpoint.clone(), config.signal.target_column, timeout)?;

    let mut driver = CycleDriver::new(DriverConfig::from(&config), exchange, signal)?;

    if args.once {
        let result = driver.run_cycle().await;
        if let Ok(metrics) = driver.metrics().render() {
            debug!("{}", metrics);
        }
        let outcome = result.context("Rebalance cycle failed")?;
        info!("Cycle finished: {:?}", outcome);
        return Ok(());
    }

    info!("Press Ctrl+C to stop");

    // Without a signal handler the worker keeps running until killed
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => warn!("Shutdown requested"),
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                warn!("Running without a shutdown handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = driver.run() => {}
        _ = shutdown => {}
    }

    match driver.metrics().render() {
        Ok(metrics) => debug!("Final counters:\n{}", metrics),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }
    info!(cycles = driver.cycle(), "Rebalancer stopped");

    Ok(())
}
