//! Boostwatch CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use boostwatch::{
    error::{AppError, Result},
    models::{Config, LedgerStatus},
    pipeline::{FingerprintGenerator, Monitor, RetryPolicy, Supervisor, TokioClock},
    services::{
        Acquisition, Dispatcher, HealthProbe, HtmlAcquisition, HttpHealthProbe, TelegramNotifier,
        open_ledger,
    },
    storage::{HistoryStorage, LocalStorage},
};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

/// Boostwatch - boosted odds monitor
#[derive(Parser, Debug)]
#[command(
    name = "boostwatch",
    version,
    about = "Watches a bookmaker page for boosted offers and announces changes"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "boostwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll continuously until interrupted or the failure threshold is hit
    Run,

    /// Run a single cycle and exit
    Once,

    /// Validate the configuration
    Validate,

    /// Show the persisted history
    Info,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn build_monitor(config: &Config, storage: LocalStorage) -> Result<Monitor> {
    let notifier = Arc::new(TelegramNotifier::new(&config.notify)?);
    let dispatcher = Dispatcher::new(
        notifier,
        config.notify.targets.clone(),
        config.messages.clone(),
    );

    let ledger = open_ledger(&config.ledger, |_| {
        Err(AppError::config("no spreadsheet backend in this build"))
    });

    let health = HttpHealthProbe::from_config(&config.health)?
        .map(|probe| Box::new(probe) as Box<dyn HealthProbe>);
    if health.is_none() {
        log::info!("Health check not configured");
    }

    let generator = FingerprintGenerator::new(config.fingerprint.algorithm);
    Ok(Monitor::start(generator, dispatcher, Box::new(storage))
        .await
        .with_ledger(ledger)
        .with_health_probe(health))
}

fn local_storage(config: &Config) -> LocalStorage {
    LocalStorage::new(&config.storage.history_file, &config.storage.diagnostics_dir)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();
    let config = match Config::resolve(&cli.config, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, "info");
            log::error!("Config load failed: {}", e);
            return Err(e);
        }
    };
    init_logging(cli.verbose, &config.logging.level);

    log::info!("Boostwatch starting...");
    if let Ok(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            config.validate()?;
            let mut monitor = build_monitor(&config, local_storage(&config)).await?;
            let acquisition = HtmlAcquisition::new(config.source.clone())?;
            let policy = RetryPolicy::from_config(&config.schedule, &config.supervisor);
            let mut supervisor = Supervisor::new(acquisition, Arc::new(TokioClock), policy);

            let (stop_tx, stop_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupt received, finishing current cycle...");
                    stop_tx.send_replace(true);
                }
            });

            if let Err(e) = supervisor.run(&mut monitor, stop_rx).await {
                log::error!("Monitor stopped: {}", e);
                return Err(e);
            }
        }

        Command::Once => {
            config.validate()?;
            let mut monitor = build_monitor(&config, local_storage(&config)).await?;
            let mut acquisition = HtmlAcquisition::new(config.source.clone())?;

            acquisition.initialize().await?;
            let result = monitor.run_cycle(&mut acquisition).await;
            if result.is_err() {
                if let Some(capture) = acquisition.capture_diagnostics().await {
                    monitor.save_diagnostic(&capture).await;
                }
            }
            acquisition.release().await;

            let report = result?;
            log::info!(
                "Cycle complete: {} offers, {} new, {} removed, history {}",
                report.candidates,
                report.summary.added,
                report.summary.removed,
                if report.persisted { "saved" } else { "NOT saved" }
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            HtmlAcquisition::new(config.source.clone())?;
            log::info!("✓ Selectors compile");

            match config.ledger.status() {
                LedgerStatus::Disabled => log::info!("- Ledger not configured"),
                LedgerStatus::Incomplete(missing) => {
                    log::warn!("! Ledger incomplete: missing {}", missing)
                }
                LedgerStatus::Enabled => log::info!("✓ Ledger configured"),
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = local_storage(&config);
            log::info!("History file: {}", storage.history_file().display());

            let history = storage.load_history().await;
            log::info!(
                "Known offers: {} ({} active)",
                history.len(),
                history.active_count()
            );
            for (fingerprint, item) in history.active_subset() {
                log::info!(
                    "  {} {} | {} | {} -> {} (since {})",
                    fingerprint.short(),
                    item.subject,
                    item.market,
                    item.old_value,
                    item.new_value,
                    item.observed_at
                );
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
