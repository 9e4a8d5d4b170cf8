mod cli;
mod metrics;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelkeep_core::{
    load_config_or_default, validate_config, BatchOrchestrator, CatalogStore, JsonLedger, Ledger,
    MediaFetcher, RandomizedPacing, RunMode, RunStatistics, ShutdownHandle, YtDlpFetcher,
};

use cli::CliArgs;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration before logging so the log file location is known
    let (config_path, required) = args.config_path();
    let loaded = load_config_or_default(&config_path, required);
    let log_file = loaded
        .as_ref()
        .ok()
        .and_then(|config| config.paths.log_file.clone());
    let _log_guard = init_logging(log_file.as_deref())?;

    let mut config = loaded
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    args.apply_overrides(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let options = args.run_options();
    let mode = options.mode();
    info!(
        config = %config_path.display(),
        config_hash = &config_hash[..16],
        mode = %mode,
        download_dir = %config.paths.download_dir.display(),
        "Configuration loaded"
    );

    let catalog = if mode == RunMode::CleanOnly {
        CatalogStore::empty()
    } else {
        CatalogStore::load(&config.paths.catalog).with_context(|| {
            format!(
                "Failed to load catalog from {}",
                config.paths.catalog.display()
            )
        })?
    };

    let ledger: Arc<dyn Ledger> = Arc::new(
        JsonLedger::open(&config.paths.ledger).with_context(|| {
            format!("Failed to open ledger at {}", config.paths.ledger.display())
        })?,
    );
    info!(entries = ledger.len(), "Ledger loaded");

    let fetcher: Arc<dyn MediaFetcher> = Arc::new(YtDlpFetcher::new(config.fetcher.clone()));
    if mode == RunMode::Full {
        fetcher
            .validate()
            .await
            .with_context(|| format!("Fetcher {} is not usable", fetcher.name()))?;
    }
    info!("Using fetcher: {}", fetcher.name());

    let pacing = Arc::new(RandomizedPacing::new(
        config.pacing.clone(),
        config.retry.clone(),
        config.fetcher.user_agents.clone(),
    ));

    let shutdown = ShutdownHandle::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Interrupt received, finishing current target");
        trigger.request_shutdown();
    });

    let orchestrator =
        BatchOrchestrator::new(&config, fetcher, ledger, pacing).with_shutdown(shutdown);
    let stats = orchestrator
        .run(&catalog, &options)
        .await
        .context("Batch run aborted")?;

    report(&stats);

    if let Some(path) = &args.metrics_out {
        metrics::write_metrics(path)?;
        info!("Metrics written to {}", path.display());
    }

    Ok(())
}

/// Install the console layer and, when configured, a plain-text file layer.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

fn report(stats: &RunStatistics) {
    for failure in &stats.failures {
        warn!(
            url = %failure.url,
            title = %failure.title,
            category = %failure.category,
            reason = %failure.reason,
            attempts = failure.attempts,
            "Target failed"
        );
    }

    if let Ok(json) = serde_json::to_string(stats) {
        debug!(statistics = %json, "Run statistics");
    }

    match stats.mode {
        RunMode::CleanOnly => info!(swept = stats.swept_files, "Cleanup finished"),
        RunMode::CheckOnly => info!(
            swept = stats.swept_files,
            repaired = stats.repaired,
            evicted = stats.evicted_urls.len(),
            "Integrity check finished"
        ),
        RunMode::Full => info!(
            "Summary: total {}, completed {}, failed {}, skipped {}{}",
            stats.total,
            stats.completed,
            stats.failed,
            stats.skipped,
            if stats.interrupted {
                format!(", not attempted {} (interrupted)", stats.not_attempted())
            } else {
                String::new()
            }
        ),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
