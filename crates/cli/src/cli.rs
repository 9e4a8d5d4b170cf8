//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use reelkeep_core::{Config, RunOptions};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "REELKEEP_CONFIG";

/// Config file used when neither `--config` nor `REELKEEP_CONFIG` is set.
pub const DEFAULT_CONFIG: &str = "reelkeep.toml";

/// Batch-acquire the videos listed in a catalog, skipping what is already on disk.
#[derive(Parser, Debug, Default)]
#[command(name = "reelkeep", version, about)]
pub struct CliArgs {
    /// Only remove files with disallowed extensions from the download tree.
    #[arg(long)]
    pub clean: bool,

    /// Only clean up and verify already downloaded videos; fetch nothing.
    #[arg(long)]
    pub check: bool,

    /// Always download the best available quality.
    #[arg(long)]
    pub best_quality: bool,

    /// Path to the TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Catalog JSON file. Overrides `paths.catalog`.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Ledger JSON file. Overrides `paths.ledger`.
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Root of the download tree. Overrides `paths.download_dir`.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Write Prometheus metrics in text format to this file when the run ends.
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
}

impl CliArgs {
    /// Config path and whether the user asked for it explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        if let Some(path) = &self.config {
            return (path.clone(), true);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => (PathBuf::from(path), true),
            _ => (PathBuf::from(DEFAULT_CONFIG), false),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            force_best_quality: self.best_quality,
            clean_only: self.clean,
            check_only: self.check,
        }
    }

    /// Apply path overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.catalog {
            config.paths.catalog = path.clone();
        }
        if let Some(path) = &self.ledger {
            config.paths.ledger = path.clone();
        }
        if let Some(path) = &self.download_dir {
            config.paths.download_dir = path.clone();
        }
    }
}
