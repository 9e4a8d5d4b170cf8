pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod integrity;
pub mod layout;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod pacing;
pub mod quality;
pub mod testing;
pub mod worker;

pub use catalog::{sanitize_file_name, CatalogError, CatalogStore, Category, Target};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use fetcher::{FetchError, MediaFetcher, YtDlpFetcher};
pub use integrity::{sweep_directory, AuditReport, IntegrityAuditor, IntegrityError};
pub use layout::OutputLayout;
pub use ledger::{JsonLedger, Ledger, LedgerError};
pub use orchestrator::{
    BatchOrchestrator, OrchestratorError, RunMode, RunOptions, RunStatistics, ShutdownHandle,
};
pub use pacing::{FixedPacing, PacingStrategy, RandomizedPacing};
pub use quality::{negotiate, NegotiationError, QualityLabel, QualityOption};
pub use worker::{AcquisitionOutcome, AcquisitionWorker, FailureKind, FailureReason};
