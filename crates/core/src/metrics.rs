//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Acquisition worker (outcomes, attempts per stage, fetch duration)
//! - Ledger (durable writes)
//! - Integrity auditor and sweep (evictions, removed files)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Terminal acquisition outcomes by result.
pub static ACQUISITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelkeep_acquisitions_total", "Total acquisition outcomes"),
        &["result"], // "completed", "skipped", "failed"
    )
    .unwrap()
});

/// Stage executions by stage and result.
pub static STAGE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelkeep_stage_attempts_total",
            "Acquisition stage executions",
        ),
        &["stage", "result"], // stage: "probe", "fetch", "verify"; result: "ok", "error"
    )
    .unwrap()
});

/// Retries scheduled after a transient failure.
pub static RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelkeep_retries_total", "Retries scheduled by failure kind"),
        &["kind"],
    )
    .unwrap()
});

/// Duration of a single fetch.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reelkeep_fetch_duration_seconds",
            "Duration of a single fetch invocation",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Ledger Metrics
// =============================================================================

/// Durable ledger rewrites.
pub static LEDGER_WRITES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("reelkeep_ledger_writes_total", "Durable ledger rewrites").unwrap()
});

// =============================================================================
// Integrity Metrics
// =============================================================================

/// Ledger entries evicted by the auditor, by reason.
pub static AUDIT_EVICTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelkeep_audit_evictions_total",
            "Ledger entries evicted by the integrity audit",
        ),
        &["reason"], // "unknown_target", "missing", "truncated"
    )
    .unwrap()
});

/// Partial-download debris removed.
pub static DEBRIS_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelkeep_debris_removed_total",
        "Partial download files removed",
    )
    .unwrap()
});

/// Files removed by the directory sweep.
pub static SWEPT_FILES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelkeep_swept_files_total",
        "Files with disallowed extensions removed by the sweep",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Acquisition
        Box::new(ACQUISITIONS.clone()),
        Box::new(STAGE_ATTEMPTS.clone()),
        Box::new(RETRIES.clone()),
        Box::new(FETCH_DURATION.clone()),
        // Ledger
        Box::new(LEDGER_WRITES.clone()),
        // Integrity
        Box::new(AUDIT_EVICTIONS.clone()),
        Box::new(DEBRIS_REMOVED.clone()),
        Box::new(SWEPT_FILES.clone()),
    ]
}
