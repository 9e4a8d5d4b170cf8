//! Request pacing and client identity selection.
//!
//! Workers ask a [`PacingStrategy`] how long to wait between jobs, how long
//! to back off before a retry, and which user agent to present. The default
//! [`RandomizedPacing`] jitters all three; [`FixedPacing`] is deterministic
//! and is what tests plug in.

use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::config::{PacingConfig, RetryConfig};

/// Pacing and identity policy for outbound requests.
pub trait PacingStrategy: Send + Sync {
    /// Delay between two consecutive jobs.
    fn inter_job_delay(&self) -> Duration;

    /// Delay before retry number `attempt` (0-indexed).
    fn retry_delay(&self, attempt: u32) -> Duration;

    /// User agent to present for the next request, if any.
    fn user_agent(&self) -> Option<String>;
}

/// Jittered pacing with exponential retry backoff and user-agent rotation.
#[derive(Debug, Clone)]
pub struct RandomizedPacing {
    pacing: PacingConfig,
    retry: RetryConfig,
    user_agents: Vec<String>,
}

impl RandomizedPacing {
    pub fn new(pacing: PacingConfig, retry: RetryConfig, user_agents: Vec<String>) -> Self {
        Self {
            pacing,
            retry,
            user_agents,
        }
    }

    /// Backoff before jitter: `base * 2^attempt`, capped at `max`.
    fn capped_backoff(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.retry.base_delay_ms);
        let max = Duration::from_millis(self.retry.max_delay_ms);
        // attempts >= 32 saturate instead of overflowing the shift
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        base.checked_mul(multiplier).unwrap_or(max).min(max)
    }
}

impl PacingStrategy for RandomizedPacing {
    fn inter_job_delay(&self) -> Duration {
        let (min, max) = (self.pacing.min_delay_ms, self.pacing.max_delay_ms);
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let capped = self.capped_backoff(attempt);
        if !self.retry.jitter {
            return capped;
        }

        // Jitter never pushes the delay past the cap.
        let max = Duration::from_millis(self.retry.max_delay_ms);
        let jitter_range_ms = self.retry.base_delay_ms / 2;
        let remaining_ms = u64::try_from(max.saturating_sub(capped).as_millis()).unwrap_or(0);
        let jitter_limit_ms = jitter_range_ms.min(remaining_ms);
        if jitter_limit_ms == 0 {
            return capped;
        }

        let jitter_ms = rand::rng().random_range(0..jitter_limit_ms);
        (capped + Duration::from_millis(jitter_ms)).min(max)
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agents.choose(&mut rand::rng()).cloned()
    }
}

/// Deterministic pacing: constant delays and a fixed identity.
#[derive(Debug, Clone, Default)]
pub struct FixedPacing {
    pub inter_job: Duration,
    pub retry: Duration,
    pub user_agent: Option<String>,
}

impl FixedPacing {
    /// No waiting at all and no user agent override.
    pub fn immediate() -> Self {
        Self::default()
    }
}

impl PacingStrategy for FixedPacing {
    fn inter_job_delay(&self) -> Duration {
        self.inter_job
    }

    fn retry_delay(&self, _attempt: u32) -> Duration {
        self.retry
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }
}
