//! Trait definitions for the fetcher module.

use async_trait::async_trait;

use super::error::FetchError;
use super::types::{FetchReport, FetchRequest, ProbeResult};

/// An external capability that can enumerate and transfer media variants.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Validates that the fetcher is installed and usable.
    async fn validate(&self) -> Result<(), FetchError>;

    /// Enumerates the variants available for `url` without transferring media.
    async fn probe(&self, url: &str, user_agent: Option<&str>) -> Result<ProbeResult, FetchError>;

    /// Transfers the resource as described by `request`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchReport, FetchError>;
}
