//! Fetcher module - the boundary to the external media-fetching capability.
//!
//! This module provides the `MediaFetcher` trait and a `yt-dlp` backed
//! implementation. Network transfer, muxing and transcoding all happen in
//! the external tool; this side only builds requests and interprets results.
//!
//! # Example
//!
//! ```ignore
//! use reelkeep_core::fetcher::{FormatSelector, MediaFetcher, YtDlpFetcher};
//!
//! let fetcher = YtDlpFetcher::with_defaults();
//! fetcher.validate().await?;
//!
//! let probe = fetcher.probe("https://youtu.be/abc", None).await?;
//! for option in &probe.options {
//!     println!("{} ({})", option.label, option.format_id);
//! }
//! ```

mod error;
mod traits;
mod types;
mod ytdlp;

pub use error::FetchError;
pub use traits::MediaFetcher;
pub use types::{FetchReport, FetchRequest, FormatSelector, ProbeResult};
pub use ytdlp::YtDlpFetcher;
