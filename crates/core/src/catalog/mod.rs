//! Acquisition catalog - the categorised list of targets to acquire.
//!
//! The catalog is produced offline by the link extractor and loaded once per
//! run. It is read-only for the lifetime of the process.

mod store;
mod types;

pub use store::{sanitize_file_name, CatalogStore};
pub use types::*;
