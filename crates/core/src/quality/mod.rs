//! Resolution negotiation.
//!
//! Given a target's preferred quality and the set of qualities a probe
//! reported, picks the variant to request. The policy is pure: exact match
//! when possible, otherwise the highest available label.

mod negotiator;
mod types;

pub use negotiator::{negotiate, NegotiationError};
pub use types::{available_labels, ParseQualityError, QualityLabel, QualityOption};
