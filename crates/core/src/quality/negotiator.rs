//! Quality negotiation policy.

use std::collections::BTreeSet;
use thiserror::Error;

use super::types::QualityLabel;

/// Errors from quality negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    /// The probe reported no variant with a usable height.
    #[error("no renderable quality available")]
    NoRenderableQuality,
}

/// Pick the quality to request.
///
/// Exact match on `preferred` when it is available and `force_max` is off;
/// otherwise the highest available label.
pub fn negotiate(
    preferred: Option<QualityLabel>,
    available: &BTreeSet<QualityLabel>,
    force_max: bool,
) -> Result<QualityLabel, NegotiationError> {
    let best = *available
        .last()
        .ok_or(NegotiationError::NoRenderableQuality)?;

    if force_max {
        return Ok(best);
    }

    match preferred {
        Some(label) if available.contains(&label) => Ok(label),
        _ => Ok(best),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> QualityLabel {
        s.parse().unwrap()
    }

    fn set(labels: &[&str]) -> BTreeSet<QualityLabel> {
        labels.iter().map(|s| label(s)).collect()
    }

    #[test]
    fn test_exact_match_is_preferred() {
        let available = set(&["480p", "720p", "1080p"]);
        assert_eq!(
            negotiate(Some(label("720p")), &available, false).unwrap(),
            label("720p")
        );
    }

    #[test]
    fn test_unavailable_preference_falls_back_to_max() {
        let available = set(&["480p", "720p"]);
        assert_eq!(
            negotiate(Some(label("2160p")), &available, false).unwrap(),
            label("720p")
        );
    }

    #[test]
    fn test_force_max_overrides_preference() {
        let available = set(&["480p", "720p"]);
        assert_eq!(
            negotiate(Some(label("480p")), &available, true).unwrap(),
            label("720p")
        );
        assert_eq!(negotiate(None, &available, true).unwrap(), label("720p"));
    }

    #[test]
    fn test_absent_preference_takes_max() {
        let available = set(&["144p", "1440p", "360p"]);
        assert_eq!(negotiate(None, &available, false).unwrap(), label("1440p"));
    }

    #[test]
    fn test_empty_set_is_not_renderable() {
        let available = BTreeSet::new();
        assert_eq!(
            negotiate(Some(label("720p")), &available, false),
            Err(NegotiationError::NoRenderableQuality)
        );
        assert_eq!(
            negotiate(None, &available, true),
            Err(NegotiationError::NoRenderableQuality)
        );
    }

    #[test]
    fn test_negotiation_is_deterministic() {
        let available = set(&["240p", "480p", "720p", "1080p"]);
        let first = negotiate(Some(label("480p")), &available, false).unwrap();
        for _ in 0..16 {
            assert_eq!(
                negotiate(Some(label("480p")), &available, false).unwrap(),
                first
            );
        }
    }
}
