use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Retry budget allows at least one attempt and its delay range is ordered
/// - Pacing and fetcher sleep ranges are ordered
/// - Artifact size threshold is positive and the sweep keeps the artifact extension
/// - The fetcher merges into the artifact extension that verification expects
/// - At least one user agent and a fetcher binary are configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        return Err(ConfigError::ValidationError(format!(
            "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        )));
    }

    if config.pacing.min_delay_ms > config.pacing.max_delay_ms {
        return Err(ConfigError::ValidationError(format!(
            "pacing.min_delay_ms ({}) exceeds pacing.max_delay_ms ({})",
            config.pacing.min_delay_ms, config.pacing.max_delay_ms
        )));
    }

    if config.fetcher.sleep_interval_min_secs > config.fetcher.sleep_interval_max_secs {
        return Err(ConfigError::ValidationError(
            "fetcher.sleep_interval_min_secs exceeds fetcher.sleep_interval_max_secs".to_string(),
        ));
    }

    if config.integrity.min_artifact_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "integrity.min_artifact_bytes cannot be 0".to_string(),
        ));
    }

    let artifact_ext = config.integrity.artifact_extension.to_ascii_lowercase();
    if !config
        .integrity
        .allowed_extensions
        .iter()
        .any(|ext| ext.to_ascii_lowercase() == artifact_ext)
    {
        return Err(ConfigError::ValidationError(format!(
            "integrity.allowed_extensions must contain the artifact extension '{}'",
            config.integrity.artifact_extension
        )));
    }

    let merge_ext = config.fetcher.merge_output_format.trim_start_matches('.');
    let expected_ext = config.integrity.artifact_extension.trim_start_matches('.');
    if !merge_ext.eq_ignore_ascii_case(expected_ext) {
        return Err(ConfigError::ValidationError(format!(
            "fetcher.merge_output_format ({}) must match integrity.artifact_extension ({})",
            config.fetcher.merge_output_format, config.integrity.artifact_extension
        )));
    }

    if config.fetcher.user_agents.is_empty() {
        return Err(ConfigError::ValidationError(
            "fetcher.user_agents cannot be empty".to_string(),
        ));
    }

    if config.fetcher.binary.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "fetcher.binary cannot be empty".to_string(),
        ));
    }

    Ok(())
}
