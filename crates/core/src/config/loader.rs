use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `REELKEEP_RETRY__MAX_ATTEMPTS=5`.
const ENV_PREFIX: &str = "REELKEEP_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration, falling back to built-in defaults when the file is absent.
///
/// `required` makes a missing file an error, for paths the user named explicitly.
pub fn load_config_or_default(path: &Path, required: bool) -> Result<Config, ConfigError> {
    if path.exists() || required {
        return load_config(path);
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[pacing]
min_delay_ms = 100
max_delay_ms = 200
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.pacing.min_delay_ms, 100);
        assert_eq!(config.pacing.max_delay_ms, 200);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[retry]
max_attempts = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/reelkeep.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_or_default_missing_optional_file() {
        let config =
            load_config_or_default(Path::new("/nonexistent/reelkeep.toml"), false).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_config_or_default_missing_required_file() {
        let result = load_config_or_default(Path::new("/nonexistent/reelkeep.toml"), true);
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[paths]
download_dir = "/tmp/reelkeep-out"
ledger = "/tmp/reelkeep-ledger.json"

[integrity]
min_artifact_bytes = 2048
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.paths.download_dir, PathBuf::from("/tmp/reelkeep-out"));
        assert_eq!(
            config.paths.ledger,
            PathBuf::from("/tmp/reelkeep-ledger.json")
        );
        assert_eq!(config.paths.catalog, PathBuf::from("youtube_links.json"));
        assert_eq!(config.integrity.min_artifact_bytes, 2048);
    }
}
